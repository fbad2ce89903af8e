//! Projects table and rehash.
//!
//! The registry knows which projects exist, which folders hold their NED
//! sources and which projects each one sees. Its [`ProjectTable`]s are a
//! pure function of the loaded files and this configuration, recomputed
//! wholesale by [`ProjectRegistry::rehash`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::constants::{NED_EXTENSION, PACKAGE_NED_FILENAME, QNAME_SEPARATOR};
use crate::base::{FileId, ProjectId};
use crate::hir::{DefIndex, ProjectTable};
use crate::project::ProjectConfig;

/// A configured project with its derived data.
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub config: ProjectConfig,
    /// Absolute source folders in declaration order.
    pub source_folders: Vec<PathBuf>,
    /// Transitively referenced projects, excluding the project itself.
    pub referenced: Vec<ProjectId>,
}

#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: IndexMap<ProjectId, ProjectData>,
    pub(crate) tables: FxHashMap<ProjectId, ProjectTable>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration. Tables are cleared until the next rehash.
    pub fn configure(&mut self, configs: Vec<ProjectConfig>) {
        self.projects.clear();
        self.tables.clear();
        for config in &configs {
            for reference in &config.references {
                if !configs.iter().any(|c| c.name == *reference) {
                    tracing::warn!(
                        project = %config.name,
                        reference = %reference,
                        "ignoring reference to unknown project"
                    );
                }
            }
        }
        for config in &configs {
            let referenced = transitive_references(&config.name, &configs);
            let source_folders = config.absolute_source_folders();
            tracing::debug!(
                project = %config.name,
                folders = source_folders.len(),
                references = referenced.len(),
                "configured project"
            );
            self.projects.insert(
                config.name.clone(),
                ProjectData {
                    config: config.clone(),
                    source_folders,
                    referenced,
                },
            );
        }
    }

    pub fn project(&self, name: &ProjectId) -> Option<&ProjectData> {
        self.projects.get(name)
    }

    pub fn project_names(&self) -> impl Iterator<Item = &ProjectId> {
        self.projects.keys()
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectData> {
        self.projects.values()
    }

    pub fn table(&self, name: &ProjectId) -> Option<&ProjectTable> {
        self.tables.get(name)
    }

    /// The project whose root contains `path` (the innermost one for nested
    /// roots).
    pub fn project_for_path(&self, path: &Path) -> Option<&ProjectId> {
        self.projects
            .values()
            .filter(|p| path.starts_with(&p.config.root))
            .max_by_key(|p| p.config.root.components().count())
            .map(|p| &p.config.name)
    }

    pub fn source_folders(&self, name: &ProjectId) -> &[PathBuf] {
        self.projects
            .get(name)
            .map(|p| p.source_folders.as_slice())
            .unwrap_or(&[])
    }

    /// The innermost source folder containing `path`.
    pub fn source_folder_for(&self, path: &Path) -> Option<&Path> {
        let project = self.projects.get(self.project_for_path(path)?)?;
        let parent = path.parent()?;
        project
            .source_folders
            .iter()
            .filter(|folder| parent.starts_with(folder))
            .max_by_key(|folder| folder.components().count())
            .map(PathBuf::as_path)
    }

    /// Whether `path` has the NED extension and lies in a source folder.
    pub fn is_ned_file(&self, path: &Path) -> bool {
        let has_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(NED_EXTENSION));
        has_extension && self.source_folder_for(path).is_some()
    }

    /// Whether types of `owner`'s files are visible in `project`.
    pub fn sees(&self, project: &ProjectId, owner: &ProjectId) -> bool {
        project == owner
            || self
                .projects
                .get(project)
                .is_some_and(|p| p.referenced.contains(owner))
    }

    /// The package a file at `path` should declare.
    ///
    /// That is the package of the source folder's root `package.ned` joined
    /// with the folders between the source folder and the file. `None` for
    /// files outside source folders and for the root `package.ned` itself,
    /// which defines the prefix. `root_package` reports the package declared
    /// by a loaded file.
    pub fn expected_package_for(
        &self,
        path: &Path,
        root_package: impl Fn(&Path) -> Option<String>,
    ) -> Option<String> {
        let folder = self.source_folder_for(path)?;
        let parent = path.parent()?;
        let is_package_file = path
            .file_name()
            .is_some_and(|name| name == PACKAGE_NED_FILENAME);
        if parent == folder && is_package_file {
            return None;
        }
        let prefix = root_package(&folder.join(PACKAGE_NED_FILENAME)).unwrap_or_default();
        let suffix = parent
            .strip_prefix(folder)
            .ok()?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(".");
        Some(match (prefix.is_empty(), suffix.is_empty()) {
            (false, false) => format!("{prefix}{QNAME_SEPARATOR}{suffix}"),
            (true, _) => suffix,
            (false, true) => prefix,
        })
    }

    /// Names reserved in `project` below `package`, relative to it.
    pub fn reserved_names(&self, project: &ProjectId, package: &str) -> Vec<SmolStr> {
        let Some(table) = self.tables.get(project) else {
            return Vec::new();
        };
        let mut names: Vec<SmolStr> = if package.is_empty() {
            table.reserved().cloned().collect()
        } else {
            let prefix = format!("{package}{QNAME_SEPARATOR}");
            table
                .reserved()
                .filter_map(|q| q.strip_prefix(prefix.as_str()))
                .map(SmolStr::new)
                .collect()
        };
        names.sort();
        names
    }

    /// Recompute every project table.
    ///
    /// `files` lists the files taking part (loaded and free of syntax
    /// errors) with their owning project, in path order. Each table is seeded
    /// with the built-in types, then receives the top-level types of every
    /// file its project sees.
    pub fn rehash(&mut self, index: &DefIndex, files: &[(FileId, ProjectId)]) {
        self.tables.clear();
        for (name, data) in &self.projects {
            let mut table = ProjectTable::seeded(index.builtins());
            for (file, owner) in files {
                if owner == name || data.referenced.contains(owner) {
                    for def in index.file_types(*file) {
                        table.register(def.clone());
                    }
                }
            }
            tracing::debug!(
                project = %name,
                components = table.len(),
                duplicates = table.duplicates().len(),
                "rehashed project"
            );
            self.tables.insert(name.clone(), table);
        }
    }
}

/// Projects reachable from `start` through references, in discovery order.
/// Cycles are allowed; unknown projects are skipped.
fn transitive_references(start: &ProjectId, configs: &[ProjectConfig]) -> Vec<ProjectId> {
    let mut out: Vec<ProjectId> = Vec::new();
    let mut queue = vec![start.clone()];
    while let Some(current) = queue.pop() {
        let Some(config) = configs.iter().find(|c| c.name == current) else {
            continue;
        };
        for reference in &config.references {
            if reference != start
                && !out.contains(reference)
                && configs.iter().any(|c| c.name == *reference)
            {
                out.push(reference.clone());
                queue.push(reference.clone());
            }
        }
    }
    out
}
