//! Project configuration sources.
//!
//! A project is a root directory, the NED source folders below it and the
//! projects it references. [`ProjectConfigProvider`] produces the current
//! set of projects whenever the engine rebuilds its projects table.

use std::path::{Component, Path, PathBuf};

use crate::base::ProjectId;
use crate::base::constants::NEDFOLDERS_FILENAME;
use crate::resources::{FileSystem, NedError};

/// Configuration of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: ProjectId,
    pub root: PathBuf,
    /// Source folders relative to `root`; an empty path is the root itself.
    pub source_folders: Vec<PathBuf>,
    /// Directly referenced projects.
    pub references: Vec<ProjectId>,
}

impl ProjectConfig {
    /// A project whose root is its only source folder.
    pub fn new(name: impl Into<ProjectId>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            source_folders: vec![PathBuf::new()],
            references: Vec::new(),
        }
    }

    pub fn with_source_folders<I, P>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source_folders = folders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_references<I, N>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ProjectId>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    /// Source folders as absolute paths, in declaration order.
    pub fn absolute_source_folders(&self) -> Vec<PathBuf> {
        self.source_folders
            .iter()
            .map(|folder| {
                if folder.as_os_str().is_empty() {
                    self.root.clone()
                } else {
                    self.root.join(folder)
                }
            })
            .collect()
    }
}

/// Supplies the set of projects.
pub trait ProjectConfigProvider: Send + Sync {
    fn projects(&self, fs: &dyn FileSystem) -> Result<Vec<ProjectConfig>, NedError>;
}

/// A fixed list of projects.
#[derive(Debug, Clone, Default)]
pub struct StaticProjects {
    projects: Vec<ProjectConfig>,
}

impl StaticProjects {
    pub fn new(projects: Vec<ProjectConfig>) -> Self {
        Self { projects }
    }
}

impl ProjectConfigProvider for StaticProjects {
    fn projects(&self, _fs: &dyn FileSystem) -> Result<Vec<ProjectConfig>, NedError> {
        Ok(self.projects.clone())
    }
}

/// Identity of a project whose source folders are read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescription {
    pub name: ProjectId,
    pub root: PathBuf,
    pub references: Vec<ProjectId>,
}

impl ProjectDescription {
    pub fn new(name: impl Into<ProjectId>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            references: Vec::new(),
        }
    }

    pub fn with_references<I, N>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ProjectId>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }
}

/// Reads the source folders of each project from its `.nedfolders` file.
///
/// A project without the file has its root as the only source folder. A
/// project whose file cannot be read or names an invalid folder is left out
/// with a warning.
#[derive(Debug, Clone, Default)]
pub struct NedFoldersProvider {
    projects: Vec<ProjectDescription>,
}

impl NedFoldersProvider {
    pub fn new(projects: Vec<ProjectDescription>) -> Self {
        Self { projects }
    }

    fn load_one(
        &self,
        fs: &dyn FileSystem,
        project: &ProjectDescription,
    ) -> Result<ProjectConfig, NedError> {
        let path = project.root.join(NEDFOLDERS_FILENAME);
        let folders = if fs.exists(&path) {
            let text = fs
                .read_to_string(&path)
                .map_err(|e| NedError::io(&path, e))?;
            parse_nedfolders(&text)?
        } else {
            vec![PathBuf::new()]
        };
        Ok(ProjectConfig {
            name: project.name.clone(),
            root: project.root.clone(),
            source_folders: folders,
            references: project.references.clone(),
        })
    }
}

impl ProjectConfigProvider for NedFoldersProvider {
    fn projects(&self, fs: &dyn FileSystem) -> Result<Vec<ProjectConfig>, NedError> {
        let mut out = Vec::with_capacity(self.projects.len());
        for project in &self.projects {
            match self.load_one(fs, project) {
                Ok(config) => out.push(config),
                Err(err) => {
                    tracing::warn!(project = %project.name, error = %err, "skipping project");
                }
            }
        }
        Ok(out)
    }
}

/// Parse the contents of a `.nedfolders` file.
///
/// One folder per line, relative to the project root; `.` is the root,
/// `#` starts a comment. A file listing nothing means the root.
pub fn parse_nedfolders(text: &str) -> Result<Vec<PathBuf>, NedError> {
    let mut folders = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let folder = if line == "." {
            PathBuf::new()
        } else {
            PathBuf::from(line.trim_end_matches('/'))
        };
        if !is_relative_below(&folder) {
            return Err(NedError::config(format!(
                "{NEDFOLDERS_FILENAME}:{}: '{line}' is not a folder inside the project",
                lineno + 1
            )));
        }
        if !folders.contains(&folder) {
            folders.push(folder);
        }
    }
    if folders.is_empty() {
        folders.push(PathBuf::new());
    }
    Ok(folders)
}

fn is_relative_below(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
