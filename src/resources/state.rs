//! Shared engine state and the mutations applied to it.
//!
//! Everything in here runs with the engine lock held. Events go to the
//! [`EventQueue`] and are delivered by the caller after unlocking.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use super::invalidator::Invalidator;
use super::notify::{ChangeEvent, EventQueue};
use super::registry::ProjectRegistry;
use super::source_store::SourceStore;
use super::validation::ValidationTimer;
use crate::base::constants::{BUILTIN_FILE_LABEL, PACKAGE_NED_FILENAME};
use crate::base::{FileId, ProjectId};
use crate::hir::{
    DefIndex, Diagnostic, DiagnosticStore, Resolver, duplicate_diagnostics, validate_file,
};
use crate::parser::{Parse, Property, merge};
use crate::project::ProjectConfig;

pub(crate) struct State {
    pub store: SourceStore,
    pub index: DefIndex,
    pub registry: ProjectRegistry,
    pub invalidator: Invalidator,
    pub diagnostics: DiagnosticStore,
    pub events: EventQueue,
    timer: Option<Arc<ValidationTimer>>,
    debug_stats: bool,
}

impl State {
    pub fn new(timer: Option<Arc<ValidationTimer>>, debug_stats: bool) -> Self {
        Self {
            store: SourceStore::default(),
            index: DefIndex::new(),
            registry: ProjectRegistry::new(),
            invalidator: Invalidator::default(),
            diagnostics: DiagnosticStore::new(),
            events: EventQueue::default(),
            timer,
            debug_stats,
        }
    }

    pub fn schedule_validation(&self) {
        if let Some(timer) = &self.timer {
            timer.restart();
        }
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    pub fn invalidate(&mut self) {
        self.invalidator.invalidate(&self.index);
        self.schedule_validation();
    }

    /// Recompute the project tables if anything changed since the last time.
    pub fn rehash_if_needed(&mut self) {
        if !self.invalidator.needs_rehash() {
            return;
        }
        let started = Instant::now();
        let files: Vec<(FileId, ProjectId)> = self
            .store
            .iter()
            .filter(|f| !f.broken)
            .filter_map(|f| Some((f.id, self.index.project_of(f.id)?.clone())))
            .collect();
        self.registry.rehash(&self.index, &files);
        self.invalidator.mark_rehashed();
        if self.debug_stats {
            tracing::debug!(
                files = files.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                count = self.invalidator.rehash_count(),
                "rehash"
            );
        }
        self.schedule_validation();
    }

    /// A resolver over fresh tables.
    pub fn resolver(&mut self) -> Resolver<'_> {
        self.rehash_if_needed();
        Resolver::new(
            &self.index,
            &self.registry.tables,
            &mut self.invalidator.cache,
        )
    }

    // ========================================================================
    // FILES
    // ========================================================================

    /// Store the result of parsing `text` as the contents of `path`.
    ///
    /// A new file is inserted as is. For a loaded file, a clean parse is
    /// merged into the current tree, preserving the ids of unchanged nodes;
    /// a parse with syntax errors only marks the file broken and keeps the
    /// last good tree.
    pub fn apply_parse(&mut self, path: &Path, text: Arc<str>, parse: Parse) -> FileId {
        let Parse { file: tree, errors } = parse;
        let errors: Arc<[_]> = errors.into();

        let Some(id) = self.store.id_of(path) else {
            let id = self.store.insert(path.to_path_buf(), text, tree, errors);
            self.index_file(id);
            self.invalidate();
            self.events.push(ChangeEvent::FileLoaded(id));
            self.events.push(ChangeEvent::ModelChanged(Some(id)));
            return id;
        };

        let Some(entry) = self.store.get_mut(id) else {
            return id;
        };
        entry.text = text;
        let has_errors = !errors.is_empty();
        entry.syntax_errors = errors;
        if has_errors {
            if !std::mem::replace(&mut entry.broken, true) {
                self.invalidate();
                self.events.push(ChangeEvent::ModelChanged(Some(id)));
            }
            return id;
        }

        let was_broken = std::mem::replace(&mut entry.broken, false);
        let merged = merge(&entry.tree, tree);
        entry.tree = Arc::new(merged.tree);
        let tree = entry.tree.clone();

        if merged.changed {
            self.events.begin();
            self.index_file(id);
            self.invalidate();
            self.events.push(ChangeEvent::TreeMerged(id));
            if self.diagnostics.remap(id, &tree) {
                self.events.push(ChangeEvent::DiagnosticsChanged(id));
            }
            self.events.push(ChangeEvent::ModelChanged(Some(id)));
            self.events.end();
        } else {
            if self.diagnostics.remap(id, &tree) {
                self.events.push(ChangeEvent::DiagnosticsChanged(id));
            }
            if was_broken {
                self.invalidate();
                self.events.push(ChangeEvent::ModelChanged(Some(id)));
            }
        }
        id
    }

    /// (Re)build the definitions of a stored file.
    fn index_file(&mut self, id: FileId) {
        let Some(source) = self.store.get(id) else {
            return;
        };
        let project = self.registry.project_for_path(&source.path).cloned();
        self.index.set_file(id, &source.tree, project);
    }

    /// Remove a file and everything derived from it.
    pub fn forget(&mut self, path: &Path) -> bool {
        let Some(source) = self.store.remove(path) else {
            return false;
        };
        self.index.remove_file(source.id);
        self.diagnostics.remove(source.id);
        self.invalidate();
        self.events.push(ChangeEvent::FileRemoved(source.path));
        true
    }

    /// Install a new projects configuration.
    ///
    /// Files no longer inside any source folder are forgotten.
    pub fn reconfigure(&mut self, configs: Vec<ProjectConfig>) {
        self.registry.configure(configs);
        let ids: Vec<FileId> = self.store.iter().map(|f| f.id).collect();
        for id in ids {
            if let Some(source) = self.store.get(id) {
                let project = self.registry.project_for_path(&source.path).cloned();
                self.index.set_project(id, project);
            }
        }
        let trash: Vec<PathBuf> = self
            .store
            .paths()
            .filter(|p| !self.registry.is_ned_file(p))
            .cloned()
            .collect();
        self.events.begin();
        for path in &trash {
            self.forget(path);
        }
        self.events.end();
        self.invalidate();
        self.events.push(ChangeEvent::ModelChanged(None));
    }

    pub fn path_label(&self, file: FileId) -> String {
        if file.is_builtin() {
            return BUILTIN_FILE_LABEL.to_string();
        }
        self.store
            .get(file)
            .map(|f| f.path.display().to_string())
            .unwrap_or_else(|| file.to_string())
    }

    /// Property `name` of the `package.ned` in `folder` or in the nearest
    /// parent folder that has one, up to the source folder.
    pub fn folder_property(&self, folder: &Path, name: &str) -> Option<Property> {
        let source_folder = self
            .registry
            .source_folder_for(&folder.join(PACKAGE_NED_FILENAME))?;
        folder
            .ancestors()
            .take_while(|dir| dir.starts_with(source_folder))
            .filter_map(|dir| self.store.by_path(&dir.join(PACKAGE_NED_FILENAME)))
            .find_map(|f| f.tree.property(name).cloned())
    }

    pub fn expected_package(&self, path: &Path) -> Option<String> {
        self.registry
            .expected_package_for(path, |p| self.store.package_of(p))
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Files to validate, in path order, with their duplicate-definition
    /// diagnostics. Prior diagnostics of files not in the list are cleared.
    pub fn plan_validation(&mut self) -> (Vec<FileId>, FxHashMap<FileId, Vec<Diagnostic>>) {
        self.rehash_if_needed();
        let mut duplicates: FxHashMap<FileId, Vec<Diagnostic>> = FxHashMap::default();
        // A conflict seen through several referencing projects is reported once.
        let mut seen = FxHashSet::default();
        for project in self.registry.project_names() {
            let Some(table) = self.registry.table(project) else {
                continue;
            };
            for diag in duplicate_diagnostics(table, |f| self.path_label(f)) {
                if seen.insert((diag.file, diag.node, diag.message.clone())) {
                    duplicates.entry(diag.file).or_default().push(diag);
                }
            }
        }
        let files: Vec<FileId> = self.store.iter().map(|f| f.id).collect();
        let stale: Vec<FileId> = self
            .diagnostics
            .files()
            .filter(|f| self.store.get(*f).is_none())
            .collect();
        for file in stale {
            self.diagnostics.remove(file);
        }
        (files, duplicates)
    }

    /// Validate one file and publish its diagnostics.
    pub fn validate_and_publish(&mut self, file: FileId, mut diagnostics: Vec<Diagnostic>) {
        self.rehash_if_needed();
        let Some(source) = self.store.get(file) else {
            return;
        };
        let skip = source.broken || self.index.project_of(file).is_none();
        let tree = source.tree.clone();
        if !skip {
            let expected = self.expected_package(&source.path);
            let mut resolver = Resolver::new(
                &self.index,
                &self.registry.tables,
                &mut self.invalidator.cache,
            );
            diagnostics.extend(validate_file(&mut resolver, file, &tree, expected.as_deref()));
        }
        for diag in &mut diagnostics {
            if let Some(span) = diag.node.and_then(|node| tree.find_span(node)) {
                diag.span = span;
            }
        }
        if self.diagnostics.replace(file, diagnostics) {
            self.events.push(ChangeEvent::DiagnosticsChanged(file));
        }
    }
}
