//! `NedResources`, the engine context.
//!
//! Owns every loaded file, the projects table, the derived symbol tables,
//! the lookup cache, published diagnostics and the validation worker. All
//! shared state sits behind one mutex; events produced while it is held are
//! delivered to listeners after it is released.
//!
//! ## Usage
//!
//! ```ignore
//! let fs = Arc::new(RealFs);
//! let projects = Arc::new(StaticProjects::new(vec![ProjectConfig::new("demo", "/ws/demo")]));
//! let ned = NedResources::new(fs, projects, ResourcesConfig::default())?;
//! ned.read_missing_files()?;
//!
//! let ctx = ned.file_context("/ws/demo/Net.ned").unwrap();
//! let queue = ned.lookup("Queue", ctx);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use super::config::ResourcesConfig;
use super::error::NedError;
use super::fs::FileSystem;
use super::notify::{ChangeEvent, ChangeListener, ListenerId, Listeners};
use super::registry::ProjectData;
use super::state::State;
use super::validation::{ValidationTimer, ValidationWorker};
use crate::base::{FileId, NodeId, Position, ProjectId};
use crate::hir::{Diagnostic, InheritedMembers, LookupContext, TypeDefinition};
use crate::parser::{NedFile, Property, TypeKind, parse};
use crate::project::{ProjectConfigProvider, loader};

// ============================================================================
// INNER
// ============================================================================

/// How long a pass waits for a running one before rechecking cancellation.
const PASS_WAIT_SLICE: Duration = Duration::from_millis(20);

pub(crate) struct Inner {
    state: Mutex<State>,
    listeners: Listeners,
    dispatch: ReentrantMutex<()>,
    /// Held for a whole validation pass; passes never overlap.
    validation: ReentrantMutex<()>,
    pub(crate) fs: Arc<dyn FileSystem>,
    provider: Arc<dyn ProjectConfigProvider>,
    worker: Mutex<Option<ValidationWorker>>,
    disposed: AtomicBool,
    debug_stats: bool,
}

impl Inner {
    /// Run `f` under the engine lock, then deliver the events it queued.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let result = f(&mut self.state.lock());
        self.flush_events();
        result
    }

    fn flush_events(&self) {
        let _dispatch = self.dispatch.lock();
        while let Some(event) = self.next_event() {
            self.listeners.fire(&event);
        }
    }

    fn next_event(&self) -> Option<ChangeEvent> {
        self.state.lock().events.pop()
    }

    /// Emit `Begin` now and `End` when the guard drops.
    pub(crate) fn bracket(&self) -> BracketGuard<'_> {
        self.with_state(|st| st.events.begin());
        BracketGuard { inner: self }
    }

    fn validate_all_files(&self, cancel: &CancellationToken) {
        let _pass = loop {
            if let Some(guard) = self.validation.try_lock_for(PASS_WAIT_SLICE) {
                break guard;
            }
            if cancel.is_cancelled() {
                return;
            }
        };
        let started = Instant::now();
        let _bracket = self.bracket();
        let (files, mut duplicates) = self.with_state(State::plan_validation);
        for file in &files {
            if cancel.is_cancelled() {
                tracing::debug!("validation pass cancelled");
                return;
            }
            let found = duplicates.remove(file).unwrap_or_default();
            self.with_state(|st| st.validate_and_publish(*file, found));
        }
        if self.debug_stats {
            let errors = self.with_state(|st| st.diagnostics.error_count());
            tracing::debug!(
                files = files.len(),
                errors,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "validation pass"
            );
        }
    }
}

/// Closes a begin/end bracket on every exit path, unwinding included.
pub(crate) struct BracketGuard<'a> {
    inner: &'a Inner,
}

impl Drop for BracketGuard<'_> {
    fn drop(&mut self) {
        self.inner.with_state(|st| st.events.end());
    }
}

// ============================================================================
// NED RESOURCES
// ============================================================================

/// The NED type-resolution and validation engine.
pub struct NedResources {
    inner: Arc<Inner>,
}

impl NedResources {
    /// Create an engine and build its projects table. No file is read until
    /// `read_missing_files` (or `connect`/`read_file`) is called.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        projects: Arc<dyn ProjectConfigProvider>,
        config: ResourcesConfig,
    ) -> Result<Self, NedError> {
        let timer = config.validation_delay.map(ValidationTimer::new);
        let inner = Arc::new(Inner {
            state: Mutex::new(State::new(timer.clone(), config.debug_stats)),
            listeners: Listeners::default(),
            dispatch: ReentrantMutex::new(()),
            validation: ReentrantMutex::new(()),
            fs,
            provider: projects,
            worker: Mutex::new(None),
            disposed: AtomicBool::new(false),
            debug_stats: config.debug_stats,
        });
        let resources = Self { inner };
        resources.rebuild_projects_table()?;

        if let Some(timer) = timer {
            let weak = Arc::downgrade(&resources.inner);
            let worker = ValidationWorker::spawn(timer, move |cancel| match weak.upgrade() {
                Some(inner) => {
                    inner.validate_all_files(cancel);
                    true
                }
                None => false,
            })?;
            *resources.inner.worker.lock() = Some(worker);
        }
        Ok(resources)
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    /// Stop the validation worker. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let worker = self.inner.worker.lock().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }
        tracing::debug!("resources disposed");
    }

    // ========================================================================
    // EDITORS
    // ========================================================================

    /// Register an open editor, loading the file first if needed.
    pub fn connect(&self, path: impl AsRef<Path>) -> Result<FileId, NedError> {
        let path = path.as_ref();
        let connected = self.inner.with_state(|st| {
            let id = st.store.id_of(path)?;
            let entry = st.store.get_mut(id)?;
            entry.connect_count += 1;
            Some(id)
        });
        if let Some(id) = connected {
            return Ok(id);
        }
        if !self.is_ned_file(path) {
            return Err(NedError::NotNedFile(path.to_path_buf()));
        }
        let loaded = loader::read_and_parse(self.inner.fs.as_ref(), path)?;
        Ok(self.inner.with_state(|st| {
            let id = match st.store.id_of(path) {
                Some(id) => id,
                None => st.apply_parse(path, loaded.text, loaded.parse),
            };
            if let Some(entry) = st.store.get_mut(id) {
                entry.connect_count += 1;
            }
            st.rehash_if_needed();
            id
        }))
    }

    /// Unregister an editor. When the last one goes away the file is
    /// re-read from disk (if it still exists), dropping unsaved edits.
    pub fn disconnect(&self, path: impl AsRef<Path>) -> Result<(), NedError> {
        let path = path.as_ref();
        let last = self.inner.with_state(|st| {
            let entry = st
                .store
                .id_of(path)
                .and_then(|id| st.store.get_mut(id))
                .filter(|e| e.connect_count > 0)
                .ok_or_else(|| NedError::NotConnected(path.to_path_buf()))?;
            entry.connect_count -= 1;
            Ok::<_, NedError>(entry.connect_count == 0)
        })?;
        if last && self.inner.fs.exists(path) {
            match self.load_from_disk(path) {
                Ok(_) | Err(NedError::EditorConnected(_)) => {}
                Err(err) => return Err(err),
            }
            self.rehash_if_needed();
        }
        Ok(())
    }

    pub fn connect_count(&self, path: impl AsRef<Path>) -> u32 {
        self.inner
            .with_state(|st| st.store.by_path(path.as_ref()).map_or(0, |f| f.connect_count))
    }

    pub fn has_connected_editor(&self, path: impl AsRef<Path>) -> bool {
        self.connect_count(path) > 0
    }

    /// Replace the text of a loaded file.
    ///
    /// A clean parse is merged into the current tree; a parse with syntax
    /// errors marks the file broken and leaves the tree alone.
    pub fn set_text(&self, path: impl AsRef<Path>, text: &str) -> Result<FileId, NedError> {
        let path = path.as_ref();
        let parsed = parse(text);
        self.inner.with_state(|st| {
            if st.store.id_of(path).is_none() {
                return Err(NedError::NotLoaded(path.to_path_buf()));
            }
            let id = st.apply_parse(path, Arc::from(text), parsed);
            st.rehash_if_needed();
            Ok(id)
        })
    }

    /// Forget a file; `false` if it was not loaded.
    pub fn forget(&self, path: impl AsRef<Path>) -> bool {
        self.inner.with_state(|st| st.forget(path.as_ref()))
    }

    /// (Re)load a file from disk. Refused while an editor owns the file.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<FileId, NedError> {
        let id = self.load_from_disk(path.as_ref())?;
        self.rehash_if_needed();
        Ok(id)
    }

    /// Read and store a file without rehashing.
    pub(crate) fn load_from_disk(&self, path: &Path) -> Result<FileId, NedError> {
        if self.has_connected_editor(path) {
            return Err(NedError::EditorConnected(path.to_path_buf()));
        }
        let loaded = loader::read_and_parse(self.inner.fs.as_ref(), path)?;
        self.store_loaded(loaded)
    }

    pub(crate) fn store_loaded(&self, loaded: loader::LoadedFile) -> Result<FileId, NedError> {
        let loader::LoadedFile { path, text, parse } = loaded;
        self.inner.with_state(|st| {
            if st.store.by_path(&path).is_some_and(|f| f.connect_count > 0) {
                return Err(NedError::EditorConnected(path.clone()));
            }
            Ok(st.apply_parse(&path, text, parse))
        })
    }

    // ========================================================================
    // FILES AND PROJECTS
    // ========================================================================

    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.inner.with_state(|st| st.store.id_of(path.as_ref()))
    }

    pub fn file_path(&self, file: FileId) -> Option<PathBuf> {
        self.inner
            .with_state(|st| st.store.get(file).map(|f| f.path.clone()))
    }

    /// The current tree of a loaded file.
    pub fn file_tree(&self, path: impl AsRef<Path>) -> Option<Arc<NedFile>> {
        self.inner
            .with_state(|st| st.store.by_path(path.as_ref()).map(|f| f.tree.clone()))
    }

    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<Arc<str>> {
        self.inner
            .with_state(|st| st.store.by_path(path.as_ref()).map(|f| f.text.clone()))
    }

    /// Whether the last parse of the file had syntax errors.
    pub fn is_broken(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .with_state(|st| st.store.by_path(path.as_ref()).is_some_and(|f| f.broken))
    }

    /// Innermost tree node of a loaded file at a 0-based line and column.
    pub fn element_at(&self, path: impl AsRef<Path>, line: u32, column: u32) -> Option<NodeId> {
        let tree = self.file_tree(path)?;
        tree.element_at(Position::new(line, column))
    }

    /// Property `name` of a loaded file, or else of the `package.ned` files
    /// from the file's folder up to its source folder.
    pub fn property_for(&self, path: impl AsRef<Path>, name: &str) -> Option<Property> {
        let path = path.as_ref();
        self.inner.with_state(|st| {
            let own = st.store.by_path(path).and_then(|f| f.tree.property(name).cloned());
            own.or_else(|| st.folder_property(path.parent()?, name))
        })
    }

    /// Like [`property_for`](Self::property_for), starting at the
    /// `package.ned` of `folder`.
    pub fn folder_property_for(&self, folder: impl AsRef<Path>, name: &str) -> Option<Property> {
        self.inner
            .with_state(|st| st.folder_property(folder.as_ref(), name))
    }

    /// The simple value of [`property_for`](Self::property_for).
    pub fn simple_property_for(&self, path: impl AsRef<Path>, name: &str) -> Option<String> {
        self.property_for(path, name)
            .and_then(|p| p.simple_value().map(str::to_string))
    }

    /// File-scope lookup context of a loaded file.
    pub fn file_context(&self, path: impl AsRef<Path>) -> Option<LookupContext> {
        self.file_id(path).map(LookupContext::File)
    }

    /// Every loaded file, in path order.
    pub fn files(&self) -> Vec<PathBuf> {
        self.inner
            .with_state(|st| st.store.paths().cloned().collect())
    }

    /// Loaded files owned by `project`, in path order.
    pub fn project_files(&self, project: &ProjectId) -> Vec<PathBuf> {
        self.inner.with_state(|st| {
            st.store
                .iter()
                .filter(|f| st.index.project_of(f.id) == Some(project))
                .map(|f| f.path.clone())
                .collect()
        })
    }

    /// Configuration and derived folders of one project.
    pub fn project(&self, name: &ProjectId) -> Option<ProjectData> {
        self.inner
            .with_state(|st| st.registry.project(name).cloned())
    }

    pub fn projects(&self) -> Vec<ProjectId> {
        self.inner
            .with_state(|st| st.registry.project_names().cloned().collect())
    }

    pub fn project_for(&self, path: impl AsRef<Path>) -> Option<ProjectId> {
        self.inner
            .with_state(|st| st.registry.project_for_path(path.as_ref()).cloned())
    }

    pub fn is_ned_file(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .with_state(|st| st.registry.is_ned_file(path.as_ref()))
    }

    pub fn source_folders(&self, project: &ProjectId) -> Vec<PathBuf> {
        self.inner
            .with_state(|st| st.registry.source_folders(project).to_vec())
    }

    pub fn source_folder_for(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        self.inner.with_state(|st| {
            st.registry
                .source_folder_for(path.as_ref())
                .map(Path::to_path_buf)
        })
    }

    pub fn expected_package_for(&self, path: impl AsRef<Path>) -> Option<String> {
        self.inner
            .with_state(|st| st.expected_package(path.as_ref()))
    }

    /// Re-read the projects configuration.
    ///
    /// Files that no longer lie in a source folder are forgotten and every
    /// derived table is invalidated.
    pub fn rebuild_projects_table(&self) -> Result<(), NedError> {
        let configs = self.inner.provider.projects(self.inner.fs.as_ref())?;
        tracing::debug!(projects = configs.len(), "rebuilding projects table");
        self.inner.with_state(|st| st.reconfigure(configs));
        Ok(())
    }

    // ========================================================================
    // SYMBOL TABLES
    // ========================================================================

    /// Canonical (non-duplicate) top-level types of `project`.
    pub fn types(&self, project: &ProjectId) -> Vec<Arc<TypeDefinition>> {
        self.with_table(project, |t| t.components().cloned().collect())
    }

    /// Every top-level type of every loaded file, duplicates included.
    pub fn all_types(&self) -> Vec<Arc<TypeDefinition>> {
        self.inner.with_state(|st| {
            st.store
                .iter()
                .flat_map(|f| st.index.file_types(f.id).iter().cloned())
                .collect()
        })
    }

    /// Qualified names of [`all_types`](Self::all_types).
    pub fn all_type_qnames(&self) -> BTreeSet<SmolStr> {
        self.all_types()
            .iter()
            .map(|def| def.qualified_name.clone())
            .collect()
    }

    pub fn type_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.with_table(project, |t| t.component_names().cloned().collect())
    }

    pub fn reserved_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.with_table(project, |t| t.reserved().cloned().collect())
    }

    /// Reserved names below `package`, relative to it.
    pub fn reserved_names(&self, project: &ProjectId, package: &str) -> Vec<SmolStr> {
        self.inner.with_state(|st| {
            st.rehash_if_needed();
            st.registry.reserved_names(project, package)
        })
    }

    /// Ambiguous qualified names with every definition claiming them.
    pub fn duplicates(&self, project: &ProjectId) -> IndexMap<SmolStr, Vec<Arc<TypeDefinition>>> {
        self.with_table(project, |t| t.duplicates().clone())
    }

    pub fn module_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.qnames_of_kind(project, |k| {
            matches!(k, TypeKind::SimpleModule | TypeKind::CompoundModule)
        })
    }

    pub fn network_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.qnames_of_kind(project, |k| k == TypeKind::Network)
    }

    pub fn channel_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.qnames_of_kind(project, |k| k == TypeKind::Channel)
    }

    pub fn module_interface_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.qnames_of_kind(project, |k| k == TypeKind::ModuleInterface)
    }

    pub fn channel_interface_qnames(&self, project: &ProjectId) -> BTreeSet<SmolStr> {
        self.qnames_of_kind(project, |k| k == TypeKind::ChannelInterface)
    }

    fn qnames_of_kind(
        &self,
        project: &ProjectId,
        pred: impl Fn(TypeKind) -> bool,
    ) -> BTreeSet<SmolStr> {
        self.with_table(project, |t| t.qnames_of_kind(pred).into_iter().collect())
    }

    fn with_table<R: Default>(
        &self,
        project: &ProjectId,
        f: impl FnOnce(&crate::hir::ProjectTable) -> R,
    ) -> R {
        self.inner.with_state(|st| {
            st.rehash_if_needed();
            st.registry.table(project).map(f).unwrap_or_default()
        })
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// A top-level type by qualified name.
    pub fn get_type(&self, qname: &str, project: &ProjectId) -> Option<Arc<TypeDefinition>> {
        self.inner.with_state(|st| {
            st.rehash_if_needed();
            st.registry.table(project)?.component(qname).cloned()
        })
    }

    /// A top-level type, or an inner type below one, by qualified name.
    pub fn get_inner_or_toplevel_type(
        &self,
        qname: &str,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        self.inner
            .with_state(|st| st.resolver().inner_or_toplevel(qname, project))
    }

    /// Resolve `name` as written in `context`. `None` means "no such type".
    pub fn lookup(&self, name: &str, context: LookupContext) -> Option<Arc<TypeDefinition>> {
        self.inner
            .with_state(|st| st.resolver().lookup(name, context))
    }

    /// Resolve a `like` implementation name: qualified names directly,
    /// simple names only if exactly one type of that name conforms to
    /// `interface`.
    pub fn lookup_conforming_type(
        &self,
        name: &str,
        interface: &str,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        self.inner
            .with_state(|st| st.resolver().lookup_conforming(name, interface, project))
    }

    /// Simple names usable unqualified in `context`.
    pub fn get_visible_type_names(&self, context: LookupContext) -> BTreeSet<SmolStr> {
        self.get_visible_type_names_matching(context, |_| true)
    }

    pub fn get_visible_type_names_matching(
        &self,
        context: LookupContext,
        predicate: impl Fn(&TypeDefinition) -> bool,
    ) -> BTreeSet<SmolStr> {
        self.inner
            .with_state(|st| st.resolver().visible_type_names(context, predicate))
    }

    /// Non-interface types of `project` implementing `interface`.
    pub fn get_types_implementing(
        &self,
        interface: &str,
        project: &ProjectId,
    ) -> Vec<Arc<TypeDefinition>> {
        self.inner
            .with_state(|st| st.resolver().types_implementing(interface, project))
    }

    /// The supertype named by the first `extends` clause of `def`.
    pub fn resolve_extends(&self, def: &TypeDefinition) -> Option<Arc<TypeDefinition>> {
        self.inner
            .with_state(|st| st.resolver().resolve_extends(def))
    }

    /// Members of `def` merged along its inheritance chain.
    pub fn inherited_members(&self, def: &Arc<TypeDefinition>) -> Arc<InheritedMembers> {
        self.inner.with_state(|st| st.resolver().inherited(def))
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    pub fn change_serial(&self) -> u64 {
        self.inner
            .with_state(|st| st.invalidator.change_serial())
    }

    /// Number of rehashes performed so far.
    pub fn rehash_count(&self) -> u64 {
        self.inner
            .with_state(|st| st.invalidator.rehash_count())
    }

    /// Number of lookups that actually ran resolution.
    pub fn lookup_misses(&self) -> u64 {
        self.inner
            .with_state(|st| st.invalidator.cache.misses())
    }

    pub fn lookup_cache_len(&self) -> usize {
        self.inner
            .with_state(|st| st.invalidator.cache.len())
    }

    pub fn invalidate(&self) {
        self.inner.with_state(State::invalidate);
    }

    pub fn rehash_if_needed(&self) {
        self.inner.with_state(State::rehash_if_needed);
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    /// Validate every loaded file now and publish the results.
    ///
    /// Waits for a background pass that is already running.
    pub fn validate_all_files(&self) {
        self.inner.validate_all_files(&CancellationToken::new());
    }

    /// Restart the debounce delay of the background validation.
    pub fn schedule_validation(&self) {
        self.inner.with_state(|st| st.schedule_validation());
    }

    /// Published semantic diagnostics of a file.
    pub fn diagnostics(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.inner.with_state(|st| match st.store.id_of(path.as_ref()) {
            Some(id) => st.diagnostics.get(id).to_vec(),
            None => Vec::new(),
        })
    }

    /// Every published semantic diagnostic.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        self.inner
            .with_state(|st| st.diagnostics.all().cloned().collect())
    }

    /// Syntax errors of the last parse of a file.
    pub fn syntax_diagnostics(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.inner.with_state(|st| {
            st.store
                .by_path(path.as_ref())
                .map(|f| {
                    f.syntax_errors
                        .iter()
                        .map(|e| Diagnostic::from_syntax(f.id, e))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    // ========================================================================
    // NOTIFICATION
    // ========================================================================

    pub fn add_change_listener(
        &self,
        listener: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let listener: ChangeListener = Arc::new(listener);
        self.inner.listeners.add(listener)
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Run `f` inside a begin/end bracket. `End` is sent however `f` exits.
    pub fn run_with_begin_end<R>(&self, f: impl FnOnce() -> R) -> R {
        let _bracket = self.inner.bracket();
        f()
    }
}

impl Drop for NedResources {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for NedResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (files, projects) = self
            .inner
            .with_state(|st| (st.store.len(), st.registry.project_names().count()));
        f.debug_struct("NedResources")
            .field("files", &files)
            .field("projects", &projects)
            .finish()
    }
}
