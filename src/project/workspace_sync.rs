//! Keeping the engine in step with the file system.
//!
//! Callers translate their own watcher events into [`WorkspaceChange`]s and
//! hand them over in batches. The initial population of the engine is
//! [`NedResources::read_missing_files`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::base::constants::NEDFOLDERS_FILENAME;
use crate::resources::{ChangeEvent, Inner, NedError, NedResources};

use super::loader;

/// One file-system delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceChange {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
    /// A project was added, removed, opened or closed, or its description
    /// changed.
    ProjectsChanged,
}

impl WorkspaceChange {
    fn path(&self) -> Option<&Path> {
        match self {
            WorkspaceChange::Added(p)
            | WorkspaceChange::Changed(p)
            | WorkspaceChange::Removed(p) => Some(p),
            WorkspaceChange::ProjectsChanged => None,
        }
    }

    /// Whether the change affects the projects configuration.
    fn touches_projects(&self) -> bool {
        match self {
            WorkspaceChange::ProjectsChanged => true,
            _ => self
                .path()
                .and_then(Path::file_name)
                .is_some_and(|name| name == NEDFOLDERS_FILENAME),
        }
    }
}

impl NedResources {
    /// Apply a batch of file-system deltas.
    ///
    /// Added or changed NED files without a connected editor are re-read,
    /// removed files are forgotten, and configuration changes rebuild the
    /// projects table (then load whatever the new folders contain). Failures
    /// of single files do not stop the batch; they are returned together.
    pub fn apply_workspace_changes(&self, changes: &[WorkspaceChange]) -> Result<(), NedError> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut errors = Vec::new();
        let rebuild = changes.iter().any(WorkspaceChange::touches_projects);

        self.run_with_begin_end(|| {
            for change in changes {
                match change {
                    WorkspaceChange::Added(path) | WorkspaceChange::Changed(path) => {
                        if !self.is_ned_file(path) || self.has_connected_editor(path) {
                            continue;
                        }
                        match self.load_from_disk(path) {
                            Ok(_) | Err(NedError::EditorConnected(_)) => {}
                            Err(err) => errors.push(err),
                        }
                    }
                    WorkspaceChange::Removed(path) => {
                        self.forget(path);
                    }
                    WorkspaceChange::ProjectsChanged => {}
                }
            }
            if rebuild {
                match self.rebuild_projects_table() {
                    Ok(()) => {
                        if let Err(err) = self.read_missing_files() {
                            errors.push(err);
                        }
                    }
                    Err(err) => errors.push(err),
                }
            }
            self.rehash_if_needed();
        });

        tracing::debug!(
            changes = changes.len(),
            rebuild,
            failed = errors.len(),
            "workspace changes applied"
        );
        NedError::from_batch(errors)
    }

    /// Load every NED file of every source folder that is not loaded yet.
    ///
    /// Files are read and parsed in parallel without holding the engine
    /// lock, stored one at a time, and rehashed once at the end. The files'
    /// own events are dropped and listeners get a single
    /// `ModelChanged(None)`; events from concurrent edits are delivered as
    /// usual.
    /// Returns the number of files loaded.
    pub fn read_missing_files(&self) -> Result<usize, NedError> {
        read_missing(self.inner())
    }

    /// Run [`read_missing_files`](Self::read_missing_files) on a background
    /// thread.
    pub fn schedule_read_missing_files(
        &self,
    ) -> Result<JoinHandle<Result<usize, NedError>>, NedError> {
        let inner = Arc::clone(self.inner());
        thread::Builder::new()
            .name("ned-reader".into())
            .spawn(move || read_missing(&inner))
            .map_err(NedError::Worker)
    }
}

/// Announces the whole model as changed when dropped.
struct BulkLoad<'a> {
    inner: &'a Inner,
}

impl Drop for BulkLoad<'_> {
    fn drop(&mut self) {
        self.inner
            .with_state(|st| st.events.push(ChangeEvent::ModelChanged(None)));
    }
}

fn read_missing(inner: &Inner) -> Result<usize, NedError> {
    let folders: Vec<PathBuf> = inner.with_state(|st| {
        st.registry
            .projects()
            .flat_map(|p| p.source_folders.iter().cloned())
            .collect()
    });
    let (candidates, mut errors) = loader::collect_files(inner.fs.as_ref(), &folders, |_| true);
    let missing: Vec<PathBuf> = inner.with_state(|st| {
        candidates
            .into_iter()
            .filter(|p| st.store.id_of(p).is_none() && st.registry.is_ned_file(p))
            .collect()
    });
    if missing.is_empty() {
        return NedError::from_batch(errors).map(|()| 0);
    }

    let _bulk = BulkLoad { inner };
    let mut loaded = 0;
    for result in loader::read_all(inner.fs.as_ref(), &missing) {
        match result {
            Ok(file) => {
                let stored = inner.with_state(|st| {
                    // Connected or read in the meantime.
                    if st.store.id_of(&file.path).is_some() {
                        return false;
                    }
                    // Per-file events of a bulk load are folded into one.
                    // Events queued by other threads stay.
                    let mark = st.events.mark();
                    st.apply_parse(&file.path, file.text, file.parse);
                    st.events.discard_since(mark);
                    true
                });
                if stored {
                    loaded += 1;
                }
            }
            Err(err) => errors.push(err),
        }
    }
    inner.with_state(|st| st.rehash_if_needed());
    tracing::debug!(loaded, failed = errors.len(), "read missing files");
    NedError::from_batch(errors).map(|()| loaded)
}
