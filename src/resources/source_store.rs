//! Loaded NED files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::FileId;
use crate::parser::{NedFile, Severity, SyntaxError};

/// One loaded NED file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub text: Arc<str>,
    /// Last tree without syntax errors (or the recovered tree of a file that
    /// never parsed cleanly).
    pub tree: Arc<NedFile>,
    /// Errors of the most recent parse.
    pub syntax_errors: Arc<[SyntaxError]>,
    /// The most recent parse failed; the file takes no part in rehash.
    pub broken: bool,
    /// Number of editors holding the file open.
    pub connect_count: u32,
}

impl SourceFile {
    /// Severity of the worst syntax problem, if any.
    pub fn syntax_severity(&self) -> Option<Severity> {
        (!self.syntax_errors.is_empty()).then_some(Severity::Error)
    }
}

/// Files by path and by id. Iteration is in path order.
#[derive(Debug, Default)]
pub(crate) struct SourceStore {
    ids: BTreeMap<PathBuf, FileId>,
    files: FxHashMap<FileId, SourceFile>,
    next_id: u32,
}

impl SourceStore {
    pub fn id_of(&self, path: &Path) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    pub fn get_mut(&mut self, id: FileId) -> Option<&mut SourceFile> {
        self.files.get_mut(&id)
    }

    pub fn by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.id_of(path).and_then(|id| self.files.get(&id))
    }

    /// Insert a newly loaded file under a fresh id.
    pub fn insert(
        &mut self,
        path: PathBuf,
        text: Arc<str>,
        tree: NedFile,
        syntax_errors: Arc<[SyntaxError]>,
    ) -> FileId {
        let id = FileId::new(self.next_id);
        self.next_id += 1;
        let broken = !syntax_errors.is_empty();
        self.ids.insert(path.clone(), id);
        self.files.insert(
            id,
            SourceFile {
                id,
                path,
                text,
                tree: Arc::new(tree),
                syntax_errors,
                broken,
                connect_count: 0,
            },
        );
        id
    }

    pub fn remove(&mut self, path: &Path) -> Option<SourceFile> {
        let id = self.ids.remove(path)?;
        self.files.remove(&id)
    }

    /// Package declared by the loaded file at `path`.
    pub fn package_of(&self, path: &Path) -> Option<String> {
        self.by_path(path)?.tree.package_name().map(str::to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.ids.values().filter_map(|id| self.files.get(id))
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.ids.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
