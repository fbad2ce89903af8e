//! Arena of type definitions keyed by [`TypeKey`].
//!
//! Every loaded file contributes its top-level definitions (and, through
//! them, inner types). The built-in declarations live in the pseudo-file
//! [`FileId::BUILTIN`], which belongs to no project.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::imports::ImportPattern;
use super::types::TypeDefinition;
use crate::base::constants::BUILTIN_DECLARATIONS;
use crate::base::{FileId, ProjectId, TypeKey};
use crate::parser::{NedFile, parse};

/// What the resolver needs to know about one file
#[derive(Clone, Debug)]
pub struct FileScope {
    pub package: SmolStr,
    pub imports: Arc<[ImportPattern]>,
    pub project: Option<ProjectId>,
    /// Top-level definitions in declaration order.
    pub types: Vec<Arc<TypeDefinition>>,
}

#[derive(Debug)]
pub struct DefIndex {
    files: FxHashMap<FileId, FileScope>,
    types: FxHashMap<TypeKey, Arc<TypeDefinition>>,
}

impl Default for DefIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DefIndex {
    /// Create an index holding only the built-in declarations.
    pub fn new() -> Self {
        let mut index = Self {
            files: FxHashMap::default(),
            types: FxHashMap::default(),
        };
        let builtins = parse(BUILTIN_DECLARATIONS);
        if !builtins.ok() {
            tracing::warn!(errors = builtins.errors.len(), "built-in declarations have syntax errors");
        }
        index.set_file(FileId::BUILTIN, &builtins.file, None);
        index
    }

    /// (Re)build the definitions of a file from its tree.
    pub fn set_file(
        &mut self,
        file: FileId,
        tree: &NedFile,
        project: Option<ProjectId>,
    ) -> &[Arc<TypeDefinition>] {
        self.remove_file(file);
        let package = SmolStr::new(tree.package_name().unwrap_or(""));
        let types: Vec<_> = tree
            .types
            .iter()
            .map(|decl| TypeDefinition::build(file, &package, decl))
            .collect();
        for def in &types {
            self.types.insert(def.key, def.clone());
            for inner in def.all_inner_types() {
                self.types.insert(inner.key, inner);
            }
        }
        let imports: Arc<[ImportPattern]> = tree.import_specs().map(ImportPattern::new).collect();
        let scope = self.files.entry(file).or_insert(FileScope {
            package,
            imports,
            project,
            types,
        });
        &scope.types
    }

    pub fn remove_file(&mut self, file: FileId) -> Option<FileScope> {
        let scope = self.files.remove(&file)?;
        self.types.retain(|key, _| key.file != file);
        Some(scope)
    }

    pub fn set_project(&mut self, file: FileId, project: Option<ProjectId>) {
        if let Some(scope) = self.files.get_mut(&file) {
            scope.project = project;
        }
    }

    pub fn file(&self, file: FileId) -> Option<&FileScope> {
        self.files.get(&file)
    }

    pub fn project_of(&self, file: FileId) -> Option<&ProjectId> {
        self.files.get(&file)?.project.as_ref()
    }

    pub fn get(&self, key: TypeKey) -> Option<&Arc<TypeDefinition>> {
        self.types.get(&key)
    }

    /// Top-level definitions of a file
    pub fn file_types(&self, file: FileId) -> &[Arc<TypeDefinition>] {
        self.files.get(&file).map(|s| s.types.as_slice()).unwrap_or(&[])
    }

    pub fn builtins(&self) -> &[Arc<TypeDefinition>] {
        self.file_types(FileId::BUILTIN)
    }

    /// Mark the inherited attributes of every loaded type stale.
    pub fn invalidate_inherited(&self) {
        for scope in self.files.values() {
            for def in &scope.types {
                def.invalidate_inherited();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
