//! Per-project symbol tables.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::types::TypeDefinition;
use crate::parser::TypeKind;

/// Derived symbol tables of one project.
///
/// A name is either canonical (in `components`) or ambiguous (in
/// `duplicates`), never both; `reserved` covers both plus inner types.
#[derive(Clone, Debug, Default)]
pub struct ProjectTable {
    components: IndexMap<SmolStr, Arc<TypeDefinition>>,
    duplicates: IndexMap<SmolStr, Vec<Arc<TypeDefinition>>>,
    reserved: FxHashSet<SmolStr>,
    by_simple_name: FxHashMap<SmolStr, Vec<SmolStr>>,
}

impl ProjectTable {
    /// An empty table seeded with the built-in types.
    pub fn seeded(builtins: &[Arc<TypeDefinition>]) -> Self {
        let mut table = Self::default();
        for def in builtins {
            table.register(def.clone());
        }
        table
    }

    /// Register a top-level type. The first definition of a name is
    /// canonical; a second one moves both into `duplicates`, and any further
    /// one is appended there.
    pub fn register(&mut self, def: Arc<TypeDefinition>) {
        let qname = def.qualified_name.clone();
        self.reserved.insert(qname.clone());
        for inner in def.all_inner_types() {
            self.reserved.insert(inner.qualified_name.clone());
        }
        if let Some(list) = self.duplicates.get_mut(&qname) {
            list.push(def);
            return;
        }
        if let Some(existing) = self.components.shift_remove(&qname) {
            self.unindex(&existing);
            self.duplicates.insert(qname, vec![existing, def]);
            return;
        }
        self.by_simple_name
            .entry(def.name.clone())
            .or_default()
            .push(qname.clone());
        self.components.insert(qname, def);
    }

    fn unindex(&mut self, def: &TypeDefinition) {
        if let Some(names) = self.by_simple_name.get_mut(&def.name) {
            names.retain(|n| *n != def.qualified_name);
            if names.is_empty() {
                self.by_simple_name.remove(&def.name);
            }
        }
    }

    pub fn component(&self, qname: &str) -> Option<&Arc<TypeDefinition>> {
        self.components.get(qname)
    }

    pub fn components(&self) -> impl Iterator<Item = &Arc<TypeDefinition>> {
        self.components.values()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.components.keys()
    }

    pub fn duplicates(&self) -> &IndexMap<SmolStr, Vec<Arc<TypeDefinition>>> {
        &self.duplicates
    }

    pub fn is_reserved(&self, qname: &str) -> bool {
        self.reserved.contains(qname)
    }

    pub fn reserved(&self) -> impl Iterator<Item = &SmolStr> {
        self.reserved.iter()
    }

    /// Qualified names of components whose simple name is `name`, in
    /// registration order.
    pub fn with_simple_name(&self, name: &str) -> &[SmolStr] {
        self.by_simple_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn qnames_of_kind(&self, pred: impl Fn(TypeKind) -> bool) -> Vec<SmolStr> {
        self.components
            .values()
            .filter(|d| pred(d.kind))
            .map(|d| d.qualified_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
