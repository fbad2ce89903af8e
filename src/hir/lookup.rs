//! Name resolution.
//!
//! [`Resolver`] answers "which type does this name denote here?" against the
//! current project tables. Results are memoized per (project, context, name)
//! in a [`LookupCache`] that is discarded wholesale on every invalidation.
//!
//! ## Resolution order
//!
//! A qualified name (containing a dot) is looked up as an inner type of the
//! enclosing compound module, then as a top-level type. A simple name is
//! tried, first match wins, as:
//!
//! 1. an inner type of the top-level enclosing compound module
//! 2. an exact import (`import a.b.Name;`)
//! 3. a type in the same package
//! 4. a type matched by a wildcard import, imports in declaration order

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::index::DefIndex;
use super::table::ProjectTable;
use super::types::{InheritedGate, InheritedMembers, InheritedParam, TypeDefinition};
use crate::base::{FileId, ProjectId, TypeKey};

/// Where a name is being resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupContext {
    /// File scope: package and imports only.
    File(FileId),
    /// Inside a type declaration.
    Type(TypeKey),
}

impl LookupContext {
    pub fn file(self) -> FileId {
        match self {
            LookupContext::File(file) => file,
            LookupContext::Type(key) => key.file,
        }
    }
}

// ============================================================================
// CACHE
// ============================================================================

type CacheKey = (ProjectId, LookupContext, SmolStr);

/// Memoized lookup results, including negative ones.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: FxHashMap<CacheKey, Option<Arc<TypeDefinition>>>,
    misses: u64,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups that actually ran resolution.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolution queries over one consistent snapshot of the tables.
pub struct Resolver<'a> {
    index: &'a DefIndex,
    tables: &'a FxHashMap<ProjectId, ProjectTable>,
    cache: &'a mut LookupCache,
    in_progress: FxHashSet<TypeKey>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        index: &'a DefIndex,
        tables: &'a FxHashMap<ProjectId, ProjectTable>,
        cache: &'a mut LookupCache,
    ) -> Self {
        Self {
            index,
            tables,
            cache,
            in_progress: FxHashSet::default(),
        }
    }

    pub fn index(&self) -> &'a DefIndex {
        self.index
    }

    pub fn table(&self, project: &ProjectId) -> Option<&'a ProjectTable> {
        self.tables.get(project)
    }

    /// Project whose tables apply to `context`.
    pub fn project_for(&self, context: LookupContext) -> Option<ProjectId> {
        self.index.project_of(context.file()).cloned()
    }

    /// Resolve `name` in `context`, in the project owning the context's file.
    pub fn lookup(&mut self, name: &str, context: LookupContext) -> Option<Arc<TypeDefinition>> {
        let project = self.project_for(context)?;
        self.lookup_in(name, context, &project)
    }

    /// Resolve `name` in `context` against the tables of `project`.
    pub fn lookup_in(
        &mut self,
        name: &str,
        context: LookupContext,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        let key = (project.clone(), context, SmolStr::new(name));
        if let Some(cached) = self.cache.entries.get(&key) {
            return cached.clone();
        }
        self.cache.misses += 1;
        let result = self.resolve(name, context, project);
        tracing::trace!(
            name,
            ?context,
            found = result.as_ref().map(|d| d.qualified_name.as_str()),
            "type lookup"
        );
        self.cache.entries.insert(key, result.clone());
        result
    }

    fn resolve(
        &self,
        name: &str,
        context: LookupContext,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        let table = self.tables.get(project)?;
        let scope = self.index.file(context.file())?;
        let compound = self.compound_context(context);

        if name.contains('.') {
            if let LookupContext::Type(key) = context {
                let candidates = self
                    .index
                    .get(key)
                    .filter(|d| d.kind.is_compound())
                    .into_iter()
                    .chain(compound.as_ref());
                for candidate in candidates {
                    let inner = name
                        .strip_prefix(candidate.qualified_name.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .and_then(|rest| candidate.inner_type_path(rest));
                    if let Some(inner) = inner {
                        return Some(inner.clone());
                    }
                }
            }
            return table.component(name).cloned();
        }

        if let Some(inner) = compound.as_ref().and_then(|c| c.inner_types.get(name)) {
            return Some(inner.clone());
        }

        for import in scope.imports.iter() {
            if import.names(name) {
                if let Some(def) = table.component(import.spec()) {
                    return Some(def.clone());
                }
            }
        }

        let same_package = if scope.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", scope.package)
        };
        if let Some(def) = table.component(&same_package) {
            return Some(def.clone());
        }

        let candidates = table.with_simple_name(name);
        for import in scope.imports.iter().filter(|i| i.is_wildcard()) {
            if let Some(qname) = candidates.iter().find(|q| import.matches(q)) {
                return table.component(qname).cloned();
            }
        }
        None
    }

    /// The top-level compound module enclosing `context`, if any.
    fn compound_context(&self, context: LookupContext) -> Option<Arc<TypeDefinition>> {
        let LookupContext::Type(key) = context else {
            return None;
        };
        let def = self.index.get(key)?;
        let toplevel = self.index.get(def.toplevel)?;
        toplevel.kind.is_compound().then(|| toplevel.clone())
    }

    /// A top-level type by qualified name, or an inner type below one.
    pub fn inner_or_toplevel(
        &self,
        qname: &str,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        let table = self.tables.get(project)?;
        if let Some(def) = table.component(qname) {
            return Some(def.clone());
        }
        let mut split = qname.len();
        while let Some(dot) = qname[..split].rfind('.') {
            if let Some(outer) = table.component(&qname[..dot]) {
                return outer.inner_type_path(&qname[dot + 1..]).cloned();
            }
            split = dot;
        }
        None
    }

    /// The supertype named by the first `extends` entry of `def`.
    pub fn resolve_extends(&mut self, def: &TypeDefinition) -> Option<Arc<TypeDefinition>> {
        let name = def.first_extends()?.clone();
        self.lookup(&name, def.lookup_context())
    }

    /// Resolve a `like` name to the single visible type conforming to
    /// `interface` (qualified name).
    pub fn lookup_conforming(
        &mut self,
        name: &str,
        interface: &str,
        project: &ProjectId,
    ) -> Option<Arc<TypeDefinition>> {
        let table = self.table(project)?;
        if name.contains('.') {
            return table.component(name).cloned();
        }
        let mut result = None;
        for qname in table.with_simple_name(name) {
            let Some(def) = table.component(qname) else {
                continue;
            };
            if self.inherited(def).implements(interface) {
                if result.is_some() {
                    return None;
                }
                result = Some(def.clone());
            }
        }
        result
    }

    /// Every component implementing `interface`, including interfaces that
    /// extend it.
    pub fn types_implementing(
        &mut self,
        interface: &str,
        project: &ProjectId,
    ) -> Vec<Arc<TypeDefinition>> {
        let Some(table) = self.table(project) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for def in table.components() {
            if self.inherited(def).implements(interface) {
                out.push(def.clone());
            }
        }
        out
    }

    /// Simple names usable unqualified in `context`.
    pub fn visible_type_names(
        &self,
        context: LookupContext,
        predicate: impl Fn(&TypeDefinition) -> bool,
    ) -> BTreeSet<SmolStr> {
        let mut names = BTreeSet::new();
        let Some(project) = self.project_for(context) else {
            return names;
        };
        let (Some(table), Some(scope)) = (self.tables.get(&project), self.index.file(context.file()))
        else {
            return names;
        };
        for def in table.components() {
            let visible = def.package == scope.package
                || scope.imports.iter().any(|i| i.matches(&def.qualified_name));
            if visible && predicate(def) {
                names.insert(def.name.clone());
            }
        }
        if let Some(compound) = self.compound_context(context) {
            for inner in compound.inner_types.values() {
                if predicate(inner) {
                    names.insert(inner.name.clone());
                }
            }
        }
        names
    }

    // ========================================================================
    // INHERITANCE
    // ========================================================================

    /// Members of `def` merged along its inheritance chain (cached on `def`).
    pub fn inherited(&mut self, def: &Arc<TypeDefinition>) -> Arc<InheritedMembers> {
        if let Some(cached) = def.cached_inherited() {
            return cached;
        }
        if !self.in_progress.insert(def.key) {
            // Re-entered through a cyclic `like`/`extends` graph.
            return Arc::new(InheritedMembers {
                extends_chain: vec![def.clone()],
                cycle: true,
                ..Default::default()
            });
        }
        let members = Arc::new(self.compute_inherited(def));
        self.in_progress.remove(&def.key);
        def.store_inherited(members.clone());
        members
    }

    fn compute_inherited(&mut self, def: &Arc<TypeDefinition>) -> InheritedMembers {
        let mut members = InheritedMembers {
            extends_chain: vec![def.clone()],
            ..Default::default()
        };
        let mut seen = FxHashSet::default();
        seen.insert(def.key);

        if def.kind.is_interface() {
            let mut pending = vec![def.clone()];
            while let Some(current) = pending.pop() {
                let names: Vec<_> = current.extends_names().cloned().collect();
                for name in names {
                    let Some(sup) = self.lookup(&name, current.lookup_context()) else {
                        continue;
                    };
                    if sup.key == def.key {
                        members.cycle = true;
                    }
                    if seen.insert(sup.key) {
                        members.extends_chain.push(sup.clone());
                        pending.push(sup);
                    }
                }
            }
        } else {
            let mut current = def.clone();
            while let Some(sup) = self.resolve_extends(&current) {
                if !seen.insert(sup.key) {
                    members.cycle = true;
                    break;
                }
                members.extends_chain.push(sup.clone());
                current = sup;
            }
        }

        // Members: base types first; the topmost declaration of a name wins.
        let chain = members.extends_chain.clone();
        for ty in chain.iter().rev() {
            for param in &ty.decl.params {
                if param.is_declaration() {
                    members
                        .params
                        .entry(param.name.clone())
                        .or_insert_with(|| InheritedParam {
                            decl: param.clone(),
                            declared_in: ty.qualified_name.clone(),
                        });
                }
            }
            for gate in &ty.decl.gates {
                match gate.direction {
                    Some(_) => {
                        members
                            .gates
                            .entry(gate.name.clone())
                            .or_insert_with(|| InheritedGate {
                                decl: gate.clone(),
                                declared_in: ty.qualified_name.clone(),
                            });
                    }
                    None => {
                        if let Some(existing) = members.gates.get_mut(&gate.name) {
                            if gate.size.is_some() {
                                existing.decl.size = gate.size.clone();
                            }
                        }
                    }
                }
            }
        }

        // Interfaces: supertypes of an interface, and for every type in the
        // chain the `like` interfaces together with everything they extend.
        if def.kind.is_interface() {
            let supertypes: Vec<SmolStr> = members
                .supertypes()
                .iter()
                .map(|sup| sup.qualified_name.clone())
                .collect();
            members.interfaces.extend(supertypes);
        }
        for ty in &chain {
            let names: Vec<_> = ty.interface_names().cloned().collect();
            for name in names {
                let Some(iface) = self.lookup(&name, ty.lookup_context()) else {
                    continue;
                };
                let iface_members = self.inherited(&iface);
                for implied in &iface_members.extends_chain {
                    members.interfaces.insert(implied.qualified_name.clone());
                }
            }
        }
        members
    }
}
