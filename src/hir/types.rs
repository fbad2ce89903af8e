//! Type definitions derived from parsed trees.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use smol_str::SmolStr;

use super::lookup::LookupContext;
use crate::base::{FileId, TypeKey};
use crate::parser::{GateDecl, ParamDecl, Submodule, TypeDecl, TypeKind};

// ============================================================================
// TYPE DEFINITION
// ============================================================================

/// A NED type (top-level or inner) as seen by the resolver.
///
/// Definitions are immutable apart from the inherited-members cache, which is
/// computed on demand and dropped by [`TypeDefinition::invalidate_inherited`].
#[derive(Debug)]
pub struct TypeDefinition {
    pub key: TypeKey,
    pub name: SmolStr,
    pub qualified_name: SmolStr,
    pub kind: TypeKind,
    /// Package of the containing file (`""` for the default package).
    pub package: SmolStr,
    /// The declaration this definition was built from.
    pub decl: TypeDecl,
    /// Directly enclosing type for inner types.
    pub enclosing: Option<TypeKey>,
    /// Top-level type containing this one (itself when top-level).
    pub toplevel: TypeKey,
    pub inner_types: IndexMap<SmolStr, Arc<TypeDefinition>>,
    inherited: Mutex<Option<Arc<InheritedMembers>>>,
}

impl TypeDefinition {
    /// Build the definition of a top-level declaration and all its inner types.
    pub fn build(file: FileId, package: &str, decl: &TypeDecl) -> Arc<TypeDefinition> {
        let key = TypeKey::new(file, decl.node);
        let qualified_name = if package.is_empty() {
            decl.name.clone()
        } else {
            SmolStr::new(format!("{package}.{}", decl.name))
        };
        Self::build_inner(file, package, decl, qualified_name, None, key)
    }

    fn build_inner(
        file: FileId,
        package: &str,
        decl: &TypeDecl,
        qualified_name: SmolStr,
        enclosing: Option<TypeKey>,
        toplevel: TypeKey,
    ) -> Arc<TypeDefinition> {
        let key = TypeKey::new(file, decl.node);
        let mut inner_types = IndexMap::new();
        for inner in &decl.types {
            let inner_qname = SmolStr::new(format!("{qualified_name}.{}", inner.name));
            let def = Self::build_inner(file, package, inner, inner_qname, Some(key), toplevel);
            // First declaration wins; redeclarations are reported by validation.
            inner_types.entry(inner.name.clone()).or_insert(def);
        }
        Arc::new(TypeDefinition {
            key,
            name: decl.name.clone(),
            qualified_name,
            kind: decl.kind,
            package: SmolStr::new(package),
            decl: decl.clone(),
            enclosing,
            toplevel,
            inner_types,
            inherited: Mutex::new(None),
        })
    }

    pub fn file(&self) -> FileId {
        self.key.file
    }

    pub fn is_builtin(&self) -> bool {
        self.key.is_builtin()
    }

    pub fn is_toplevel(&self) -> bool {
        self.enclosing.is_none()
    }

    /// Context in which names used inside this type are resolved.
    pub fn lookup_context(&self) -> LookupContext {
        LookupContext::Type(self.key)
    }

    pub fn extends_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.decl.extends.iter().map(|r| &r.name)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.decl.interfaces.iter().map(|r| &r.name)
    }

    /// Name of the first `extends` entry, the supertype of non-interface types.
    pub fn first_extends(&self) -> Option<&SmolStr> {
        self.decl.extends.first().map(|r| &r.name)
    }

    pub fn submodule(&self, name: &str) -> Option<&Submodule> {
        self.decl.submodules.iter().find(|s| s.name == name)
    }

    /// Inner type by dotted path below this type (`"A"` or `"A.B"`).
    pub fn inner_type_path(&self, path: &str) -> Option<&Arc<TypeDefinition>> {
        let (first, rest) = match path.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };
        let inner = self.inner_types.get(first)?;
        match rest {
            Some(rest) => inner.inner_type_path(rest),
            None => Some(inner),
        }
    }

    /// All inner types, depth first.
    pub fn all_inner_types(&self) -> Vec<Arc<TypeDefinition>> {
        let mut out = Vec::new();
        for inner in self.inner_types.values() {
            out.push(inner.clone());
            out.extend(inner.all_inner_types());
        }
        out
    }

    // ========================================================================
    // INHERITED MEMBERS CACHE
    // ========================================================================

    pub fn cached_inherited(&self) -> Option<Arc<InheritedMembers>> {
        self.inherited.lock().clone()
    }

    pub(crate) fn store_inherited(&self, members: Arc<InheritedMembers>) {
        *self.inherited.lock() = Some(members);
    }

    /// Mark inherited attributes stale, recursively for inner types.
    pub fn invalidate_inherited(&self) {
        *self.inherited.lock() = None;
        for inner in self.inner_types.values() {
            inner.invalidate_inherited();
        }
    }
}

// ============================================================================
// INHERITED MEMBERS
// ============================================================================

/// A parameter visible in a type, with the type that declared it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InheritedParam {
    pub decl: ParamDecl,
    pub declared_in: SmolStr,
}

/// A gate visible in a type, with the type that declared it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InheritedGate {
    pub decl: GateDecl,
    pub declared_in: SmolStr,
}

/// Members accumulated along the inheritance chain of a type.
#[derive(Clone, Debug, Default)]
pub struct InheritedMembers {
    /// The type itself followed by its resolved supertypes, nearest first.
    pub extends_chain: Vec<Arc<TypeDefinition>>,
    /// Qualified names of all implemented interfaces, transitively through
    /// supertypes and interface inheritance.
    pub interfaces: IndexSet<SmolStr>,
    pub params: IndexMap<SmolStr, InheritedParam>,
    pub gates: IndexMap<SmolStr, InheritedGate>,
    /// The chain loops back onto itself.
    pub cycle: bool,
}

impl InheritedMembers {
    pub fn param(&self, name: &str) -> Option<&InheritedParam> {
        self.params.get(name)
    }

    pub fn gate(&self, name: &str) -> Option<&InheritedGate> {
        self.gates.get(name)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.contains(interface)
    }

    /// Supertypes only, without the type itself.
    pub fn supertypes(&self) -> &[Arc<TypeDefinition>] {
        self.extends_chain.get(1..).unwrap_or(&[])
    }
}
