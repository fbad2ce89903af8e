//! Consistency validation.
//!
//! Checks one file at a time against the current project tables: references
//! must resolve to types of the right kind, inheritance must be acyclic,
//! implementations must conform to their interfaces, and member references
//! inside submodules and connections must name existing parameters and gates
//! used in the right direction.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::diagnostics::{Diagnostic, DiagnosticKind, codes};
use super::lookup::Resolver;
use super::table::ProjectTable;
use super::types::{InheritedMembers, TypeDefinition};
use crate::base::{FileId, NodeId};
use crate::parser::{
    Connection, ConnectionArrow, GateDirection, GateRef, NedFile, Severity, Submodule, TypeKind,
    TypeRef,
};

// ============================================================================
// DUPLICATES
// ============================================================================

/// Duplicate-definition diagnostics for every file involved in a conflict
/// of `table`, whichever project owns the file.
///
/// Every entry is reported against the first other entry of the same name
/// (the second one for the first entry).
pub fn duplicate_diagnostics(
    table: &ProjectTable,
    path_of: impl Fn(FileId) -> String,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (qname, defs) in table.duplicates() {
        for (i, def) in defs.iter().enumerate() {
            if def.is_builtin() {
                continue;
            }
            let other = &defs[if i == 0 { 1 } else { 0 }];
            let message = if other.is_builtin() {
                format!(
                    "{} '{qname}' is a built-in type and cannot be redefined",
                    def.kind.readable_name()
                )
            } else {
                format!(
                    "{} '{qname}' already defined in {}",
                    def.kind.readable_name(),
                    path_of(other.file())
                )
            };
            out.push(Diagnostic::new(
                DiagnosticKind::DuplicateDefinition,
                codes::DUPLICATE_DEFINITION,
                def.file(),
                Some(def.key.node),
                message,
            ));
        }
    }
    out
}

// ============================================================================
// FILE VALIDATOR
// ============================================================================

/// Validate every type declared in `file`.
///
/// `expected_package` is the package implied by the file's location, or
/// `None` when nothing is expected.
pub fn validate_file(
    resolver: &mut Resolver<'_>,
    file: FileId,
    tree: &NedFile,
    expected_package: Option<&str>,
) -> Vec<Diagnostic> {
    let mut validator = FileValidator {
        resolver,
        file,
        tree,
        out: Vec::new(),
    };
    validator.check_package(expected_package);
    let defs: Vec<_> = validator.resolver.index().file_types(file).to_vec();
    for def in &defs {
        validator.check_type(def);
    }
    let mut out = validator.out;
    for diag in &mut out {
        if let Some(span) = diag.node.and_then(|node| tree.find_span(node)) {
            diag.span = span;
        }
    }
    out
}

struct FileValidator<'r, 'a> {
    resolver: &'r mut Resolver<'a>,
    file: FileId,
    tree: &'r NedFile,
    out: Vec<Diagnostic>,
}

/// Required direction of a connection endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Source,
    Destination,
    Bidirectional,
}

impl<'r, 'a> FileValidator<'r, 'a> {
    fn report(&mut self, kind: DiagnosticKind, code: &'static str, node: NodeId, message: String) {
        self.out
            .push(Diagnostic::new(kind, code, self.file, Some(node), message));
    }

    fn error(&mut self, code: &'static str, node: NodeId, message: String) {
        self.report(DiagnosticKind::Consistency, code, node, message);
    }

    fn unresolved(&mut self, reference: &TypeRef) {
        self.report(
            DiagnosticKind::UnresolvedReference,
            codes::UNDEFINED_REFERENCE,
            reference.node,
            format!("no such type: '{}'", reference.name),
        );
    }

    fn resolve(&mut self, reference: &TypeRef, def: &TypeDefinition) -> Option<Arc<TypeDefinition>> {
        let resolved = self.resolver.lookup(&reference.name, def.lookup_context());
        if resolved.is_none() {
            self.unresolved(reference);
        }
        resolved
    }

    // ========================================================================
    // FILE LEVEL
    // ========================================================================

    fn check_package(&mut self, expected: Option<&str>) {
        let Some(expected) = expected else {
            return;
        };
        let declared = self.tree.package_name().unwrap_or("");
        if declared == expected {
            return;
        }
        let message = format!(
            "declared package '{declared}' does not match expected package '{expected}'"
        );
        let diag = Diagnostic::new(
            DiagnosticKind::Consistency,
            codes::PACKAGE_MISMATCH,
            self.file,
            self.tree.package.as_ref().map(|p| p.node),
            message,
        )
        .with_severity(Severity::Warning);
        self.out.push(diag);
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    fn check_type(&mut self, def: &Arc<TypeDefinition>) {
        self.check_extends(def);
        self.check_interfaces(def);
        let members = self.resolver.inherited(def);
        if members.cycle {
            self.error(
                codes::CIRCULAR_DEPENDENCY,
                def.key.node,
                format!("cycle in the inheritance chain of '{}'", def.qualified_name),
            );
        } else {
            self.check_conformance(def, &members);
        }
        self.check_members(def, &members);
        if def.kind.is_compound() {
            self.check_submodules(def);
            for conn in &def.decl.connections {
                self.check_connection(def, &members, conn);
            }
        }
        let inner: Vec<_> = def.inner_types.values().cloned().collect();
        for inner in &inner {
            self.check_type(inner);
        }
    }

    fn check_extends(&mut self, def: &TypeDefinition) {
        if def.decl.extends.len() > 1 && !def.kind.is_interface() {
            self.error(
                codes::INVALID_SPECIALIZATION,
                def.decl.extends[1].node,
                format!(
                    "'{}': only interfaces may extend more than one type",
                    def.name
                ),
            );
        }
        for reference in &def.decl.extends {
            let Some(sup) = self.resolve(reference, def) else {
                continue;
            };
            let allowed = match def.kind {
                TypeKind::SimpleModule => sup.kind == TypeKind::SimpleModule,
                TypeKind::CompoundModule | TypeKind::Network => sup.kind.is_module(),
                other => sup.kind == other,
            };
            if !allowed {
                self.error(
                    codes::INVALID_SPECIALIZATION,
                    reference.node,
                    format!(
                        "{} '{}' cannot extend {} '{}'",
                        def.kind.readable_name(),
                        def.name,
                        sup.kind.readable_name(),
                        sup.qualified_name
                    ),
                );
            }
        }
    }

    fn check_interfaces(&mut self, def: &TypeDefinition) {
        if def.kind.is_interface() && !def.decl.interfaces.is_empty() {
            self.error(
                codes::INVALID_SPECIALIZATION,
                def.decl.interfaces[0].node,
                "interfaces cannot use 'like', use 'extends' instead".to_string(),
            );
            return;
        }
        let expected = if def.kind.is_channel_family() {
            TypeKind::ChannelInterface
        } else {
            TypeKind::ModuleInterface
        };
        for reference in &def.decl.interfaces {
            let Some(iface) = self.resolve(reference, def) else {
                continue;
            };
            if iface.kind != expected {
                self.error(
                    codes::TYPE_MISMATCH,
                    reference.node,
                    format!("'{}' is not a {}", iface.qualified_name, expected.readable_name()),
                );
            }
        }
    }

    /// Implementations must provide the parameters and gates of every
    /// interface they implement.
    fn check_conformance(&mut self, def: &TypeDefinition, members: &InheritedMembers) {
        if def.kind.is_interface() {
            return;
        }
        let Some(project) = self.resolver.project_for(def.lookup_context()) else {
            return;
        };
        for iface_name in &members.interfaces {
            let Some(iface) = self.resolver.inner_or_toplevel(iface_name, &project) else {
                continue;
            };
            if !iface.kind.is_interface() {
                continue;
            }
            let required = self.resolver.inherited(&iface);
            for (name, param) in &required.params {
                match members.param(name) {
                    None => self.error(
                        codes::MISSING_REQUIRED,
                        def.key.node,
                        format!("missing parameter '{name}' required by interface '{iface_name}'"),
                    ),
                    Some(own) if own.decl.ty != param.decl.ty => self.error(
                        codes::TYPE_MISMATCH,
                        def.key.node,
                        format!("type of parameter '{name}' differs from interface '{iface_name}'"),
                    ),
                    Some(_) => {}
                }
            }
            for (name, gate) in &required.gates {
                match members.gate(name) {
                    None => self.error(
                        codes::MISSING_REQUIRED,
                        def.key.node,
                        format!("missing gate '{name}' required by interface '{iface_name}'"),
                    ),
                    Some(own)
                        if own.decl.direction != gate.decl.direction
                            || own.decl.is_vector != gate.decl.is_vector =>
                    {
                        self.error(
                            codes::TYPE_MISMATCH,
                            def.key.node,
                            format!("gate '{name}' differs from interface '{iface_name}'"),
                        )
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Local parameters, gates, submodules and inner types.
    fn check_members(&mut self, def: &TypeDefinition, members: &InheritedMembers) {
        let mut seen = FxHashSet::default();
        for param in &def.decl.params {
            if param.is_declaration() {
                if !seen.insert(param.name.clone()) {
                    self.error(
                        codes::INVALID_REDEFINITION,
                        param.node,
                        format!("parameter '{}' already declared", param.name),
                    );
                } else if let Some(inherited) = members
                    .param(&param.name)
                    .filter(|p| p.declared_in != def.qualified_name)
                {
                    let message = format!(
                        "parameter '{}' already declared in '{}'",
                        param.name, inherited.declared_in
                    );
                    self.error(codes::INVALID_REDEFINITION, param.node, message);
                }
            } else if members.param(&param.name).is_none() {
                self.error(
                    codes::UNKNOWN_MEMBER,
                    param.node,
                    format!("no such parameter: '{}'", param.name),
                );
            }
        }

        let mut seen = FxHashSet::default();
        for gate in &def.decl.gates {
            if gate.direction.is_some() {
                if !seen.insert(gate.name.clone()) {
                    self.error(
                        codes::INVALID_REDEFINITION,
                        gate.node,
                        format!("gate '{}' already declared", gate.name),
                    );
                } else if let Some(inherited) = members
                    .gate(&gate.name)
                    .filter(|g| g.declared_in != def.qualified_name)
                {
                    let message = format!(
                        "gate '{}' already declared in '{}'",
                        gate.name, inherited.declared_in
                    );
                    self.error(codes::INVALID_REDEFINITION, gate.node, message);
                }
                continue;
            }
            match members.gate(&gate.name) {
                None => self.error(
                    codes::UNKNOWN_MEMBER,
                    gate.node,
                    format!("no such gate: '{}'", gate.name),
                ),
                Some(g) if !g.decl.is_vector => self.error(
                    codes::UNKNOWN_MEMBER,
                    gate.node,
                    format!("gate '{}' is not a vector gate", gate.name),
                ),
                Some(_) => {}
            }
        }

        let mut seen = FxHashSet::default();
        for sub in &def.decl.submodules {
            if !seen.insert(sub.name.clone()) {
                self.error(
                    codes::INVALID_REDEFINITION,
                    sub.node,
                    format!("submodule '{}' already defined", sub.name),
                );
            }
        }

        let mut seen = FxHashSet::default();
        for inner in &def.decl.types {
            if !seen.insert(inner.name.clone()) {
                self.error(
                    codes::INVALID_REDEFINITION,
                    inner.node,
                    format!("type '{}' already defined", inner.name),
                );
            }
        }
    }

    // ========================================================================
    // SUBMODULES
    // ========================================================================

    /// The type of a submodule: its interface for `like` submodules.
    fn submodule_type(
        &mut self,
        def: &TypeDefinition,
        sub: &Submodule,
        report: bool,
    ) -> Option<Arc<TypeDefinition>> {
        if report {
            self.resolve(&sub.type_ref, def)
        } else {
            self.resolver.lookup(&sub.type_ref.name, def.lookup_context())
        }
    }

    fn check_submodules(&mut self, def: &TypeDefinition) {
        for sub in &def.decl.submodules {
            let Some(ty) = self.submodule_type(def, sub, true) else {
                continue;
            };
            if sub.is_like() {
                if ty.kind != TypeKind::ModuleInterface {
                    self.error(
                        codes::TYPE_MISMATCH,
                        sub.type_ref.node,
                        format!("'{}' is not a module interface", ty.qualified_name),
                    );
                    continue;
                }
            } else if !ty.kind.is_module() {
                self.error(
                    codes::TYPE_MISMATCH,
                    sub.type_ref.node,
                    format!("'{}' is not a module type", ty.qualified_name),
                );
                continue;
            }

            let members = self.resolver.inherited(&ty);
            for param in &sub.params {
                if param.is_declaration() {
                    self.error(
                        codes::INVALID_REDEFINITION,
                        param.node,
                        format!("parameter '{}' cannot be declared in a submodule", param.name),
                    );
                } else if members.param(&param.name).is_none() {
                    self.error(
                        codes::UNKNOWN_MEMBER,
                        param.node,
                        format!("type '{}' has no parameter '{}'", ty.qualified_name, param.name),
                    );
                }
            }
            for gate in &sub.gates {
                match members.gate(&gate.name) {
                    None => self.error(
                        codes::UNKNOWN_MEMBER,
                        gate.node,
                        format!("type '{}' has no gate '{}'", ty.qualified_name, gate.name),
                    ),
                    Some(g) if !g.decl.is_vector => self.error(
                        codes::UNKNOWN_MEMBER,
                        gate.node,
                        format!(
                            "gate '{}' of '{}' is not a vector gate",
                            gate.name, ty.qualified_name
                        ),
                    ),
                    Some(_) => {}
                }
            }
        }
    }

    // ========================================================================
    // CONNECTIONS
    // ========================================================================

    fn check_connection(
        &mut self,
        def: &TypeDefinition,
        members: &InheritedMembers,
        conn: &Connection,
    ) {
        let (src_role, dest_role) = match conn.arrow {
            ConnectionArrow::Unidirectional => (Role::Source, Role::Destination),
            ConnectionArrow::Bidirectional => (Role::Bidirectional, Role::Bidirectional),
        };
        self.check_endpoint(def, members, conn, &conn.src, src_role);
        self.check_endpoint(def, members, conn, &conn.dest, dest_role);

        let Some(channel) = &conn.channel else {
            return;
        };
        let Some(reference) = &channel.type_ref else {
            return;
        };
        let Some(ty) = self.resolve(reference, def) else {
            return;
        };
        if channel.like_expr.is_some() {
            if ty.kind != TypeKind::ChannelInterface {
                self.error(
                    codes::TYPE_MISMATCH,
                    reference.node,
                    format!("'{}' is not a channel interface", ty.qualified_name),
                );
            }
        } else if ty.kind != TypeKind::Channel {
            self.error(
                codes::TYPE_MISMATCH,
                reference.node,
                format!("'{}' is not a channel type", ty.qualified_name),
            );
        }
    }

    /// Find a submodule along the inheritance chain of the compound module.
    fn find_submodule(members: &InheritedMembers, name: &str) -> Option<Submodule> {
        members
            .extends_chain
            .iter()
            .find_map(|ty| ty.submodule(name).cloned())
    }

    fn check_endpoint(
        &mut self,
        def: &TypeDefinition,
        members: &InheritedMembers,
        conn: &Connection,
        endpoint: &GateRef,
        role: Role,
    ) {
        let node = conn.node;
        let gate_name = endpoint.base_gate();
        let gate = match &endpoint.module {
            Some(module) => {
                let Some(sub) = Self::find_submodule(members, module) else {
                    self.error(
                        codes::INVALID_CONNECTION,
                        node,
                        format!("no submodule named '{module}'"),
                    );
                    return;
                };
                if sub.vector_size.is_some() && !endpoint.module_indexed {
                    self.error(
                        codes::INVALID_CONNECTION,
                        node,
                        format!("submodule '{module}' is a vector, an index is required"),
                    );
                } else if sub.vector_size.is_none() && endpoint.module_indexed {
                    self.error(
                        codes::INVALID_CONNECTION,
                        node,
                        format!("submodule '{module}' is not a vector"),
                    );
                }
                let Some(ty) = self.submodule_type(def, &sub, false) else {
                    return;
                };
                let sub_members = self.resolver.inherited(&ty);
                match sub_members.gate(gate_name) {
                    Some(gate) => gate.decl.clone(),
                    None => {
                        self.error(
                            codes::INVALID_CONNECTION,
                            node,
                            format!("submodule '{module}' has no gate named '{gate_name}'"),
                        );
                        return;
                    }
                }
            }
            None => match members.gate(gate_name) {
                Some(gate) => gate.decl.clone(),
                None => {
                    self.error(
                        codes::INVALID_CONNECTION,
                        node,
                        format!("compound module has no gate named '{gate_name}'"),
                    );
                    return;
                }
            },
        };

        let Some(declared) = gate.direction else {
            return;
        };
        let half = endpoint.half();
        if half.is_some() && declared != GateDirection::Inout {
            self.error(
                codes::INVALID_CONNECTION,
                node,
                format!("gate '{gate_name}' is not an inout gate, it has no halves"),
            );
            return;
        }
        let effective = half.unwrap_or(declared);
        // Gates of the parent module are seen from the inside.
        let parent_side = endpoint.module.is_none();
        let required = match (role, parent_side) {
            (Role::Bidirectional, _) => GateDirection::Inout,
            (Role::Source, false) | (Role::Destination, true) => GateDirection::Output,
            (Role::Source, true) | (Role::Destination, false) => GateDirection::Input,
        };
        if effective != required {
            let message = if required == GateDirection::Inout || effective == GateDirection::Inout {
                if required == GateDirection::Inout {
                    format!("gate '{gate_name}' is not an inout gate, use '-->' or '<--'")
                } else {
                    format!("gate '{gate_name}' is an inout gate, use '<-->' or a gate half")
                }
            } else {
                format!("gate '{gate_name}' is an {} gate", effective.as_str())
            };
            self.error(codes::INVALID_CONNECTION, node, message);
        }

        if gate.is_vector && !endpoint.index.is_indexed() {
            self.error(
                codes::INVALID_CONNECTION,
                node,
                format!("gate '{gate_name}' is a vector gate, an index or '++' is required"),
            );
        } else if !gate.is_vector && endpoint.index.is_indexed() {
            self.error(
                codes::INVALID_CONNECTION,
                node,
                format!("gate '{gate_name}' is not a vector gate"),
            );
        }
    }
}
