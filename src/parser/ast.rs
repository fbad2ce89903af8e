//! NED syntax tree.
//!
//! Every node carries a [`NodeId`] unique within its file. The tree is plain
//! owned data; cross references (extends, like, submodule types) are kept as
//! names and resolved later by the engine.

use smol_str::SmolStr;

use crate::base::{NodeId, Position, Span};

/// Root of a parsed NED file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NedFile {
    pub package: Option<PackageDecl>,
    pub imports: Vec<Import>,
    /// File-level properties (`@namespace(inet);`).
    pub properties: Vec<Property>,
    pub types: Vec<TypeDecl>,
    /// High-water mark of allocated node ids; new nodes merged into this
    /// tree are numbered from here.
    pub next_node: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageDecl {
    pub node: NodeId,
    pub name: SmolStr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub node: NodeId,
    /// Import spec as written, e.g. `inet.base.*`.
    pub spec: SmolStr,
    pub span: Span,
}

impl Import {
    pub fn is_wildcard(&self) -> bool {
        self.spec.contains('*')
    }
}

/// A property such as `@unit(s)` or `@display("i=block/queue")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub node: NodeId,
    pub name: SmolStr,
    /// `@name[index]`
    pub index: Option<SmolStr>,
    /// Value lists in source order. The default key is empty.
    pub entries: Vec<PropertyEntry>,
    pub span: Span,
}

/// `key=v1,v2` inside a property; string literals are stored unquoted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyEntry {
    pub key: SmolStr,
    pub values: Vec<SmolStr>,
}

impl Property {
    pub fn values(&self, key: &str) -> &[SmolStr] {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of the default key, e.g. `inet` for `@namespace(inet)`.
    pub fn simple_value(&self) -> Option<&str> {
        self.values("").first().map(SmolStr::as_str)
    }
}

/// First property named `name` without an index.
pub fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties
        .iter()
        .find(|p| p.name == name && p.index.is_none())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    SimpleModule,
    CompoundModule,
    Network,
    Channel,
    ModuleInterface,
    ChannelInterface,
}

impl TypeKind {
    /// Human-readable tag used in diagnostics.
    pub fn readable_name(self) -> &'static str {
        match self {
            TypeKind::SimpleModule => "simple module",
            TypeKind::CompoundModule => "compound module",
            TypeKind::Network => "network",
            TypeKind::Channel => "channel",
            TypeKind::ModuleInterface => "module interface",
            TypeKind::ChannelInterface => "channel interface",
        }
    }

    pub fn is_interface(self) -> bool {
        matches!(self, TypeKind::ModuleInterface | TypeKind::ChannelInterface)
    }

    /// Module-like types (instantiable as submodules).
    pub fn is_module(self) -> bool {
        matches!(
            self,
            TypeKind::SimpleModule | TypeKind::CompoundModule | TypeKind::Network
        )
    }

    pub fn is_channel_family(self) -> bool {
        matches!(self, TypeKind::Channel | TypeKind::ChannelInterface)
    }

    /// Types that may carry a `types:` section.
    pub fn is_compound(self) -> bool {
        matches!(self, TypeKind::CompoundModule | TypeKind::Network)
    }
}

/// A reference to a type by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub node: NodeId,
    pub name: SmolStr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub node: NodeId,
    pub kind: TypeKind,
    pub name: SmolStr,
    pub extends: Vec<TypeRef>,
    /// `like` clause: interfaces this type declares conformance to.
    pub interfaces: Vec<TypeRef>,
    pub params: Vec<ParamDecl>,
    pub gates: Vec<GateDecl>,
    /// Inner types (`types:` section).
    pub types: Vec<TypeDecl>,
    pub submodules: Vec<Submodule>,
    pub connections: Vec<Connection>,
    pub allow_unconnected: bool,
    pub properties: Vec<Property>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Int,
    Double,
    String,
    Xml,
    Object,
}

/// A parameter declaration (`double delay = 1s;`) or, when `ty` is `None`,
/// an assignment to an inherited or submodule parameter (`delay = 2s;`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDecl {
    pub node: NodeId,
    pub name: SmolStr,
    pub ty: Option<ParamType>,
    pub volatile: bool,
    /// Value expression text, kept opaque.
    pub value: Option<SmolStr>,
    pub properties: Vec<Property>,
    pub span: Span,
}

impl ParamDecl {
    pub fn is_declaration(&self) -> bool {
        self.ty.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateDirection {
    Input,
    Output,
    Inout,
}

impl GateDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            GateDirection::Input => "input",
            GateDirection::Output => "output",
            GateDirection::Inout => "inout",
        }
    }
}

/// A gate declaration (`input in[];`) or, when `direction` is `None`, a gate
/// vector size specification (`out[3];`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateDecl {
    pub node: NodeId,
    pub name: SmolStr,
    pub direction: Option<GateDirection>,
    pub is_vector: bool,
    pub size: Option<SmolStr>,
    pub properties: Vec<Property>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submodule {
    pub node: NodeId,
    pub name: SmolStr,
    /// Vector size expression for `name[n]: Type`.
    pub vector_size: Option<SmolStr>,
    /// The concrete type, or the interface for `like` submodules.
    pub type_ref: TypeRef,
    /// `<expr>` of a `<expr> like IFace` submodule (empty for `<>`).
    pub like_expr: Option<SmolStr>,
    pub params: Vec<ParamDecl>,
    pub gates: Vec<GateDecl>,
    pub properties: Vec<Property>,
    pub span: Span,
}

impl Submodule {
    pub fn is_like(&self) -> bool {
        self.like_expr.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateIndex {
    None,
    Index,
    PlusPlus,
}

impl GateIndex {
    pub fn is_indexed(self) -> bool {
        !matches!(self, GateIndex::None)
    }
}

/// One endpoint of a connection: `sub[i].gate++` or a parent gate `gate[j]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GateRef {
    pub module: Option<SmolStr>,
    pub module_indexed: bool,
    pub gate: SmolStr,
    pub index: GateIndex,
}

impl GateRef {
    /// Gate name without a `$i`/`$o` half suffix.
    pub fn base_gate(&self) -> &str {
        self.gate
            .strip_suffix("$i")
            .or_else(|| self.gate.strip_suffix("$o"))
            .unwrap_or(&self.gate)
    }

    /// The half named by a `$i`/`$o` suffix.
    pub fn half(&self) -> Option<GateDirection> {
        if self.gate.ends_with("$i") {
            Some(GateDirection::Input)
        } else if self.gate.ends_with("$o") {
            Some(GateDirection::Output)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionArrow {
    /// `-->` or `<--` (normalized so that `src` is the sending side).
    Unidirectional,
    /// `<-->`
    Bidirectional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    pub node: NodeId,
    /// Channel type; `None` for an anonymous `{ ... }` channel.
    pub type_ref: Option<TypeRef>,
    pub like_expr: Option<SmolStr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub node: NodeId,
    pub src: GateRef,
    pub dest: GateRef,
    pub arrow: ConnectionArrow,
    pub channel: Option<ChannelSpec>,
    pub span: Span,
}

impl NedFile {
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.name.as_str())
    }

    pub fn import_specs(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|i| i.spec.as_str())
    }

    /// File-level property `name`.
    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name)
    }

    /// Span of the node with the given id, searching the whole tree.
    pub fn find_span(&self, node: NodeId) -> Option<Span> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        nodes.into_iter().find(|n| n.node == node).map(|n| n.span)
    }

    /// Innermost node whose span contains `position`.
    pub fn element_at(&self, position: Position) -> Option<NodeId> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        // Parents precede their children, so the last hit is the innermost.
        nodes
            .into_iter()
            .rev()
            .find(|n| n.span.contains(position))
            .map(|n| n.node)
    }

    fn collect_nodes(&self, out: &mut Vec<NodeSpan>) {
        if let Some(pkg) = &self.package {
            out.push(NodeSpan::new(pkg.node, pkg.span));
        }
        out.extend(self.imports.iter().map(|i| NodeSpan::new(i.node, i.span)));
        push_properties(&self.properties, out);
        for ty in &self.types {
            ty.collect_nodes(out);
        }
    }
}

/// A node with its position, in tree pre-order.
#[derive(Clone, Copy, Debug)]
struct NodeSpan {
    node: NodeId,
    span: Span,
}

impl NodeSpan {
    fn new(node: NodeId, span: Span) -> Self {
        Self { node, span }
    }
}

fn push_properties(properties: &[Property], out: &mut Vec<NodeSpan>) {
    out.extend(properties.iter().map(|p| NodeSpan::new(p.node, p.span)));
}

fn push_type_ref(r: &TypeRef, out: &mut Vec<NodeSpan>) {
    out.push(NodeSpan::new(r.node, r.span));
}

impl TypeDecl {
    /// Type-level property `name`.
    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name)
    }

    fn collect_nodes(&self, out: &mut Vec<NodeSpan>) {
        out.push(NodeSpan::new(self.node, self.span));
        for r in self.extends.iter().chain(&self.interfaces) {
            push_type_ref(r, out);
        }
        push_properties(&self.properties, out);
        for param in &self.params {
            param.collect_nodes(out);
        }
        for gate in &self.gates {
            gate.collect_nodes(out);
        }
        for inner in &self.types {
            inner.collect_nodes(out);
        }
        for sub in &self.submodules {
            out.push(NodeSpan::new(sub.node, sub.span));
            push_type_ref(&sub.type_ref, out);
            push_properties(&sub.properties, out);
            for param in &sub.params {
                param.collect_nodes(out);
            }
            for gate in &sub.gates {
                gate.collect_nodes(out);
            }
        }
        for conn in &self.connections {
            out.push(NodeSpan::new(conn.node, conn.span));
            if let Some(channel) = &conn.channel {
                out.push(NodeSpan::new(channel.node, channel.span));
                if let Some(r) = &channel.type_ref {
                    push_type_ref(r, out);
                }
            }
        }
    }
}

impl ParamDecl {
    fn collect_nodes(&self, out: &mut Vec<NodeSpan>) {
        out.push(NodeSpan::new(self.node, self.span));
        push_properties(&self.properties, out);
    }
}

impl GateDecl {
    fn collect_nodes(&self, out: &mut Vec<NodeSpan>) {
        out.push(NodeSpan::new(self.node, self.span));
        push_properties(&self.properties, out);
    }
}
