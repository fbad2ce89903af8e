//! Structural tree merge
//!
//! When a file is re-parsed, the fresh tree is matched against the current one
//! and every node that still corresponds to an existing node takes over its
//! [`NodeId`]. Nodes are matched within their parent list by a key (the name
//! for declarations, the endpoints for connections). Unmatched nodes receive
//! fresh ids from the old tree's high-water mark, so ids are never reused.
//!
//! The merge also reports whether anything other than source positions
//! changed; a whitespace-only edit yields `changed == false`.

use smol_str::SmolStr;

use super::ast::*;
use crate::base::NodeId;

/// Result of merging a freshly parsed tree into an existing one
#[derive(Debug, Clone)]
pub struct Merge {
    pub tree: NedFile,
    /// Whether the trees differ in anything but spans
    pub changed: bool,
}

/// Merge `new` into `old`, preserving ids of unchanged nodes.
pub fn merge(old: &NedFile, mut new: NedFile) -> Merge {
    let mut alloc = NodeIdAlloc::new(old.next_node.max(1));
    let mut changed = false;

    match (&old.package, &mut new.package) {
        (Some(old_pkg), Some(new_pkg)) => {
            new_pkg.node = old_pkg.node;
            changed |= old_pkg.name != new_pkg.name;
        }
        (None, None) => {}
        (_, new_pkg) => {
            if let Some(pkg) = new_pkg {
                pkg.node = alloc.alloc();
            }
            changed = true;
        }
    }
    changed |= merge_list(&old.imports, &mut new.imports, &mut alloc);
    changed |= merge_list(&old.properties, &mut new.properties, &mut alloc);
    changed |= merge_list(&old.types, &mut new.types, &mut alloc);

    new.next_node = alloc.next;
    Merge { tree: new, changed }
}

/// Whether two trees are equal ignoring node ids and spans.
pub fn structurally_equal(a: &NedFile, b: &NedFile) -> bool {
    !merge(a, b.clone()).changed
}

/// Allocates node ids above a high-water mark
#[derive(Debug, Clone, Copy)]
pub struct NodeIdAlloc {
    next: u32,
}

impl NodeIdAlloc {
    pub fn new(next: u32) -> Self {
        Self { next }
    }

    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId::new(self.next);
        self.next += 1;
        id
    }
}

/// A tree node that can take over the identity of a matching old node
trait Mergeable {
    type Key: PartialEq;

    fn key(&self) -> Self::Key;

    /// Adopt ids from `old` (same key); returns whether content differs.
    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool;

    /// Give this node and all descendants fresh ids.
    fn renumber(&mut self, alloc: &mut NodeIdAlloc);
}

fn merge_list<T: Mergeable>(old: &[T], new: &mut [T], alloc: &mut NodeIdAlloc) -> bool {
    let mut changed = old.len() != new.len();
    let mut used = vec![false; old.len()];
    for (i, item) in new.iter_mut().enumerate() {
        let key = item.key();
        let matched = old
            .iter()
            .enumerate()
            .position(|(j, candidate)| !used[j] && candidate.key() == key);
        match matched {
            Some(j) => {
                used[j] = true;
                changed |= j != i;
                changed |= item.adopt(&old[j], alloc);
            }
            None => {
                item.renumber(alloc);
                changed = true;
            }
        }
    }
    changed
}

fn merge_option<T: Mergeable>(
    old: Option<&T>,
    new: Option<&mut T>,
    alloc: &mut NodeIdAlloc,
) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(old), Some(new)) if old.key() == new.key() => new.adopt(old, alloc),
        (_, Some(new)) => {
            new.renumber(alloc);
            true
        }
        (Some(_), None) => true,
    }
}

impl Mergeable for Import {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.spec.clone()
    }

    fn adopt(&mut self, old: &Self, _alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        false
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
    }
}

impl Mergeable for TypeRef {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.name.clone()
    }

    fn adopt(&mut self, old: &Self, _alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        false
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
    }
}

impl Mergeable for Property {
    type Key = (SmolStr, Option<SmolStr>);

    fn key(&self) -> Self::Key {
        (self.name.clone(), self.index.clone())
    }

    fn adopt(&mut self, old: &Self, _alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        self.entries != old.entries
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
    }
}

impl Mergeable for ParamDecl {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.name.clone()
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        let changed =
            self.ty != old.ty || self.volatile != old.volatile || self.value != old.value;
        merge_list(&old.properties, &mut self.properties, alloc) || changed
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        self.properties.iter_mut().for_each(|p| p.renumber(alloc));
    }
}

impl Mergeable for GateDecl {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.name.clone()
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        let changed = self.direction != old.direction
            || self.is_vector != old.is_vector
            || self.size != old.size;
        merge_list(&old.properties, &mut self.properties, alloc) || changed
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        self.properties.iter_mut().for_each(|p| p.renumber(alloc));
    }
}

impl Mergeable for Submodule {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.name.clone()
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        let mut changed = self.vector_size != old.vector_size || self.like_expr != old.like_expr;
        changed |= merge_option(Some(&old.type_ref), Some(&mut self.type_ref), alloc);
        changed |= merge_list(&old.params, &mut self.params, alloc);
        changed |= merge_list(&old.gates, &mut self.gates, alloc);
        changed |= merge_list(&old.properties, &mut self.properties, alloc);
        changed
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        self.type_ref.renumber(alloc);
        self.params.iter_mut().for_each(|p| p.renumber(alloc));
        self.gates.iter_mut().for_each(|g| g.renumber(alloc));
        self.properties.iter_mut().for_each(|p| p.renumber(alloc));
    }
}

impl Mergeable for ChannelSpec {
    type Key = (Option<SmolStr>, bool);

    fn key(&self) -> Self::Key {
        (
            self.type_ref.as_ref().map(|r| r.name.clone()),
            self.like_expr.is_some(),
        )
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        let changed = self.like_expr != old.like_expr;
        merge_option(old.type_ref.as_ref(), self.type_ref.as_mut(), alloc) || changed
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        if let Some(r) = &mut self.type_ref {
            r.renumber(alloc);
        }
    }
}

impl Mergeable for Connection {
    type Key = (GateRef, ConnectionArrow, GateRef);

    fn key(&self) -> Self::Key {
        (self.src.clone(), self.arrow, self.dest.clone())
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        merge_option(old.channel.as_ref(), self.channel.as_mut(), alloc)
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        if let Some(channel) = &mut self.channel {
            channel.renumber(alloc);
        }
    }
}

impl Mergeable for TypeDecl {
    type Key = SmolStr;

    fn key(&self) -> SmolStr {
        self.name.clone()
    }

    fn adopt(&mut self, old: &Self, alloc: &mut NodeIdAlloc) -> bool {
        self.node = old.node;
        let mut changed =
            self.kind != old.kind || self.allow_unconnected != old.allow_unconnected;
        changed |= merge_list(&old.extends, &mut self.extends, alloc);
        changed |= merge_list(&old.interfaces, &mut self.interfaces, alloc);
        changed |= merge_list(&old.params, &mut self.params, alloc);
        changed |= merge_list(&old.gates, &mut self.gates, alloc);
        changed |= merge_list(&old.types, &mut self.types, alloc);
        changed |= merge_list(&old.submodules, &mut self.submodules, alloc);
        changed |= merge_list(&old.connections, &mut self.connections, alloc);
        changed |= merge_list(&old.properties, &mut self.properties, alloc);
        changed
    }

    fn renumber(&mut self, alloc: &mut NodeIdAlloc) {
        self.node = alloc.alloc();
        self.extends.iter_mut().for_each(|r| r.renumber(alloc));
        self.interfaces.iter_mut().for_each(|r| r.renumber(alloc));
        self.params.iter_mut().for_each(|p| p.renumber(alloc));
        self.gates.iter_mut().for_each(|g| g.renumber(alloc));
        self.types.iter_mut().for_each(|t| t.renumber(alloc));
        self.submodules.iter_mut().for_each(|s| s.renumber(alloc));
        self.connections.iter_mut().for_each(|c| c.renumber(alloc));
        self.properties.iter_mut().for_each(|p| p.renumber(alloc));
    }
}
