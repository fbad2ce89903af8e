//! Arena identities.
//!
//! Files, tree nodes and types never point at each other directly; they refer
//! to one another through these small copyable keys, resolved through the
//! owning store.

use std::fmt;

use smol_str::SmolStr;

/// Identity of a source file inside the engine.
///
/// Ids are allocated per path and never reused, even after the file is
/// forgotten, so a stale id can never alias a different file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

impl FileId {
    /// The pseudo-file holding the built-in declarations.
    pub const BUILTIN: FileId = FileId(u32::MAX);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    pub fn is_builtin(self) -> bool {
        self == Self::BUILTIN
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            f.write_str("file#builtin")
        } else {
            write!(f, "file#{}", self.0)
        }
    }
}

/// Identity of a node inside one file's tree.
///
/// Node ids survive re-parses for every subtree the structural merge keeps,
/// which is what lets diagnostics follow their nodes across edits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a type definition: the declaring file plus the declaring node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    pub file: FileId,
    pub node: NodeId,
}

impl TypeKey {
    pub const fn new(file: FileId, node: NodeId) -> Self {
        Self { file, node }
    }

    pub fn is_builtin(&self) -> bool {
        self.file.is_builtin()
    }
}

/// Name of a project (a workspace compilation unit).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(SmolStr);

impl ProjectId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProjectId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
