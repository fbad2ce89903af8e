//! Diagnostics: semantic error reporting.
//!
//! Every diagnostic targets a node by [`NodeId`] so that it can follow the
//! node across re-parses: after a structural merge, [`DiagnosticStore::remap`]
//! refreshes spans of surviving nodes and drops diagnostics whose node is
//! gone.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::base::{FileId, NodeId, Span};
use crate::parser::{NedFile, Severity, SyntaxError};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Syntax,
    DuplicateDefinition,
    UnresolvedReference,
    Consistency,
}

/// A diagnostic message attached to a file and (usually) a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: &'static str,
    pub message: Arc<str>,
    pub file: FileId,
    /// Target node; `None` for file-level problems.
    pub node: Option<NodeId>,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        code: &'static str,
        file: FileId,
        node: Option<NodeId>,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            code,
            message: message.into(),
            file,
            node,
            span: Span::default(),
        }
    }

    pub fn from_syntax(file: FileId, error: &SyntaxError) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            code: codes::SYNTAX_ERROR,
            message: Arc::from(error.message.as_str()),
            file,
            node: None,
            span: error.span,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes.
///
/// ## Error Code Ranges
///
/// - **E0001-E0099**: semantic errors
/// - **W0001-W0099**: warnings
pub mod codes {
    /// Syntax error reported by the parser.
    pub const SYNTAX_ERROR: &str = "E0000";
    /// Undefined reference (name not found).
    pub const UNDEFINED_REFERENCE: &str = "E0001";
    /// Referenced type has the wrong kind.
    pub const TYPE_MISMATCH: &str = "E0003";
    /// Duplicate definition.
    pub const DUPLICATE_DEFINITION: &str = "E0004";
    /// Missing member required by an interface.
    pub const MISSING_REQUIRED: &str = "E0005";
    /// Invalid `extends` relationship.
    pub const INVALID_SPECIALIZATION: &str = "E0006";
    /// Cycle in the inheritance chain.
    pub const CIRCULAR_DEPENDENCY: &str = "E0007";
    /// Redeclared member.
    pub const INVALID_REDEFINITION: &str = "E0009";
    /// Reference to a member that does not exist.
    pub const UNKNOWN_MEMBER: &str = "E0015";
    /// Invalid connection.
    pub const INVALID_CONNECTION: &str = "E0016";
    /// Declared package differs from the folder layout.
    pub const PACKAGE_MISMATCH: &str = "W0004";
}

// ============================================================================
// DIAGNOSTIC STORE
// ============================================================================

/// Published semantic diagnostics, per file.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticStore {
    by_file: BTreeMap<FileId, Vec<Diagnostic>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics of a file; returns whether they changed.
    pub fn replace(&mut self, file: FileId, diagnostics: Vec<Diagnostic>) -> bool {
        if diagnostics.is_empty() {
            return self.by_file.remove(&file).is_some();
        }
        match self.by_file.insert(file, diagnostics.clone()) {
            Some(previous) => previous != diagnostics,
            None => true,
        }
    }

    pub fn remove(&mut self, file: FileId) -> bool {
        self.by_file.remove(&file).is_some()
    }

    pub fn get(&self, file: FileId) -> &[Diagnostic] {
        self.by_file.get(&file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Follow nodes of a merged tree; returns whether anything changed.
    pub fn remap(&mut self, file: FileId, tree: &NedFile) -> bool {
        let Some(diagnostics) = self.by_file.get_mut(&file) else {
            return false;
        };
        let before = diagnostics.clone();
        diagnostics.retain_mut(|d| match d.node {
            Some(node) => match tree.find_span(node) {
                Some(span) => {
                    d.span = span;
                    true
                }
                None => false,
            },
            None => true,
        });
        let changed = *diagnostics != before;
        if diagnostics.is_empty() {
            self.by_file.remove(&file);
        }
        changed
    }

    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.by_file.keys().copied()
    }

    pub fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        self.by_file.values().flatten()
    }

    pub fn error_count(&self) -> usize {
        self.all().filter(|d| d.is_error()).count()
    }

    pub fn clear(&mut self) {
        self.by_file.clear();
    }
}
