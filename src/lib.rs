//! # ned-base
//!
//! Incremental type resolution and consistency validation for NED source
//! trees.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project   → Project configuration, `.nedfolders`, workspace sync
//!   ↓
//! resources → NedResources: loaded files, rehash, events, validation worker
//!   ↓
//! hir       → Type definitions, project tables, lookup, validation rules
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, tree merge
//!   ↓
//! base      → Primitives (FileId, NodeId, TextRange, constants)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → hir → resources → project)
// ============================================================================

/// Foundation types: FileId, NodeId, TextRange, constants
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, structural merge
pub mod parser;

/// Semantic layer: definitions, symbol tables, lookup, diagnostics
pub mod hir;

/// Engine context: NedResources and its change tracking
pub mod resources;

/// Project configuration and workspace synchronization
pub mod project;

// Re-export the engine surface
pub use hir::{Diagnostic, DiagnosticKind, LookupContext, TypeDefinition};
pub use project::{ProjectConfig, ProjectConfigProvider, StaticProjects, WorkspaceChange};
pub use resources::{ChangeEvent, NedError, NedResources, ResourcesConfig};

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, NodeId, Position, ProjectId, Span, TextRange, TextSize};
