//! Foundation types for the NED engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`], [`NodeId`], [`TypeKey`] - Arena identities for files, tree nodes and types
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Line/column positions for tree nodes
//! - Domain constants (file names, built-in declarations)
//!
//! This module has NO dependencies on other crate modules.

pub mod constants;
mod file_id;
mod position;
mod span;

pub use file_id::{FileId, NodeId, ProjectId, TypeKey};
pub use position::{Position, Span};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
