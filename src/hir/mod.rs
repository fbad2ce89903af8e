//! High-level IR (HIR): the semantic model of NED sources.
//!
//! Everything here is pure data and pure queries; locking, notification and
//! scheduling live in [`crate::resources`].
//!
//! ## Key Types
//!
//! - [`TypeDefinition`] - a top-level or inner NED type
//! - [`DefIndex`] - arena of definitions keyed by [`TypeKey`](crate::base::TypeKey)
//! - [`ProjectTable`] - per-project `components` / `duplicates` / reserved names
//! - [`Resolver`] - memoized name lookup and inheritance queries
//! - [`Diagnostic`] - semantic problems, targeted at node ids
//!
//! ## Layers
//!
//! ```text
//! NedFile (parser)
//!     │
//!     ▼
//! DefIndex::set_file        ← definitions per file
//!     │
//!     ▼
//! ProjectTable::register    ← rehash, per project
//!     │
//!     ▼
//! Resolver::lookup          ← name resolution (cached)
//!     │
//!     ▼
//! validate_file             ← consistency diagnostics
//! ```

mod diagnostics;
mod imports;
mod index;
mod lookup;
mod table;
mod types;
mod validator;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticStore, codes};
pub use imports::ImportPattern;
pub use index::{DefIndex, FileScope};
pub use lookup::{LookupCache, LookupContext, Resolver};
pub use table::ProjectTable;
pub use types::{InheritedGate, InheritedMembers, InheritedParam, TypeDefinition};
pub use validator::{duplicate_diagnostics, validate_file};
