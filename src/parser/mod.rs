//! Error-recovering parser for NED
//!
//! This module provides the syntax layer of the engine:
//! - **logos** for fast lexing
//! - a hand-written recursive descent parser producing an owned [`NedFile`]
//! - a structural merge that carries node identity across re-parses
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → Tokens with TokenKind
//!     ↓
//! Parser → NedFile + Vec<SyntaxError>
//!     ↓
//! merge(old, new) → NedFile with stable NodeIds
//!     ↓
//! HIR → type definitions, lookup, validation
//! ```

#[allow(clippy::module_inception)]
mod parser;

pub mod ast;
pub mod diff;
mod errors;
mod lexer;

pub use ast::*;
pub use diff::{Merge, merge, structurally_equal};
pub use errors::{Severity, SyntaxError};
pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parser::{Parse, parse};
