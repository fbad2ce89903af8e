//! Engine tests
//!
//! Tests for `NedResources` over an in-memory file system:
//! - Name lookup, imports and the lookup cache
//! - Project tables, duplicates and rehash
//! - Editor connections and text edits
//! - Change events and bracketing
//! - Validation and published diagnostics
//! - Properties and position queries

pub mod tests_editors;
pub mod tests_events;
pub mod tests_properties;
pub mod tests_symbol_tables;
pub mod tests_validation;
