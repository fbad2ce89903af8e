//! The engine context and its supporting pieces.
//!
//! [`NedResources`] is the only entry point most callers need. The other
//! modules here are its building blocks:
//!
//! - `source_store`: loaded files, their text, trees and editor counts
//! - `registry`: projects, source folders and per-project symbol tables
//! - `invalidator`: change serial, dirty flag and the lookup cache
//! - `notify`: change events and listener registration
//! - `validation`: the debounced background validation worker
//! - `fs`: the file-system seam ([`RealFs`], [`MemoryFs`])

mod config;
mod error;
mod fs;
mod host;
mod invalidator;
mod notify;
mod registry;
mod source_store;
mod state;
mod validation;

pub use config::{DEFAULT_VALIDATION_DELAY, ResourcesConfig};
pub use error::NedError;
pub use fs::{FileSystem, MemoryFs, RealFs};
pub use host::NedResources;
pub(crate) use host::Inner;
pub use notify::{ChangeEvent, ChangeListener, ListenerId};
pub use registry::{ProjectData, ProjectRegistry};
pub use source_store::SourceFile;
