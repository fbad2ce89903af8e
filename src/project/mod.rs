//! Projects and the file system.
//!
//! - [`ProjectConfig`] and [`ProjectConfigProvider`] describe which projects
//!   exist and where their NED sources live
//! - [`NedFoldersProvider`] reads source folders from `.nedfolders` files
//! - [`WorkspaceChange`] feeds file-system deltas into the engine

mod config;
pub(crate) mod loader;
mod workspace_sync;

pub use config::{
    NedFoldersProvider, ProjectConfig, ProjectConfigProvider, ProjectDescription, StaticProjects,
    parse_nedfolders,
};
pub use workspace_sync::WorkspaceChange;
