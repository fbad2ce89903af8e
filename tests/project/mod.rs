//! Project configuration and workspace synchronization tests

pub mod tests_real_fs;
pub mod tests_workspace_sync;
