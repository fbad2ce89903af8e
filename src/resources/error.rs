//! Error types for resource operations.
//!
//! Only operational failures are errors. Problems in NED sources are
//! [`Diagnostic`](crate::hir::Diagnostic)s and never surface here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`NedResources`](super::NedResources) operations.
#[derive(Debug, Error)]
pub enum NedError {
    /// Reading a file or directory failed.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not loaded.
    #[error("file not loaded: {}", .0.display())]
    NotLoaded(PathBuf),

    /// `disconnect` without a matching `connect`.
    #[error("file has no connected editor: {}", .0.display())]
    NotConnected(PathBuf),

    /// The path is not a NED file of any project source folder.
    #[error("not a NED file: {}", .0.display())]
    NotNedFile(PathBuf),

    /// Disk contents may not replace a tree that an editor owns.
    #[error("cannot reload {} while an editor is connected", .0.display())]
    EditorConnected(PathBuf),

    /// The background validation thread could not be started.
    #[error("cannot start validation worker: {0}")]
    Worker(#[source] std::io::Error),

    /// Invalid project configuration.
    #[error("project configuration error: {0}")]
    Config(String),

    /// Several independent operations of one batch failed.
    #[error("{} operation(s) failed: {}", .0.len(), join_errors(.0))]
    Batch(Vec<NedError>),
}

impl NedError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// `Ok` for no errors, the error itself for one, a batch otherwise.
    pub fn from_batch(mut errors: Vec<NedError>) -> Result<(), NedError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Batch(errors)),
        }
    }
}

fn join_errors(errors: &[NedError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
