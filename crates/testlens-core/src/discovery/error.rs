//! Discovery error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while walking a project for tests.
///
/// Scanning file content never fails; only filesystem access does.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The discovery root could not be read.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory walker failed.
    #[error("Walk error: {0}")]
    Walk(String),
}

impl DiscoveryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ignore::Error> for DiscoveryError {
    fn from(err: ignore::Error) -> Self {
        DiscoveryError::Walk(err.to_string())
    }
}
