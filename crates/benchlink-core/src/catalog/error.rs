//! Error types for catalog loading

use thiserror::Error;

/// Errors that can occur while loading the command catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read command catalog '{path}': {message}")]
    Io {
        /// Catalog file path
        path: String,
        /// Underlying I/O error
        message: String,
    },

    #[error("malformed command catalog '{path}': {message}")]
    Parse {
        /// Catalog file path
        path: String,
        /// Underlying JSON error
        message: String,
    },
}
