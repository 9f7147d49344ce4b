//! Application error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::GraphError;
use crate::scan::Diagnostic;

/// Errors of a generation pass.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("Failed to emit binders: {0}")]
    Emit(#[source] syn::Error),

    #[error("Binding graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("{} element(s) failed validation", .0.len())]
    Validation(Vec<Diagnostic>),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}
