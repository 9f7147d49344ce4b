//! Errors raised while binding or unbinding a target.

use thiserror::Error;

use super::values::ValuesError;

/// Errors raised while constructing or releasing binders.
#[derive(Error, Debug)]
pub enum BindError {
    /// The value registry refused the lookup. This is the expected failure
    /// family that [`Resolver::try_bind`](super::Resolver::try_bind) absorbs.
    #[error(transparent)]
    Values(#[from] ValuesError),

    #[error("value for key `{key}` is not a `{expected}`")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("`{target}` is not a `{owner}`")]
    NotAnAncestor {
        owner: &'static str,
        target: &'static str,
    },

    #[error("Bindings already cleared by {binder}")]
    AlreadyUnbound { binder: &'static str },

    #[error("Unable to create binder {binder}")]
    Construction {
        binder: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BindError {
    /// Whether this failure belongs to the expected family.
    pub fn is_expected(&self) -> bool {
        matches!(self, BindError::Values(_))
    }
}
