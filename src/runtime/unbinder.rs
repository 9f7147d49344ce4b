//! Handles that undo a bind.

use super::error::BindError;

/// Handle returned by a bind; releases every field the bind populated.
pub trait Unbinder {
    /// Clears the populated fields, most derived first. A second call fails
    /// with [`BindError::AlreadyUnbound`].
    fn unbind(&mut self) -> Result<(), BindError>;
}

/// Unbinder returned when nothing was bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUnbinder;

impl Unbinder for NoopUnbinder {
    fn unbind(&mut self) -> Result<(), BindError> {
        Ok(())
    }
}
