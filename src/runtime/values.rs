//! Value registry seen by binders, and the in-memory [`ExtrasStore`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::error::BindError;
use super::target::CallerId;

/// Failures of the value registry. These make up the expected family.
#[derive(Error, Debug)]
pub enum ValuesError {
    #[error("no values were registered by caller {0}")]
    UnknownCaller(CallerId),

    #[error("value registry unavailable: {0}")]
    Unavailable(String),
}

/// Keyed values supplied by callers, looked up by caller identity.
pub trait ValueRegistry {
    /// Value stored under `key` by `caller`. `Ok(None)` means the caller
    /// is known but supplied nothing for `key`.
    fn lookup(&self, caller: CallerId, key: &str) -> Result<Option<Rc<dyn Any>>, ValuesError>;
}

/// The environment a binder reads values from.
#[derive(Clone)]
pub struct Context {
    values: Rc<dyn ValueRegistry>,
}

impl Context {
    pub fn new(values: Rc<dyn ValueRegistry>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &dyn ValueRegistry {
        self.values.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

/// Handle from which a [`Context`] can be obtained, the richer of the two
/// constructor inputs.
#[derive(Debug, Clone)]
pub struct Source {
    context: Context,
}

impl Source {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Reads `key` for `caller` and clones it out as `T`.
pub fn lookup<T: Clone + 'static>(
    values: &dyn ValueRegistry,
    caller: CallerId,
    key: &str,
) -> Result<Option<T>, BindError> {
    let Some(value) = values.lookup(caller, key)? else {
        return Ok(None);
    };
    value
        .downcast_ref::<T>()
        .cloned()
        .map(Some)
        .ok_or_else(|| BindError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// In-memory [`ValueRegistry`].
///
/// Callers are unknown until they store a value; looking up an unknown
/// caller fails with [`ValuesError::UnknownCaller`].
#[derive(Default)]
pub struct ExtrasStore {
    callers: RefCell<HashMap<CallerId, HashMap<String, Rc<dyn Any>>>>,
}

impl ExtrasStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` for `caller`, replacing any earlier value.
    pub fn put<T: Any>(&self, caller: CallerId, key: impl Into<String>, value: T) {
        self.callers
            .borrow_mut()
            .entry(caller)
            .or_default()
            .insert(key.into(), Rc::new(value));
    }

    /// Registers `caller` without values.
    pub fn register(&self, caller: CallerId) {
        self.callers.borrow_mut().entry(caller).or_default();
    }

    /// Forgets everything `caller` stored.
    pub fn remove_caller(&self, caller: CallerId) -> bool {
        self.callers.borrow_mut().remove(&caller).is_some()
    }
}

impl ValueRegistry for ExtrasStore {
    fn lookup(&self, caller: CallerId, key: &str) -> Result<Option<Rc<dyn Any>>, ValuesError> {
        let callers = self.callers.borrow();
        let values = callers
            .get(&caller)
            .ok_or(ValuesError::UnknownCaller(caller))?;
        Ok(values.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_clones_typed_value() {
        let store = ExtrasStore::new();
        store.put(CallerId(1), "label", String::from("hello"));

        let value: Option<String> = lookup(&store, CallerId(1), "label").unwrap();
        assert_eq!(value.as_deref(), Some("hello"));

        let missing: Option<String> = lookup(&store, CallerId(1), "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_unknown_caller_is_an_expected_error() {
        let store = ExtrasStore::new();
        let err = lookup::<String>(&store, CallerId(9), "label").unwrap_err();
        assert!(matches!(err, BindError::Values(ValuesError::UnknownCaller(CallerId(9)))));
        assert!(err.is_expected());
    }

    #[test]
    fn test_wrong_type_is_a_mismatch() {
        let store = ExtrasStore::new();
        store.put(CallerId(1), "count", 3_u32);

        let err = lookup::<String>(&store, CallerId(1), "count").unwrap_err();
        match err {
            BindError::TypeMismatch { key, expected } => {
                assert_eq!(key, "count");
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remove_caller() {
        let store = ExtrasStore::new();
        store.register(CallerId(2));
        assert!(store.lookup(CallerId(2), "x").unwrap().is_none());
        assert!(store.remove_caller(CallerId(2)));
        assert!(store.lookup(CallerId(2), "x").is_err());
    }
}
