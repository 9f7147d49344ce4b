//! Registry of generated binder constructors, keyed by binder name.

use std::collections::HashMap;
use std::fmt;

use super::target::TargetRef;
use super::unbinder::Unbinder;
use super::values::{Context, Source};

/// Constructor of a binder taking a [`Source`].
pub type SourceConstructor = fn(TargetRef, &Source) -> anyhow::Result<Box<dyn Unbinder>>;

/// Constructor of a binder taking a [`Context`].
pub type ContextConstructor = fn(TargetRef, &Context) -> anyhow::Result<Box<dyn Unbinder>>;

/// Primary constructor of a registered binder, tagged by the input it takes.
#[derive(Clone, Copy)]
pub enum BinderConstructor {
    Source(SourceConstructor),
    Context(ContextConstructor),
}

impl fmt::Debug for BinderConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinderConstructor::Source(_) => f.write_str("BinderConstructor::Source"),
            BinderConstructor::Context(_) => f.write_str("BinderConstructor::Context"),
        }
    }
}

/// Binder constructors by qualified binder name.
///
/// Generated code fills the table through `register_binders`; hosts may
/// register hand-written binders the same way.
#[derive(Debug, Default)]
pub struct BinderTable {
    constructors: HashMap<&'static str, BinderConstructor>,
}

impl BinderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `binder`, replacing an earlier entry.
    pub fn register(&mut self, binder: &'static str, constructor: BinderConstructor) -> &mut Self {
        if self.constructors.insert(binder, constructor).is_some() {
            tracing::debug!("Replacing registered binder {}", binder);
        }
        self
    }

    /// Registered name and constructor for `binder`.
    pub fn get(&self, binder: &str) -> Option<(&'static str, BinderConstructor)> {
        self.constructors
            .get_key_value(binder)
            .map(|(name, constructor)| (*name, *constructor))
    }
}
