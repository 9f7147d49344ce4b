//! Runtime binder lookup.
//!
//! [`Resolver`] maps a target's runtime type to the nearest registered
//! binder up its hierarchy and runs it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::error::BindError;
use super::table::{BinderConstructor, BinderTable};
use super::target::{TargetRef, TypeInfo};
use super::unbinder::{NoopUnbinder, Unbinder};
use super::values::ValuesError;
use crate::naming;

/// Outcome of a binder lookup remembered for a runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEntry {
    /// Binder (of the type or its nearest bound ancestor) used for the type.
    Found(&'static str),
    /// The type has no binder anywhere up its hierarchy.
    NotFound,
}

#[derive(Clone, Copy)]
struct Resolved {
    binder: &'static str,
    constructor: BinderConstructor,
}

/// Finds and instantiates the binder for a target's runtime type.
///
/// Lookups walk the type's ancestors until a registered binder turns up, and
/// the outcome (including "nothing found") is cached per runtime type. The
/// cache lives as long as the resolver; clear it when the table it was
/// filled from goes away.
pub struct Resolver {
    table: BinderTable,
    cache: RefCell<HashMap<&'static str, Option<Resolved>>>,
}

impl Resolver {
    pub fn new(table: BinderTable) -> Self {
        Self {
            table,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Binds `target`, returning a handle that clears what was populated.
    ///
    /// Targets whose hierarchy has no binder get a [`NoopUnbinder`].
    pub fn bind(&self, target: &TargetRef) -> Result<Box<dyn Unbinder>, BindError> {
        let ty = target.borrow().runtime_type();
        tracing::debug!("Looking up binder for {}", ty.name());

        let Some(resolved) = self.find_constructor(ty) else {
            tracing::debug!("{} has no binder, nothing to bind", ty.name());
            return Ok(Box::new(NoopUnbinder));
        };

        let source = target.borrow().source();
        let result = match resolved.constructor {
            BinderConstructor::Source(constructor) => constructor(Rc::clone(target), &source),
            BinderConstructor::Context(constructor) => {
                constructor(Rc::clone(target), source.context())
            }
        };
        result.map_err(|err| translate(resolved.binder, err))
    }

    /// Like [`Resolver::bind`], but failures of the value registry are logged
    /// and turned into a [`NoopUnbinder`]. Every other failure propagates.
    pub fn try_bind(&self, target: &TargetRef) -> Result<Box<dyn Unbinder>, BindError> {
        match self.bind(target) {
            Err(err) if err.is_expected() => {
                let ty = target.borrow().runtime_type();
                tracing::warn!("Failed to bind {}: {}", ty.name(), err);
                Ok(Box::new(NoopUnbinder))
            }
            other => other,
        }
    }

    /// Cached lookup outcome for the runtime type named `type_name`.
    pub fn cache_entry(&self, type_name: &str) -> Option<CacheEntry> {
        self.cache.borrow().get(type_name).map(|cached| match cached {
            Some(resolved) => CacheEntry::Found(resolved.binder),
            None => CacheEntry::NotFound,
        })
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    fn find_constructor(&self, ty: &'static TypeInfo) -> Option<Resolved> {
        let cached = self.cache.borrow().get(ty.name()).copied();
        if let Some(cached) = cached {
            tracing::debug!("HIT: cached binder lookup for {}", ty.name());
            return cached;
        }

        let resolved = if naming::is_reserved(ty.name()) {
            tracing::debug!("MISS: reached reserved type {}, abandoning search", ty.name());
            None
        } else if let Some((binder, constructor)) = self.table.get(&naming::binder_name(ty.name())) {
            tracing::debug!("HIT: loaded binder {}", binder);
            Some(Resolved {
                binder,
                constructor,
            })
        } else {
            match ty.superclass() {
                Some(parent) => {
                    tracing::debug!("Not found. Trying parent {}", parent.name());
                    self.find_constructor(parent)
                }
                None => {
                    tracing::debug!("MISS: top of the hierarchy of {} has no binder", ty.name());
                    None
                }
            }
        };

        self.cache.borrow_mut().insert(ty.name(), resolved);
        resolved
    }
}

/// Maps a constructor failure onto the bind error taxonomy.
fn translate(binder: &'static str, err: anyhow::Error) -> BindError {
    match err.downcast::<BindError>() {
        Ok(err) => err,
        Err(err) => match err.downcast::<ValuesError>() {
            Ok(err) => BindError::Values(err),
            Err(err) => BindError::Construction {
                binder: binder.to_string(),
                source: err,
            },
        },
    }
}
