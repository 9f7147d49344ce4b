//! Runtime half of extrabind.
//!
//! Hosts describe their target hierarchy with [`Typed`] and [`Target`]
//! (usually through `#[derive(Target)]`), register generated binders in a
//! [`BinderTable`] and ask a [`Resolver`] to bind instances.

mod error;
mod resolver;
mod table;
mod target;
mod unbinder;
mod values;

pub use error::BindError;
pub use resolver::{CacheEntry, Resolver};
pub use table::{BinderConstructor, BinderTable, ContextConstructor, SourceConstructor};
pub use target::{owner_mut, CallerId, Target, TargetRef, TypeInfo, Typed};
pub use unbinder::{NoopUnbinder, Unbinder};
pub use values::{lookup, Context, ExtrasStore, Source, ValueRegistry, ValuesError};
