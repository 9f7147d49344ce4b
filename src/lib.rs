//! extrabind - binders that populate fields from caller-supplied values.
//!
//! Fields marked `#[extra]` on `#[derive(Target)]` structs are filled from a
//! [`ValueRegistry`] by generated binder types. The build side
//! ([`generate`]) scans a crate's sources, validates marked fields and emits
//! one binder per owner type; the runtime side ([`Resolver`]) finds the
//! binder for an instance's runtime type and runs it.

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod generate;
pub mod graph;
pub mod model;
pub mod naming;
pub mod runtime;
pub mod scan;

pub use runtime::{
    lookup, owner_mut, BindError, BinderConstructor, BinderTable, CacheEntry, CallerId, Context,
    ContextConstructor, ExtrasStore, NoopUnbinder, Resolver, Source, SourceConstructor, Target,
    TargetRef, TypeInfo, Typed, Unbinder, ValueRegistry, ValuesError,
};

// The derive lives in the macro namespace next to the trait.
pub use bind_macros::Target;

// Generated binders name anyhow through this path.
pub use anyhow;
