//! Naming convention shared by the code emitter and the runtime resolver.
//!
//! A binder for owner `app::model::Detail` is named `app::model::DetailBinder`
//! and lives in the owner's module. This rule is the only coupling between
//! generated code and [`Resolver`](crate::runtime::Resolver) lookups.

/// Literal suffix appended to an owner's name to form its binder's name.
pub const BINDER_SUFFIX: &str = "Binder";

/// Namespaces owned by the platform or by extrabind itself.
///
/// Types under these prefixes never carry bindings and are never searched.
pub const RESERVED_PREFIXES: &[&str] = &["std::", "core::", "alloc::", "extrabind::"];

/// Qualified binder name for a qualified owner name.
pub fn binder_name(owner: &str) -> String {
    format!("{}{}", owner, BINDER_SUFFIX)
}

/// Binder identifier for an owner identifier (`Detail` -> `DetailBinder`).
pub fn binder_ident(owner_ident: &str) -> String {
    format!("{}{}", owner_ident, BINDER_SUFFIX)
}

/// True if the qualified name lies under a reserved namespace.
pub fn is_reserved(qualified_name: &str) -> bool {
    RESERVED_PREFIXES
        .iter()
        .any(|prefix| qualified_name.starts_with(prefix))
}

/// Flattens a module path into a file stem (`app::model` -> `app__model`).
pub fn module_file_stem(module_path: &str) -> String {
    module_path.replace("::", "__")
}
