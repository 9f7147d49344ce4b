//! Derive macro for extrabind targets.
//!
//! `#[derive(Target)]` implements `extrabind::Typed` and `extrabind::Target`
//! for a struct. Generated code references `::extrabind`, so the consuming
//! crate must depend on it under that name.

use proc_macro::TokenStream;

mod target;

/// Derive macro describing a binding target.
///
/// # Field options
///
/// - `#[target(parent)]` marks the embedded parent target. The struct then
///   extends the parent: binders of the parent reach their fields through it.
/// - `#[target(caller)]` marks the `CallerId` field.
/// - `#[target(source)]` marks the `Source` field.
///
/// A struct with a parent may omit `caller` and `source`; both are then read
/// from the parent. `#[extra]` marks fields populated by generated binders and
/// is ignored by this derive.
///
/// # Struct options
///
/// - `#[target(sealed)]` declares that no other target extends this one.
///
/// # Example
///
/// ```ignore
/// use extrabind::{CallerId, Source, Target};
///
/// #[derive(Target)]
/// pub struct Base {
///     #[target(caller)]
///     pub caller: CallerId,
///     #[target(source)]
///     pub source: Source,
///     #[extra]
///     pub id: Option<String>,
/// }
///
/// #[derive(Target)]
/// pub struct Detail {
///     #[target(parent)]
///     pub base: Base,
///     #[extra("label")]
///     pub name: Option<String>,
/// }
/// ```
#[proc_macro_derive(Target, attributes(target, extra))]
pub fn derive_target(input: TokenStream) -> TokenStream {
    target::derive_target_impl(input)
}
