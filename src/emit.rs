//! Code emitter.
//!
//! Turns every [`BindingSet`] into the source of one binder type placed in
//! the owner's module. Output is built with `quote` and rendered with
//! `TokenStream::to_string`, so identical inputs always produce
//! byte-identical files.

use std::collections::BTreeMap;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde::Serialize;

use crate::graph::{BindingMap, BindingSet};
use crate::model::TypePath;
use crate::naming;

/// First line of every generated file.
pub const HEADER: &str = "// Generated code from extrabind. Do not modify!";

/// Shape decisions for one binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BinderShape {
    pub has_bindings: bool,
    pub has_parent: bool,
    /// Sealed owners get a crate-private binder nothing can chain to.
    pub is_final: bool,
    /// The primary constructor takes a `Source` instead of a `Context`.
    pub needs_source: bool,
    pub parent_needs_source: bool,
}

impl BinderShape {
    pub fn of(set: &BindingSet) -> Self {
        Self {
            has_bindings: set.has_bindings(),
            has_parent: set.has_parent(),
            is_final: set.is_final,
            needs_source: set.needs_source(),
            parent_needs_source: set.parent.as_ref().is_some_and(|p| p.needs_source()),
        }
    }

    /// Whether the binder clears fields of its own on unbind. Binders that
    /// do not only delegate to their parent.
    pub fn has_own_unbind(&self) -> bool {
        self.has_bindings || !self.has_parent
    }

    /// Whether a deprecated constructor accepting a `Source` is emitted
    /// next to a primary constructor taking a `Context`.
    pub fn has_source_delegate(&self) -> bool {
        !self.needs_source
    }
}

/// Emitted source for one binder.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedBinder {
    pub owner: String,
    pub binder: String,
    pub module: String,
    pub shape: BinderShape,
    pub code: String,
}

/// Emits the binder for `set`.
pub fn emit(set: &BindingSet) -> syn::Result<GeneratedBinder> {
    let shape = BinderShape::of(set);
    let items = [
        binder_struct(set, shape)?,
        binder_impl(set, shape)?,
        unbinder_impl(set, shape)?,
    ];
    let code = items
        .iter()
        .map(TokenStream::to_string)
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(GeneratedBinder {
        owner: set.owner_path.to_string(),
        binder: set.binder_path.to_string(),
        module: set.owner_path.module_path(),
        shape,
        code,
    })
}

/// Emits every binder of a graph, in owner declaration order.
pub fn emit_all(sets: &BindingMap) -> syn::Result<Vec<GeneratedBinder>> {
    sets.values().map(|set| emit(set)).collect()
}

/// Groups binders into one file per module, keyed by file name.
pub fn render_modules(binders: &[GeneratedBinder]) -> BTreeMap<String, String> {
    let mut by_module: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for binder in binders {
        by_module
            .entry(binder.module.as_str())
            .or_default()
            .push(binder.code.as_str());
    }

    by_module
        .into_iter()
        .map(|(module, codes)| {
            let file = module_file_name(module);
            let mut content = String::from(HEADER);
            for code in codes {
                content.push_str("\n\n");
                content.push_str(code);
            }
            content.push('\n');
            (file, content)
        })
        .collect()
}

/// File holding the binders of `module`.
pub fn module_file_name(module: &str) -> String {
    format!("{}.binders.rs", naming::module_file_stem(module))
}

/// Emits `register_binders`, which adds every binder to a table.
pub fn render_registrations(sets: &BindingMap) -> syn::Result<String> {
    let mut registrations = Vec::with_capacity(sets.len());
    for set in sets.values() {
        let path = path_tokens(&set.binder_path)?;
        let variant = if set.needs_source() {
            quote!(Source)
        } else {
            quote!(Context)
        };
        registrations.push(quote! {
            table.register(#path::NAME, ::extrabind::BinderConstructor::#variant(#path::construct));
        });
    }
    let table = if registrations.is_empty() {
        quote!(_table)
    } else {
        quote!(table)
    };

    let tokens = quote! {
        #[doc = "Registers every binder generated for this crate."]
        pub fn register_binders(#table: &mut ::extrabind::BinderTable) {
            #(#registrations)*
        }
    };
    Ok(format!("{}\n\n{}\n", HEADER, tokens))
}

fn path_tokens(path: &TypePath) -> syn::Result<syn::Path> {
    syn::parse_str(&path.crate_relative())
}

fn visibility(shape: BinderShape) -> TokenStream {
    if shape.is_final {
        quote!(pub(crate))
    } else {
        quote!(pub)
    }
}

fn binder_struct(set: &BindingSet, shape: BinderShape) -> syn::Result<TokenStream> {
    let vis = visibility(shape);
    let ident = format_ident!("{}", set.binder_path.ident());
    let doc = format!("Binder for [`{}`].", set.owner_path.ident());
    let parent = match &set.parent {
        Some(parent) => {
            let path = path_tokens(&parent.binder_path)?;
            quote!(parent: #path,)
        }
        None => quote!(),
    };
    let target = if shape.has_bindings {
        quote!(target: ::core::option::Option<::extrabind::TargetRef>,)
    } else {
        quote!()
    };

    Ok(quote! {
        #[doc = #doc]
        #vis struct #ident {
            #parent
            #target
        }
    })
}

fn binder_impl(set: &BindingSet, shape: BinderShape) -> syn::Result<TokenStream> {
    let vis = visibility(shape);
    let ident = format_ident!("{}", set.binder_path.ident());
    let binder_ident = set.binder_path.ident();

    let (input, input_ty) = if shape.needs_source {
        (quote!(source), quote!(::extrabind::Source))
    } else {
        (quote!(context), quote!(::extrabind::Context))
    };
    let unused = !shape.has_parent && !shape.has_bindings;
    let (target_param, input_param) = if unused {
        let input = format_ident!("_{}", input.to_string());
        (quote!(_target), quote!(#input))
    } else {
        (quote!(target), input.clone())
    };

    let parent_init = match &set.parent {
        Some(parent) => {
            let path = path_tokens(&parent.binder_path)?;
            let target_arg = if shape.has_bindings {
                quote!(::std::rc::Rc::clone(&target))
            } else {
                quote!(target)
            };
            let parent_input = if shape.parent_needs_source {
                quote!(source)
            } else if shape.needs_source {
                quote!(source.context())
            } else {
                quote!(context)
            };
            let binding = if shape.has_bindings {
                quote!(let mut parent)
            } else {
                quote!(let parent)
            };
            quote!(#binding = #path::new(#target_arg, #parent_input)?;)
        }
        None => quote!(),
    };

    // A failed lookup releases whatever the parent already populated.
    let bind_call = match (shape.has_bindings, shape.has_parent) {
        (true, true) => quote! {
            if let ::core::result::Result::Err(err) = Self::bind_fields(&target, source) {
                let _ = ::extrabind::Unbinder::unbind(&mut parent);
                return ::core::result::Result::Err(err);
            }
        },
        (true, false) => quote!(Self::bind_fields(&target, source)?;),
        (false, _) => quote!(),
    };
    let bind_fields = if shape.has_bindings {
        bind_fields_fn(set)?
    } else {
        quote!()
    };

    let parent_field = if shape.has_parent {
        quote!(parent,)
    } else {
        quote!()
    };
    let target_field = if shape.has_bindings {
        quote!(target: ::core::option::Option::Some(target),)
    } else {
        quote!()
    };

    let source_delegate = if shape.has_source_delegate() {
        quote! {
            #[deprecated(note = "construct from a `Context` with `new`")]
            #vis fn from_source(
                target: ::extrabind::TargetRef,
                source: &::extrabind::Source,
            ) -> ::core::result::Result<Self, ::extrabind::BindError> {
                Self::new(target, source.context())
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        impl #ident {
            #vis const NAME: &'static str = concat!(module_path!(), "::", #binder_ident);

            #vis fn new(
                #target_param: ::extrabind::TargetRef,
                #input_param: &#input_ty,
            ) -> ::core::result::Result<Self, ::extrabind::BindError> {
                #parent_init
                #bind_call
                ::core::result::Result::Ok(Self {
                    #parent_field
                    #target_field
                })
            }

            #source_delegate

            #bind_fields

            #vis fn construct(
                target: ::extrabind::TargetRef,
                #input: &#input_ty,
            ) -> ::extrabind::anyhow::Result<::std::boxed::Box<dyn ::extrabind::Unbinder>> {
                ::core::result::Result::Ok(::std::boxed::Box::new(Self::new(target, #input)?))
            }
        }
    })
}

/// Looks every value up before assigning any, so a failed lookup leaves the
/// owner's fields untouched.
fn bind_fields_fn(set: &BindingSet) -> syn::Result<TokenStream> {
    let owner = format_ident!("{}", set.owner_path.ident());
    let mut lookups = Vec::with_capacity(set.bindings.len());
    let mut assignments = Vec::with_capacity(set.bindings.len());
    for (index, binding) in set.bindings.iter().enumerate() {
        let member: syn::Member = syn::parse_str(&binding.name)?;
        let value_type: syn::Type = syn::parse_str(&binding.value_type)?;
        let key = &binding.key;
        let local = format_ident!("value_{}", index);
        lookups.push(quote! {
            let #local = ::extrabind::lookup::<#value_type>(values, caller, #key)?;
        });
        assignments.push(quote!(owner.#member = #local;));
    }

    Ok(quote! {
        fn bind_fields(
            target: &::extrabind::TargetRef,
            source: &::extrabind::Source,
        ) -> ::core::result::Result<(), ::extrabind::BindError> {
            let values = source.context().values();
            let mut guard = target.borrow_mut();
            let caller = ::extrabind::Target::caller_identity(&*guard);
            #(#lookups)*
            let owner = ::extrabind::owner_mut::<#owner>(&mut *guard)?;
            #(#assignments)*
            ::core::result::Result::Ok(())
        }
    })
}

fn unbinder_impl(set: &BindingSet, shape: BinderShape) -> syn::Result<TokenStream> {
    let ident = format_ident!("{}", set.binder_path.ident());
    let owner = format_ident!("{}", set.owner_path.ident());

    let delegate = if shape.has_parent {
        quote!(::extrabind::Unbinder::unbind(&mut self.parent))
    } else {
        quote!(::core::result::Result::Ok(()))
    };

    let body = if shape.has_bindings {
        let members = set
            .bindings
            .iter()
            .map(|binding| syn::parse_str::<syn::Member>(&binding.name))
            .collect::<syn::Result<Vec<_>>>()?;
        quote! {
            let target = self
                .target
                .as_ref()
                .ok_or(::extrabind::BindError::AlreadyUnbound { binder: Self::NAME })?;
            {
                let mut guard = target.borrow_mut();
                let owner = ::extrabind::owner_mut::<#owner>(&mut *guard)?;
                #(owner.#members = ::core::option::Option::None;)*
            }
            self.target = ::core::option::Option::None;
            #delegate
        }
    } else {
        delegate
    };

    Ok(quote! {
        impl ::extrabind::Unbinder for #ident {
            fn unbind(&mut self) -> ::core::result::Result<(), ::extrabind::BindError> {
                #body
            }
        }
    })
}
