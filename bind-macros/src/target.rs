//! Implementation of #[derive(Target)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::{quote, ToTokens};
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Error, Member, Type};

pub fn derive_target_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Fields playing a role in the hierarchy.
#[derive(Default)]
struct Roles {
    parent: Option<(Member, Type)>,
    caller: Option<Member>,
    source: Option<Member>,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => return Err(Error::new_spanned(input, "Target can only be derived for structs")),
    };

    check_struct_options(input)?;
    let roles = parse_roles(fields)?;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!('static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let superclass = match &roles.parent {
        Some((_, ty)) => {
            if let Some(param) = mentioned_param(input, ty) {
                return Err(Error::new_spanned(
                    ty,
                    format!("parent type cannot use the type parameter `{}`", param),
                ));
            }
            quote! {
                ::core::option::Option::Some(
                    <#ty as ::extrabind::Typed>::type_info as fn() -> &'static ::extrabind::TypeInfo
                )
            }
        }
        None => quote!(::core::option::Option::None),
    };

    let ancestor = match &roles.parent {
        Some((member, _)) => quote!(::extrabind::Target::ancestor_mut(&mut self.#member, ty)),
        None => quote!(::core::option::Option::None),
    };

    let parent = roles.parent.as_ref().map(|(member, _)| member);
    let caller = match (&roles.caller, parent) {
        (Some(member), _) => quote!(self.#member),
        (None, Some(parent)) => quote!(::extrabind::Target::caller_identity(&self.#parent)),
        (None, None) => return Err(missing_role(name, "caller")),
    };
    let source = match (&roles.source, parent) {
        (Some(member), _) => quote!(::core::clone::Clone::clone(&self.#member)),
        (None, Some(parent)) => quote!(::extrabind::Target::source(&self.#parent)),
        (None, None) => return Err(missing_role(name, "source")),
    };

    Ok(quote! {
        impl #impl_generics ::extrabind::Typed for #name #ty_generics #where_clause {
            fn type_info() -> &'static ::extrabind::TypeInfo {
                static INFO: ::extrabind::TypeInfo = ::extrabind::TypeInfo::new(
                    concat!(module_path!(), "::", #name_str),
                    #superclass,
                );
                &INFO
            }
        }

        impl #impl_generics ::extrabind::Target for #name #ty_generics #where_clause {
            fn runtime_type(&self) -> &'static ::extrabind::TypeInfo {
                <Self as ::extrabind::Typed>::type_info()
            }

            fn ancestor_mut(
                &mut self,
                ty: &'static ::extrabind::TypeInfo,
            ) -> ::core::option::Option<&mut dyn ::core::any::Any> {
                if ty.name() == <Self as ::extrabind::Typed>::type_info().name() {
                    return ::core::option::Option::Some(self as &mut dyn ::core::any::Any);
                }
                #ancestor
            }

            fn caller_identity(&self) -> ::extrabind::CallerId {
                #caller
            }

            fn source(&self) -> ::extrabind::Source {
                #source
            }
        }
    })
}

fn missing_role(name: &syn::Ident, role: &str) -> Error {
    Error::new_spanned(
        name,
        format!(
            "Target needs a #[target({})] field or a #[target(parent)] field",
            role
        ),
    )
}

fn check_struct_options(input: &DeriveInput) -> syn::Result<()> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("target")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("sealed") {
                Ok(())
            } else {
                Err(meta.error("expected `sealed`"))
            }
        })?;
    }
    Ok(())
}

fn parse_roles(fields: &syn::Fields) -> syn::Result<Roles> {
    let mut roles = Roles::default();
    for (index, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("target")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("parent") {
                    if roles.parent.is_some() {
                        return Err(meta.error("only one field can be the parent"));
                    }
                    roles.parent = Some((member.clone(), field.ty.clone()));
                } else if meta.path.is_ident("caller") {
                    if roles.caller.is_some() {
                        return Err(meta.error("only one field can be the caller"));
                    }
                    roles.caller = Some(member.clone());
                } else if meta.path.is_ident("source") {
                    if roles.source.is_some() {
                        return Err(meta.error("only one field can be the source"));
                    }
                    roles.source = Some(member.clone());
                } else {
                    return Err(meta.error("expected `parent`, `caller` or `source`"));
                }
                Ok(())
            })?;
        }
    }
    Ok(roles)
}

/// First type parameter of `input` that appears in `ty`.
fn mentioned_param(input: &DeriveInput, ty: &Type) -> Option<String> {
    let params: Vec<String> = input
        .generics
        .type_params()
        .map(|p| p.ident.to_string())
        .collect();
    if params.is_empty() {
        return None;
    }
    find_ident(ty.to_token_stream(), &params)
}

fn find_ident(tokens: TokenStream2, names: &[String]) -> Option<String> {
    tokens.into_iter().find_map(|tree| match tree {
        TokenTree::Ident(ident) => {
            let ident = ident.to_string();
            names.contains(&ident).then_some(ident)
        }
        TokenTree::Group(group) => find_ident(group.stream(), names),
        _ => None,
    })
}
