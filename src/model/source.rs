//! Rust source frontend.
//!
//! Walks `syn` syntax trees and records every struct, enum and union as a
//! [`TypeDecl`] and every field or `static` carrying `#[extra]` as a
//! [`FieldDecl`]. Parent types come from the field marked
//! `#[target(parent)]`, resolved through the module's `use` declarations.

use std::collections::HashMap;
use std::path::Path;

use quote::ToTokens;
use syn::{Attribute, Expr, ExprLit, Fields, GenericArgument, Item, Lit, LitStr, Meta, PathArguments};

use super::{
    Enclosing, FieldDecl, FieldType, Marker, Program, TypeDecl, TypeKind, TypeParam, TypePath,
    TypeRef, Visibility,
};

/// Field and static marker attribute.
pub const MARKER_ATTR: &str = "extra";

/// Hierarchy attribute shared with `#[derive(Target)]`.
pub const TARGET_ATTR: &str = "target";

/// `use` aliases visible in one module: local name -> absolute segments.
type Imports = HashMap<String, Vec<String>>;

/// Parses `source` as the module `module` and adds its elements to `program`.
///
/// Only a file that is not valid Rust fails; unreadable attributes are
/// recorded on the program and the affected element is skipped.
pub fn parse_source(program: &mut Program, module: &[String], source: &str) -> syn::Result<()> {
    let file = syn::parse_file(source)?;
    load_file(program, module, &file);
    Ok(())
}

/// Adds every element of an already parsed file to `program`.
pub fn load_file(program: &mut Program, module: &[String], file: &syn::File) {
    load_items(program, module, &file.items);
}

/// Module path of a source file relative to the crate's source root.
///
/// `lib.rs` and `main.rs` are the crate root, `a/mod.rs` is `a`, `a/b.rs` is
/// `a::b`. Files under `bin/` belong to other crates and yield `None`.
pub fn module_path_for(crate_name: &str, root: &Path, file: &Path) -> Option<Vec<String>> {
    let relative = file.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = relative
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect();

    if segments.first().map(String::as_str) == Some("bin") {
        return None;
    }

    let file_name = segments.pop()?;
    let stem = file_name.strip_suffix(".rs")?;
    let is_root_file = segments.is_empty() && (stem == "lib" || stem == "main");
    if !is_root_file && stem != "mod" {
        segments.push(stem.to_string());
    }

    let mut module = vec![crate_name.replace('-', "_")];
    module.extend(segments);
    Some(module)
}

fn load_items(program: &mut Program, module: &[String], items: &[Item]) {
    let imports = collect_imports(module, items);

    for item in items {
        match item {
            Item::Struct(item) => load_struct(program, module, &imports, item),
            Item::Enum(item) => load_enum(program, module, item),
            Item::Union(item) => load_union(program, module, item),
            Item::Static(item) => load_static(program, module, item),
            Item::Mod(item) => {
                if let Some((_, content)) = &item.content {
                    let mut child = module.to_vec();
                    child.push(item.ident.to_string());
                    load_items(program, &child, content);
                }
            }
            _ => {}
        }
    }
}

fn load_struct(
    program: &mut Program,
    module: &[String],
    imports: &Imports,
    item: &syn::ItemStruct,
) {
    let path = type_path(module, &item.ident);

    let mut parent = None;
    for (index, field) in item.fields.iter().enumerate() {
        // A parent that cannot be read leaves the type as a root.
        let resolved = target_flags(&field.attrs).and_then(|flags| {
            if flags.iter().any(|f| f == "parent") {
                resolve_type(module, imports, &field.ty).map(Some)
            } else {
                Ok(None)
            }
        });
        match resolved {
            Ok(Some(resolved)) => parent = Some(resolved),
            Ok(None) => {}
            Err(err) => {
                let element = format!("{}.{}", path, field_name(field, index));
                program.add_malformed(element, err);
            }
        }
    }

    let sealed = match target_flags(&item.attrs) {
        Ok(flags) => flags.iter().any(|f| f == "sealed"),
        Err(err) => {
            program.add_malformed(path.to_string(), err);
            false
        }
    };

    let params = type_params(&item.generics);
    let decl = TypeDecl {
        path,
        kind: TypeKind::Struct,
        visibility: visibility(&item.vis),
        sealed,
        parent,
        params: params.clone(),
    };
    let id = program.add_type(decl);

    load_fields(program, Enclosing::Type(id), &item.fields, &params, None);
}

fn load_enum(program: &mut Program, module: &[String], item: &syn::ItemEnum) {
    let params = type_params(&item.generics);
    let enum_visibility = visibility(&item.vis);
    let decl = TypeDecl {
        path: type_path(module, &item.ident),
        kind: TypeKind::Enum,
        visibility: enum_visibility,
        sealed: false,
        parent: None,
        params: params.clone(),
    };
    let id = program.add_type(decl);

    // Variant fields are as visible as the enum itself.
    for variant in &item.variants {
        load_fields(
            program,
            Enclosing::Type(id),
            &variant.fields,
            &params,
            Some(enum_visibility),
        );
    }
}

fn load_union(program: &mut Program, module: &[String], item: &syn::ItemUnion) {
    let params = type_params(&item.generics);
    let decl = TypeDecl {
        path: type_path(module, &item.ident),
        kind: TypeKind::Union,
        visibility: visibility(&item.vis),
        sealed: false,
        parent: None,
        params: params.clone(),
    };
    let id = program.add_type(decl);

    let fields = Fields::Named(item.fields.clone());
    load_fields(program, Enclosing::Type(id), &fields, &params, None);
}

fn load_static(program: &mut Program, module: &[String], item: &syn::ItemStatic) {
    let module = module.join("::");
    match marker(&item.attrs) {
        Ok(Some(marker)) => program.add_field(FieldDecl {
            enclosing: Enclosing::Module(module),
            name: item.ident.to_string(),
            ty: field_type(&item.ty, &[]),
            visibility: visibility(&item.vis),
            is_static: true,
            marker,
        }),
        Ok(None) => {}
        Err(err) => program.add_malformed(format!("{}::{}", module, item.ident), err),
    }
}

fn load_fields(
    program: &mut Program,
    enclosing: Enclosing,
    fields: &Fields,
    params: &[TypeParam],
    visibility_override: Option<Visibility>,
) {
    for (index, field) in fields.iter().enumerate() {
        let name = field_name(field, index);
        let marker = match marker(&field.attrs) {
            Ok(Some(marker)) => marker,
            Ok(None) => continue,
            Err(err) => {
                let element = match &enclosing {
                    Enclosing::Type(id) => format!("{}.{}", program.get(*id).path, name),
                    Enclosing::Module(module) => format!("{}::{}", module, name),
                };
                program.add_malformed(element, err);
                continue;
            }
        };

        program.add_field(FieldDecl {
            enclosing: enclosing.clone(),
            name,
            ty: field_type(&field.ty, params),
            visibility: visibility_override.unwrap_or_else(|| visibility(&field.vis)),
            is_static: false,
            marker,
        });
    }
}

/// Field identifier, or its position for tuple fields.
fn field_name(field: &syn::Field, index: usize) -> String {
    field
        .ident
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| index.to_string())
}

/// Reads `#[extra]`, `#[extra("key")]` or `#[extra = "key"]`.
fn marker(attrs: &[Attribute]) -> syn::Result<Option<Marker>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident(MARKER_ATTR)) else {
        return Ok(None);
    };

    let value = match &attr.meta {
        Meta::Path(_) => String::new(),
        Meta::List(list) if list.tokens.is_empty() => String::new(),
        Meta::List(list) => list.parse_args::<LitStr>()?.value(),
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(lit), ..
            }) => lit.value(),
            other => return Err(syn::Error::new_spanned(other, "expected a string literal key")),
        },
    };
    Ok(Some(Marker::new(value)))
}

/// Flags of every `#[target(...)]` attribute, e.g. `sealed` or `parent`.
fn target_flags(attrs: &[Attribute]) -> syn::Result<Vec<String>> {
    let mut flags = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident(TARGET_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                flags.push(ident.to_string());
            }
            Ok(())
        })?;
    }
    Ok(flags)
}

fn type_params(generics: &syn::Generics) -> Vec<TypeParam> {
    generics
        .type_params()
        .map(|param| TypeParam {
            name: param.ident.to_string(),
            default: param.default.as_ref().map(render),
        })
        .collect()
}

fn field_type(ty: &syn::Type, params: &[TypeParam]) -> FieldType {
    match option_inner(ty) {
        Some(inner) => FieldType::Optional(type_ref(inner, params)),
        None => FieldType::Other(render(ty)),
    }
}

/// The `T` of `Option<T>`, `std::option::Option<T>` or `core::option::Option<T>`.
fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(syn::TypePath { qself: None, path }) = ty else {
        return None;
    };
    let idents: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    let is_option = match idents.as_slice() {
        [option] => option == "Option",
        [krate, module, option] => {
            (krate == "std" || krate == "core") && module == "option" && option == "Option"
        }
        _ => false,
    };
    if !is_option {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &path.segments.last()?.arguments else {
        return None;
    };
    match (args.args.len(), args.args.first()) {
        (1, Some(GenericArgument::Type(inner))) => Some(inner),
        _ => None,
    }
}

fn type_ref(ty: &syn::Type, params: &[TypeParam]) -> TypeRef {
    if let syn::Type::Path(syn::TypePath { qself: None, path }) = ty {
        if let Some(ident) = path.get_ident() {
            let name = ident.to_string();
            if params.iter().any(|p| p.name == name) {
                return TypeRef::Param(name);
            }
        }
    }
    TypeRef::Named(render(ty))
}

fn resolve_type(module: &[String], imports: &Imports, ty: &syn::Type) -> syn::Result<TypePath> {
    let syn::Type::Path(syn::TypePath { qself: None, path }) = ty else {
        return Err(syn::Error::new_spanned(ty, "parent field must name a struct type"));
    };
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();

    if path.leading_colon.is_some() {
        return Ok(TypePath::new(segments));
    }

    let resolved = match segments.first().map(String::as_str) {
        Some("crate") | Some("self") | Some("super") => absolute(module, &segments),
        Some(first) => match imports.get(first) {
            Some(target) => {
                let mut full = target.clone();
                full.extend(segments.iter().skip(1).cloned());
                full
            }
            None => [module, segments.as_slice()].concat(),
        },
        None => return Err(syn::Error::new_spanned(ty, "empty type path")),
    };
    Ok(TypePath::new(resolved))
}

fn collect_imports(module: &[String], items: &[Item]) -> Imports {
    let mut imports = Imports::new();
    for item in items {
        if let Item::Use(item) = item {
            flatten_use(module, Vec::new(), &item.tree, &mut imports);
        }
    }
    imports
}

fn flatten_use(module: &[String], prefix: Vec<String>, tree: &syn::UseTree, out: &mut Imports) {
    match tree {
        syn::UseTree::Path(path) => {
            let mut next = prefix;
            next.push(path.ident.to_string());
            flatten_use(module, next, &path.tree, out);
        }
        syn::UseTree::Name(name) if name.ident == "self" => {
            if let Some(last) = prefix.last().cloned() {
                out.insert(last, absolute(module, &prefix));
            }
        }
        syn::UseTree::Name(name) => {
            let local = name.ident.to_string();
            let mut full = prefix;
            full.push(local.clone());
            out.insert(local, absolute(module, &full));
        }
        syn::UseTree::Rename(rename) => {
            let mut full = prefix;
            full.push(rename.ident.to_string());
            out.insert(rename.rename.to_string(), absolute(module, &full));
        }
        syn::UseTree::Glob(_) => {}
        syn::UseTree::Group(group) => {
            for item in &group.items {
                flatten_use(module, prefix.clone(), item, out);
            }
        }
    }
}

/// Resolves `crate::`, `self::` and `super::` prefixes; other paths are
/// taken relative to the current module.
fn absolute(module: &[String], segments: &[String]) -> Vec<String> {
    match segments.first().map(String::as_str) {
        Some("crate") => {
            let mut full = module[..1].to_vec();
            full.extend(segments[1..].iter().cloned());
            full
        }
        Some("self") => [module, &segments[1..]].concat(),
        Some("super") => {
            let supers = segments.iter().take_while(|s| *s == "super").count();
            let keep = module.len().saturating_sub(supers).max(1);
            [&module[..keep], &segments[supers..]].concat()
        }
        _ => [module, segments].concat(),
    }
}

fn type_path(module: &[String], ident: &syn::Ident) -> TypePath {
    let mut segments = module.to_vec();
    segments.push(ident.to_string());
    TypePath::new(segments)
}

fn visibility(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Public,
        syn::Visibility::Restricted(r) if r.in_token.is_none() && r.path.is_ident("crate") => {
            Visibility::Crate
        }
        syn::Visibility::Restricted(r) if r.in_token.is_none() && r.path.is_ident("self") => {
            Visibility::Private
        }
        syn::Visibility::Restricted(_) => Visibility::Restricted,
        syn::Visibility::Inherited => Visibility::Private,
    }
}

fn render<T: ToTokens>(tokens: &T) -> String {
    tokens.to_token_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> Vec<String> {
        path.split("::").map(str::to_string).collect()
    }

    fn load(source: &str) -> Program {
        let mut program = Program::new();
        parse_source(&mut program, &module("app"), source).unwrap();
        program
    }

    #[test]
    fn test_markers_and_keys() {
        let program = load(
            r#"
            #[derive(Target)]
            pub struct Base {
                #[extra] pub id: Option<String>,
                #[extra("label")] pub(crate) name: Option<String>,
                #[extra = "count"] pub total: Option<u32>,
                pub untouched: Option<String>,
            }
            "#,
        );

        let fields = program.marked_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "id");
        assert_eq!(fields[0].marker.value, "");
        assert_eq!(fields[1].marker.value, "label");
        assert_eq!(fields[1].visibility, Visibility::Crate);
        assert_eq!(fields[2].marker.value, "count");
        assert_eq!(
            fields[2].ty,
            FieldType::Optional(TypeRef::Named("u32".to_string()))
        );
    }

    #[test]
    fn test_parent_resolution_through_imports() {
        let program = load(
            r#"
            mod base {
                pub struct Base { #[extra] pub id: Option<String> }
            }
            mod screens {
                use crate::base::Base;
                use super::base::Base as Renamed;

                pub struct Detail { #[target(parent)] pub base: Base }
                pub struct Other { #[target(parent)] pub base: Renamed }
                pub struct Local { #[target(parent)] pub inner: Detail }
            }
            "#,
        );

        let detail = program.find("app::screens::Detail").unwrap();
        let other = program.find("app::screens::Other").unwrap();
        let local = program.find("app::screens::Local").unwrap();
        let base = program.find("app::base::Base").unwrap();

        assert_eq!(program.parent_of(detail), Some(base));
        assert_eq!(program.parent_of(other), Some(base));
        assert_eq!(program.parent_of(local), Some(detail));
    }

    #[test]
    fn test_sealed_generics_and_statics() {
        let program = load(
            r#"
            #[target(sealed)]
            pub struct Holder<U, T = Payload> {
                #[extra] pub item: Option<T>,
                #[extra] pub other: Option<U>,
                #[extra] pub plain: String,
            }

            #[extra]
            pub static GLOBAL: Option<String> = None;
            "#,
        );

        let holder = program.find("app::Holder").unwrap();
        let decl = program.get(holder);
        assert!(decl.sealed);
        assert_eq!(decl.param("T").unwrap().default.as_deref(), Some("Payload"));
        assert_eq!(decl.param("U").unwrap().default, None);

        let fields = program.marked_fields();
        assert_eq!(fields[0].ty, FieldType::Optional(TypeRef::Param("T".to_string())));
        assert_eq!(fields[2].ty, FieldType::Other("String".to_string()));
        assert!(fields[3].is_static);
        assert_eq!(fields[3].enclosing, Enclosing::Module("app".to_string()));
    }

    #[test]
    fn test_enum_and_private_fields() {
        let program = load(
            r#"
            pub enum Choice { A { #[extra] value: Option<u8> } }
            struct Hidden { #[extra] secret: Option<u8> }
            "#,
        );

        let choice = program.find("app::Choice").unwrap();
        assert_eq!(program.get(choice).kind, TypeKind::Enum);
        let hidden = program.find("app::Hidden").unwrap();
        assert_eq!(program.get(hidden).visibility, Visibility::Private);

        let fields = program.marked_fields();
        assert_eq!(fields[0].visibility, Visibility::Public);
        assert_eq!(fields[1].visibility, Visibility::Private);
    }

    #[test]
    fn test_malformed_attributes_skip_only_their_element() {
        let program = load(
            r#"
            pub struct Mixed {
                #[extra(42)] pub broken: Option<u8>,
                #[extra] pub fine: Option<u8>,
                #[target(parent = 1)] pub base: Base,
            }

            #[target(sealed = "yes")]
            pub struct Odd { #[extra] pub id: Option<u8> }
            "#,
        );

        let fields: Vec<_> = program.marked_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["fine", "id"]);

        let elements: Vec<_> = program.malformed().iter().map(|m| m.element.as_str()).collect();
        assert_eq!(elements, vec!["app::Mixed.base", "app::Mixed.broken", "app::Odd"]);
        assert_eq!(program.get(program.find("app::Mixed").unwrap()).parent, None);
        assert!(!program.get(program.find("app::Odd").unwrap()).sealed);
    }

    #[test]
    fn test_invalid_rust_is_an_error() {
        let mut program = Program::new();
        let result = parse_source(&mut program, &module("app"), "pub struct Bad {");
        assert!(result.is_err());
    }

    #[test]
    fn test_module_path_for_files() {
        let root = Path::new("/work/src");
        assert_eq!(
            module_path_for("my-app", root, Path::new("/work/src/lib.rs")),
            Some(module("my_app"))
        );
        assert_eq!(
            module_path_for("app", root, Path::new("/work/src/ui/mod.rs")),
            Some(module("app::ui"))
        );
        assert_eq!(
            module_path_for("app", root, Path::new("/work/src/ui/detail.rs")),
            Some(module("app::ui::detail"))
        );
        assert_eq!(module_path_for("app", root, Path::new("/work/src/bin/tool.rs")), None);
        assert_eq!(module_path_for("app", root, Path::new("/work/src/notes.txt")), None);
    }
}
