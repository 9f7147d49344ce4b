//! Program element model consumed by the scanner.
//!
//! A [`Program`] is the universe of one generation pass: every type declared
//! in the scanned sources plus every field or static carrying the `#[extra]`
//! marker. Types live in an arena and are addressed by [`TypeId`], which also
//! gives every later stage a deterministic iteration order (declaration
//! order).

pub mod source;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Index of a type declaration inside a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeId(usize);

/// Fully qualified path of a type: crate name, modules, identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypePath {
    segments: Vec<String>,
}

impl TypePath {
    /// Creates a path from its segments; the last segment is the identifier.
    pub fn new(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty(), "type path needs an identifier");
        Self { segments }
    }

    /// Parses `a::b::C`.
    pub fn parse(qualified: &str) -> Self {
        Self::new(qualified.split("::").map(str::to_string).collect())
    }

    /// The type identifier (last segment).
    pub fn ident(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Segments of the enclosing module, crate name first.
    pub fn module_segments(&self) -> &[String] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }

    /// Enclosing module as `a::b`.
    pub fn module_path(&self) -> String {
        self.module_segments().join("::")
    }

    /// The same path with the crate name replaced by `crate`, for use in
    /// generated code.
    pub fn crate_relative(&self) -> String {
        let mut segments = vec!["crate"];
        segments.extend(self.segments.iter().skip(1).map(String::as_str));
        segments.join("::")
    }

    /// Sibling path in the same module with a different identifier.
    pub fn with_ident(&self, ident: &str) -> Self {
        let mut segments = self.module_segments().to_vec();
        segments.push(ident.to_string());
        Self::new(segments)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("::"))
    }
}

/// Kind of a declared type. Only structs play the role of classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    Struct,
    Enum,
    Union,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Struct => f.write_str("struct"),
            TypeKind::Enum => f.write_str("enum"),
            TypeKind::Union => f.write_str("union"),
        }
    }
}

/// Declared visibility of a type or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    /// `pub`
    Public,
    /// `pub(crate)`
    Crate,
    /// `pub(super)` or `pub(in path)`
    Restricted,
    /// No modifier or `pub(self)`
    Private,
}

impl Visibility {
    /// Whether generated code elsewhere in the crate can reach the item.
    pub fn is_crate_visible(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Crate)
    }
}

/// A type parameter of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeParam {
    pub name: String,
    /// Default type, used as the parameter's bound when erasing.
    pub default: Option<String>,
}

/// A declared type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDecl {
    pub path: TypePath,
    pub kind: TypeKind,
    pub visibility: Visibility,
    /// Declared non-extensible (`#[target(sealed)]`).
    pub sealed: bool,
    /// Declared parent type (`#[target(parent)]` field), resolved to a path.
    pub parent: Option<TypePath>,
    pub params: Vec<TypeParam>,
}

impl TypeDecl {
    /// A public, unsealed struct without parent or parameters.
    pub fn new(path: TypePath) -> Self {
        Self {
            path,
            kind: TypeKind::Struct,
            visibility: Visibility::Public,
            sealed: false,
            parent: None,
            params: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: TypePath) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn with_param(mut self, name: &str, default: Option<&str>) -> Self {
        self.params.push(TypeParam {
            name: name.to_string(),
            default: default.map(str::to_string),
        });
        self
    }

    /// Looks up a type parameter by name.
    pub fn param(&self, name: &str) -> Option<&TypeParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Reference to a field's value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    /// A concrete type, rendered as Rust tokens.
    Named(String),
    /// One of the enclosing type's parameters.
    Param(String),
}

/// Declared type of a marked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldType {
    /// `Option<T>`
    Optional(TypeRef),
    /// Any other type, rendered as Rust tokens.
    Other(String),
}

/// Where a marked element is declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Enclosing {
    Type(TypeId),
    /// Module-level item (a `static`), given as its module path.
    Module(String),
}

/// The `#[extra]` marker's parameter; empty means "use the field name".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub value: String,
}

impl Marker {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// A field or static carrying the `#[extra]` marker.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDecl {
    pub enclosing: Enclosing,
    pub name: String,
    pub ty: FieldType,
    pub visibility: Visibility,
    pub is_static: bool,
    pub marker: Marker,
}

impl FieldDecl {
    /// A public `Option<ty>` field of `owner`.
    pub fn new(owner: TypeId, name: &str, ty: &str, marker: Marker) -> Self {
        Self {
            enclosing: Enclosing::Type(owner),
            name: name.to_string(),
            ty: FieldType::Optional(TypeRef::Named(ty.to_string())),
            visibility: Visibility::Public,
            is_static: false,
            marker,
        }
    }

    pub fn with_type(mut self, ty: FieldType) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// An element whose `#[extra]` or `#[target(..)]` attribute could not be
/// read. The element itself is left out of the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedElement {
    /// Qualified element name, e.g. `app::Detail.name`.
    pub element: String,
    pub message: String,
}

/// All declared types and marked elements of one generation pass.
#[derive(Debug, Default)]
pub struct Program {
    types: Vec<TypeDecl>,
    by_name: HashMap<String, TypeId>,
    fields: Vec<FieldDecl>,
    malformed: Vec<MalformedElement>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration. A second declaration under the same
    /// qualified name (e.g. behind different `cfg`s) keeps the first.
    pub fn add_type(&mut self, decl: TypeDecl) -> TypeId {
        let name = decl.path.to_string();
        if let Some(&id) = self.by_name.get(&name) {
            tracing::debug!("Duplicate declaration of {}, keeping the first", name);
            return id;
        }
        let id = TypeId(self.types.len());
        self.types.push(decl);
        self.by_name.insert(name, id);
        id
    }

    pub fn add_field(&mut self, field: FieldDecl) {
        self.fields.push(field);
    }

    pub fn add_malformed(&mut self, element: String, message: impl fmt::Display) {
        self.malformed.push(MalformedElement {
            element,
            message: message.to_string(),
        });
    }

    /// Type declaration for an id issued by this program.
    pub fn get(&self, id: TypeId) -> &TypeDecl {
        &self.types[id.0]
    }

    /// Finds a type by qualified name.
    pub fn find(&self, qualified: &str) -> Option<TypeId> {
        self.by_name.get(qualified).copied()
    }

    /// Direct parent type, if declared and part of this program.
    pub fn parent_of(&self, id: TypeId) -> Option<TypeId> {
        self.get(id)
            .parent
            .as_ref()
            .and_then(|parent| self.find(&parent.to_string()))
    }

    /// All types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDecl)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    /// All marked elements in declaration order.
    pub fn marked_fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Elements skipped because their attributes could not be read.
    pub fn malformed(&self) -> &[MalformedElement] {
        &self.malformed
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
