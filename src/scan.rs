//! Scanner and validator for `#[extra]` elements.
//!
//! Every marked element is checked on its own. Ineligible elements produce
//! [`Diagnostic`]s and are skipped; the pass always visits every element.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::{Enclosing, FieldDecl, FieldType, Program, TypeId, TypeKind, TypeRef};
use crate::naming;

/// Why a marked element (or a type) cannot take part in binding.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("#[extra] fields must be `pub` or `pub(crate)`")]
    PrivateField,

    #[error("#[extra] may not be placed on statics")]
    StaticField,

    #[error("#[extra] fields may only be contained in structs, found {found}")]
    NotInStruct { found: String },

    #[error("#[extra] fields may not be contained in private types")]
    PrivateType,

    #[error("#[extra]-annotated type incorrectly in reserved namespace `{prefix}`")]
    ReservedNamespace { prefix: String },

    #[error("#[extra] fields must be declared as `Option<T>`, found `{ty}`")]
    NotOptional { ty: String },

    #[error("type parameter `{param}` needs a default type to be bound")]
    UnboundParam { param: String },

    #[error("cannot extend sealed type `{parent}`")]
    SealedParent { parent: String },

    #[error("malformed attribute: {message}")]
    MalformedMarker { message: String },
}

/// A validation error attached to the element it was reported for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Qualified element name, e.g. `app::Detail.name`.
    pub element: String,
    pub error: ValidationError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.error)
    }
}

/// An eligible marked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedField {
    pub owner: TypeId,
    pub name: String,
    /// Value type stored in the field's `Option`, type parameters erased to
    /// their defaults.
    pub value_type: String,
    /// Registry key: the marker's value, or the field name when empty.
    pub key: String,
}

/// Output of one scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub fields: Vec<AnnotatedField>,
    /// Owners with at least one eligible field.
    pub has_bindings: BTreeSet<TypeId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans every marked element of `program`.
pub fn scan(program: &Program) -> ScanResult {
    let mut result = ScanResult::default();

    for field in program.marked_fields() {
        let element = element_name(program, field);
        match check_field(program, field) {
            Ok(annotated) => {
                tracing::debug!(element = %element, key = %annotated.key, "Found binding");
                result.has_bindings.insert(annotated.owner);
                result.fields.push(annotated);
            }
            Err(errors) => {
                result.diagnostics.extend(errors.into_iter().map(|error| Diagnostic {
                    element: element.clone(),
                    error,
                }));
            }
        }
    }

    result
        .diagnostics
        .extend(program.malformed().iter().map(|malformed| Diagnostic {
            element: malformed.element.clone(),
            error: ValidationError::MalformedMarker {
                message: malformed.message.clone(),
            },
        }));
    result.diagnostics.extend(check_sealed_parents(program));
    result
}

fn check_field(program: &Program, field: &FieldDecl) -> Result<AnnotatedField, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !field.visibility.is_crate_visible() {
        errors.push(ValidationError::PrivateField);
    }
    if field.is_static {
        errors.push(ValidationError::StaticField);
    }

    let owner = match &field.enclosing {
        Enclosing::Type(id) => {
            let decl = program.get(*id);
            if decl.kind != TypeKind::Struct {
                errors.push(ValidationError::NotInStruct {
                    found: decl.kind.to_string(),
                });
            }
            if !decl.visibility.is_crate_visible() {
                errors.push(ValidationError::PrivateType);
            }
            if let Some(prefix) = reserved_prefix(&decl.path.to_string()) {
                errors.push(ValidationError::ReservedNamespace { prefix });
            }
            Some(*id)
        }
        Enclosing::Module(module) => {
            errors.push(ValidationError::NotInStruct {
                found: "module".to_string(),
            });
            if let Some(prefix) = reserved_prefix(&format!("{}::", module)) {
                errors.push(ValidationError::ReservedNamespace { prefix });
            }
            None
        }
    };

    let value_type = match &field.ty {
        FieldType::Other(ty) => {
            errors.push(ValidationError::NotOptional { ty: ty.clone() });
            None
        }
        FieldType::Optional(TypeRef::Named(ty)) => Some(ty.clone()),
        FieldType::Optional(TypeRef::Param(param)) => {
            let default = owner
                .and_then(|id| program.get(id).param(param))
                .and_then(|p| p.default.clone());
            if default.is_none() {
                errors.push(ValidationError::UnboundParam {
                    param: param.clone(),
                });
            }
            default
        }
    };

    match (owner, value_type) {
        (Some(owner), Some(value_type)) if errors.is_empty() => {
            let key = if field.marker.value.is_empty() {
                field.name.clone()
            } else {
                field.marker.value.clone()
            };
            Ok(AnnotatedField {
                owner,
                name: field.name.clone(),
                value_type,
                key,
            })
        }
        _ => Err(errors),
    }
}

fn check_sealed_parents(program: &Program) -> Vec<Diagnostic> {
    program
        .types()
        .filter_map(|(id, decl)| {
            let parent = program.get(program.parent_of(id)?);
            parent.sealed.then(|| Diagnostic {
                element: decl.path.to_string(),
                error: ValidationError::SealedParent {
                    parent: parent.path.to_string(),
                },
            })
        })
        .collect()
}

fn reserved_prefix(qualified: &str) -> Option<String> {
    naming::RESERVED_PREFIXES
        .iter()
        .find(|prefix| qualified.starts_with(*prefix))
        .map(|prefix| prefix.to_string())
}

fn element_name(program: &Program, field: &FieldDecl) -> String {
    match &field.enclosing {
        Enclosing::Type(id) => format!("{}.{}", program.get(*id).path, field.name),
        Enclosing::Module(module) => format!("{}::{}", module, field.name),
    }
}
