//! Binding graph builder.
//!
//! Groups eligible fields into one [`BindingSet`] per owner type and links
//! every set to the set of its nearest ancestor that has bindings. Linking is
//! a queue-based tree walk: an entry whose parent set is not finished yet is
//! re-enqueued at the tail until the parent has been built.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::rc::Rc;

use thiserror::Error;

use crate::model::{Program, TypeId, TypePath};
use crate::naming;
use crate::scan::{AnnotatedField, ScanResult};

/// One field populated from the value registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub key: String,
    pub value_type: String,
}

/// All bindings requested by one owner type, linked to its parent set.
#[derive(Debug)]
pub struct BindingSet {
    pub owner: TypeId,
    pub owner_path: TypePath,
    pub binder_path: TypePath,
    /// The owner is sealed; nothing may chain to its binder.
    pub is_final: bool,
    pub bindings: Vec<Binding>,
    pub parent: Option<Rc<BindingSet>>,
}

impl BindingSet {
    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// True if the binder's constructor takes a source rather than a
    /// context. Decided over the whole parent chain, since a child
    /// constructor must be able to feed its parent's.
    pub fn needs_source(&self) -> bool {
        self.has_bindings() || self.parent.as_ref().is_some_and(|p| p.needs_source())
    }

    /// This set followed by its ancestors.
    pub fn chain(&self) -> impl Iterator<Item = &BindingSet> {
        std::iter::successors(Some(self), |set| set.parent.as_deref())
    }
}

/// Mutable accumulator for a [`BindingSet`].
#[derive(Debug)]
pub struct BindingSetBuilder {
    owner: TypeId,
    owner_path: TypePath,
    binder_path: TypePath,
    is_final: bool,
    bindings: Vec<Binding>,
    parent: Option<Rc<BindingSet>>,
}

impl BindingSetBuilder {
    pub fn new(program: &Program, owner: TypeId) -> Self {
        let decl = program.get(owner);
        let binder_path = decl
            .path
            .with_ident(&naming::binder_ident(decl.path.ident()));
        Self {
            owner,
            owner_path: decl.path.clone(),
            binder_path,
            is_final: decl.sealed,
            bindings: Vec::new(),
            parent: None,
        }
    }

    /// Adds a binding. Re-adding a field name replaces the earlier binding in
    /// place.
    pub fn add_field(&mut self, name: &str, key: &str, value_type: &str) {
        let binding = Binding {
            name: name.to_string(),
            key: key.to_string(),
            value_type: value_type.to_string(),
        };
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    pub fn set_parent(&mut self, parent: Rc<BindingSet>) {
        self.parent = Some(parent);
    }

    pub fn build(self) -> BindingSet {
        BindingSet {
            owner: self.owner,
            owner_path: self.owner_path,
            binder_path: self.binder_path,
            is_final: self.is_final,
            bindings: self.bindings,
            parent: self.parent,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("parent chain of `{0}` loops back on itself")]
    Cycle(String),

    #[error("cannot resolve parent bindings for: {}", .0.join(", "))]
    Unresolved(Vec<String>),
}

/// Finished, linked binding sets by owner, in declaration order.
pub type BindingMap = BTreeMap<TypeId, Rc<BindingSet>>;

/// Groups and links the fields of a scan.
pub fn build(program: &Program, scan: &ScanResult) -> Result<BindingMap, GraphError> {
    let builders = collect(program, &scan.fields);
    link(program, builders, &scan.has_bindings)
}

/// Groups fields into one builder per owner, fields in first-seen order.
pub fn collect(program: &Program, fields: &[AnnotatedField]) -> BTreeMap<TypeId, BindingSetBuilder> {
    let mut builders = BTreeMap::new();
    for field in fields {
        builders
            .entry(field.owner)
            .or_insert_with(|| BindingSetBuilder::new(program, field.owner))
            .add_field(&field.name, &field.key, &field.value_type);
    }
    builders
}

/// Links every builder to its nearest ancestor set and freezes it.
pub fn link(
    program: &Program,
    builders: BTreeMap<TypeId, BindingSetBuilder>,
    has_bindings: &BTreeSet<TypeId>,
) -> Result<BindingMap, GraphError> {
    let mut entries: VecDeque<(TypeId, BindingSetBuilder)> = builders.into_iter().collect();
    let mut finished = BindingMap::new();
    let mut deferred_in_a_row = 0;

    while let Some((owner, mut builder)) = entries.pop_front() {
        match find_parent_type(program, owner, has_bindings)? {
            None => {
                finished.insert(owner, Rc::new(builder.build()));
                deferred_in_a_row = 0;
            }
            Some(parent) => match finished.get(&parent) {
                Some(parent_set) => {
                    builder.set_parent(Rc::clone(parent_set));
                    finished.insert(owner, Rc::new(builder.build()));
                    deferred_in_a_row = 0;
                }
                None => {
                    tracing::debug!(
                        "Deferring {} until {} is built",
                        program.get(owner).path,
                        program.get(parent).path
                    );
                    entries.push_back((owner, builder));
                    deferred_in_a_row += 1;
                    if deferred_in_a_row >= entries.len() {
                        let pending = entries
                            .iter()
                            .map(|(id, _)| program.get(*id).path.to_string())
                            .collect();
                        return Err(GraphError::Unresolved(pending));
                    }
                }
            },
        }
    }

    Ok(finished)
}

/// Nearest ancestor of `owner` that has bindings.
fn find_parent_type(
    program: &Program,
    owner: TypeId,
    has_bindings: &BTreeSet<TypeId>,
) -> Result<Option<TypeId>, GraphError> {
    let mut seen = HashSet::from([owner]);
    let mut current = owner;
    while let Some(parent) = program.parent_of(current) {
        if !seen.insert(parent) {
            return Err(GraphError::Cycle(program.get(owner).path.to_string()));
        }
        if has_bindings.contains(&parent) {
            return Ok(Some(parent));
        }
        current = parent;
    }
    Ok(None)
}
