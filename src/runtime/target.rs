//! Target trait and runtime type descriptors.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::BindError;
use super::values::Source;

/// Runtime descriptor of a target type: its qualified name and its parent.
///
/// Names follow `module_path!()` so they line up with the names the code
/// emitter derives for binders.
pub struct TypeInfo {
    name: &'static str,
    superclass: Option<fn() -> &'static TypeInfo>,
}

impl TypeInfo {
    pub const fn new(name: &'static str, superclass: Option<fn() -> &'static TypeInfo>) -> Self {
        Self { name, superclass }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn superclass(&self) -> Option<&'static TypeInfo> {
        self.superclass.map(|parent| parent())
    }

    /// This type followed by its ancestors.
    pub fn ancestors(&'static self) -> impl Iterator<Item = &'static TypeInfo> {
        std::iter::successors(Some(self), |ty| ty.superclass())
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("superclass", &self.superclass().map(TypeInfo::name))
            .finish()
    }
}

/// Statically known type descriptor.
pub trait Typed: Any {
    fn type_info() -> &'static TypeInfo;
}

/// Identity of the caller that supplied a target's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerId(pub u64);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An object whose fields binders populate.
///
/// A target that extends another one embeds its parent and exposes it
/// through [`Target::ancestor_mut`], which is how a parent binder reaches
/// the fields it owns inside a child instance.
pub trait Target: Any {
    /// Concrete runtime type of this instance.
    fn runtime_type(&self) -> &'static TypeInfo;

    /// This instance viewed as `ty`, if `ty` is its own type or an ancestor.
    fn ancestor_mut(&mut self, ty: &'static TypeInfo) -> Option<&mut dyn Any>;

    fn caller_identity(&self) -> CallerId;

    fn source(&self) -> Source;
}

/// Shared handle to a target, as held by binders until unbind.
pub type TargetRef = Rc<RefCell<dyn Target>>;

/// Views `target` as its ancestor (or own type) `O`.
pub fn owner_mut<O: Typed>(target: &mut dyn Target) -> Result<&mut O, BindError> {
    let owner = O::type_info();
    let runtime = target.runtime_type();
    target
        .ancestor_mut(owner)
        .and_then(|any| any.downcast_mut::<O>())
        .ok_or(BindError::NotAnAncestor {
            owner: owner.name(),
            target: runtime.name(),
        })
}
