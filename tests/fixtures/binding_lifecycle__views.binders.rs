// Generated code from extrabind. Do not modify!

#[doc = "Binder for [`Detail`]."]
pub struct DetailBinder {
    parent: crate::BaseBinder,
    target: ::core::option::Option<::extrabind::TargetRef>,
}

impl DetailBinder {
    pub const NAME: &'static str = concat!(module_path!(), "::", "DetailBinder");

    pub fn new(
        target: ::extrabind::TargetRef,
        source: &::extrabind::Source,
    ) -> ::core::result::Result<Self, ::extrabind::BindError> {
        let mut parent = crate::BaseBinder::new(::std::rc::Rc::clone(&target), source)?;
        if let ::core::result::Result::Err(err) = Self::bind_fields(&target, source) {
            let _ = ::extrabind::Unbinder::unbind(&mut parent);
            return ::core::result::Result::Err(err);
        }
        ::core::result::Result::Ok(Self {
            parent,
            target: ::core::option::Option::Some(target),
        })
    }

    fn bind_fields(
        target: &::extrabind::TargetRef,
        source: &::extrabind::Source,
    ) -> ::core::result::Result<(), ::extrabind::BindError> {
        let values = source.context().values();
        let mut guard = target.borrow_mut();
        let caller = ::extrabind::Target::caller_identity(&*guard);
        let value_0 = ::extrabind::lookup::<Tracked>(values, caller, "label")?;
        let owner = ::extrabind::owner_mut::<Detail>(&mut *guard)?;
        owner.name = value_0;
        ::core::result::Result::Ok(())
    }

    pub fn construct(
        target: ::extrabind::TargetRef,
        source: &::extrabind::Source,
    ) -> ::extrabind::anyhow::Result<::std::boxed::Box<dyn ::extrabind::Unbinder>> {
        ::core::result::Result::Ok(::std::boxed::Box::new(Self::new(target, source)?))
    }
}

impl ::extrabind::Unbinder for DetailBinder {
    fn unbind(&mut self) -> ::core::result::Result<(), ::extrabind::BindError> {
        let target = self
            .target
            .as_ref()
            .ok_or(::extrabind::BindError::AlreadyUnbound { binder: Self::NAME })?;
        {
            let mut guard = target.borrow_mut();
            let owner = ::extrabind::owner_mut::<Detail>(&mut *guard)?;
            owner.name = ::core::option::Option::None;
        }
        self.target = ::core::option::Option::None;
        ::extrabind::Unbinder::unbind(&mut self.parent)
    }
}
