// Generated code from extrabind. Do not modify!

#[doc = "Binder for [`Base`]."]
pub struct BaseBinder {
    target: ::core::option::Option<::extrabind::TargetRef>,
}

impl BaseBinder {
    pub const NAME: &'static str = concat!(module_path!(), "::", "BaseBinder");

    pub fn new(
        target: ::extrabind::TargetRef,
        source: &::extrabind::Source,
    ) -> ::core::result::Result<Self, ::extrabind::BindError> {
        Self::bind_fields(&target, source)?;
        ::core::result::Result::Ok(Self {
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
        let value_0 = ::extrabind::lookup::<Tracked>(values, caller, "id")?;
        let owner = ::extrabind::owner_mut::<Base>(&mut *guard)?;
        owner.id = value_0;
        ::core::result::Result::Ok(())
    }

    pub fn construct(
        target: ::extrabind::TargetRef,
        source: &::extrabind::Source,
    ) -> ::extrabind::anyhow::Result<::std::boxed::Box<dyn ::extrabind::Unbinder>> {
        ::core::result::Result::Ok(::std::boxed::Box::new(Self::new(target, source)?))
    }
}

impl ::extrabind::Unbinder for BaseBinder {
    fn unbind(&mut self) -> ::core::result::Result<(), ::extrabind::BindError> {
        let target = self
            .target
            .as_ref()
            .ok_or(::extrabind::BindError::AlreadyUnbound { binder: Self::NAME })?;
        {
            let mut guard = target.borrow_mut();
            let owner = ::extrabind::owner_mut::<Base>(&mut *guard)?;
            owner.id = ::core::option::Option::None;
        }
        self.target = ::core::option::Option::None;
        ::core::result::Result::Ok(())
    }
}
