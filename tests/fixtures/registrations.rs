// Generated code from extrabind. Do not modify!

#[doc = "Registers every binder generated for this crate."]
pub fn register_binders(table: &mut ::extrabind::BinderTable) {
    table.register(
        crate::BaseBinder::NAME,
        ::extrabind::BinderConstructor::Source(crate::BaseBinder::construct),
    );
    table.register(
        crate::views::DetailBinder::NAME,
        ::extrabind::BinderConstructor::Source(crate::views::DetailBinder::construct),
    );
}
