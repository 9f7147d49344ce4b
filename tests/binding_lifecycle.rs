//! End-to-end binding through generated binders.
//!
//! The binders under `fixtures/` are the emitter's output for the types in
//! this file; `test_fixtures_match_emitter_output` keeps them in sync.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use extrabind::{
    BindError, BinderTable, CacheEntry, CallerId, Context, ExtrasStore, Resolver, Source, Target,
    TargetRef, Typed, ValueRegistry, ValuesError,
};

include!("fixtures/binding_lifecycle.binders.rs");
include!("fixtures/registrations.rs");

/// Value that records its own release.
#[derive(Clone)]
pub struct Tracked {
    pub label: String,
    log: Rc<RefCell<Vec<String>>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.label.clone());
    }
}

#[derive(Target)]
pub struct Base {
    #[target(caller)]
    pub caller: CallerId,
    #[target(source)]
    pub source: Source,
    #[extra]
    pub id: Option<Tracked>,
}

#[derive(Target)]
pub struct Plain {
    #[target(parent)]
    pub base: Base,
}

#[derive(Target)]
pub struct Lone {
    #[target(caller)]
    pub caller: CallerId,
    #[target(source)]
    pub source: Source,
}

mod views {
    use crate::{Base, Tracked};
    use extrabind::Target;

    include!("fixtures/binding_lifecycle__views.binders.rs");

    #[derive(Target)]
    pub struct Detail {
        #[target(parent)]
        pub base: Base,
        #[extra("label")]
        pub name: Option<Tracked>,
    }
}

use views::Detail;

const CALLER: CallerId = CallerId(7);

struct Fixture {
    store: Rc<ExtrasStore>,
    source: Source,
    log: Rc<RefCell<Vec<String>>>,
    resolver: Resolver,
}

impl Fixture {
    fn new() -> Self {
        let store = Rc::new(ExtrasStore::new());
        let source = Source::new(Context::new(store.clone()));
        let mut table = BinderTable::new();
        register_binders(&mut table);
        Self {
            store,
            source,
            log: Rc::new(RefCell::new(Vec::new())),
            resolver: Resolver::new(table),
        }
    }

    fn put(&self, key: &str, label: &str) {
        let value = Tracked {
            label: label.to_string(),
            log: Rc::clone(&self.log),
        };
        self.store.put(CALLER, key, value);
    }

    fn base(&self) -> Base {
        Base {
            caller: CALLER,
            source: self.source.clone(),
            id: None,
        }
    }

    fn detail(&self) -> Rc<RefCell<Detail>> {
        Rc::new(RefCell::new(Detail {
            base: self.base(),
            name: None,
        }))
    }

    fn released(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

fn label(value: &Option<Tracked>) -> Option<&str> {
    value.as_ref().map(|v| v.label.as_str())
}

#[test]
fn test_bind_populates_whole_hierarchy() {
    let fixture = Fixture::new();
    fixture.put("id", "id-1");
    fixture.put("label", "hello");
    let detail = fixture.detail();
    let target: TargetRef = detail.clone();

    let _unbinder = fixture.resolver.bind(&target).unwrap();

    let detail = detail.borrow();
    assert_eq!(label(&detail.name), Some("hello"));
    assert_eq!(label(&detail.base.id), Some("id-1"));
}

#[test]
fn test_unbind_clears_most_derived_first() {
    let fixture = Fixture::new();
    fixture.put("id", "id-1");
    fixture.put("label", "hello");
    let detail = fixture.detail();
    let target: TargetRef = detail.clone();
    let mut unbinder = fixture.resolver.bind(&target).unwrap();

    unbinder.unbind().unwrap();

    assert_eq!(fixture.released(), vec!["hello", "id-1"]);
    let detail = detail.borrow();
    assert!(detail.name.is_none());
    assert!(detail.base.id.is_none());
}

#[test]
fn test_second_unbind_fails() {
    let fixture = Fixture::new();
    fixture.put("label", "hello");
    let target: TargetRef = fixture.detail();
    let mut unbinder = fixture.resolver.bind(&target).unwrap();
    unbinder.unbind().unwrap();

    let err = unbinder.unbind().unwrap_err();

    match err {
        BindError::AlreadyUnbound { binder } => {
            assert_eq!(binder, "binding_lifecycle::views::DetailBinder")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_values_leave_fields_empty() {
    let fixture = Fixture::new();
    fixture.store.register(CALLER);
    let detail = fixture.detail();
    let target: TargetRef = detail.clone();

    fixture.resolver.bind(&target).unwrap();

    assert!(detail.borrow().name.is_none());
    assert!(detail.borrow().base.id.is_none());
}

#[test]
fn test_type_without_own_binder_uses_parent_binder() {
    let fixture = Fixture::new();
    fixture.put("id", "id-2");
    let plain = Rc::new(RefCell::new(Plain {
        base: fixture.base(),
    }));
    let target: TargetRef = plain.clone();

    let mut unbinder = fixture.resolver.bind(&target).unwrap();

    assert_eq!(label(&plain.borrow().base.id), Some("id-2"));
    assert_eq!(
        fixture.resolver.cache_entry(Plain::type_info().name()),
        Some(CacheEntry::Found(BaseBinder::NAME))
    );
    unbinder.unbind().unwrap();
    assert!(plain.borrow().base.id.is_none());
}

#[test]
fn test_hierarchy_without_binder_gets_noop() {
    let fixture = Fixture::new();
    let target: TargetRef = Rc::new(RefCell::new(Lone {
        caller: CALLER,
        source: fixture.source.clone(),
    }));

    let mut unbinder = fixture.resolver.bind(&target).unwrap();

    unbinder.unbind().unwrap();
    unbinder.unbind().unwrap();
    assert_eq!(
        fixture.resolver.cache_entry("binding_lifecycle::Lone"),
        Some(CacheEntry::NotFound)
    );
}

#[test]
fn test_unknown_caller_is_absorbed_by_try_bind() {
    let fixture = Fixture::new();
    let detail = fixture.detail();
    let target: TargetRef = detail.clone();

    let err = fixture.resolver.bind(&target).err().unwrap();
    assert!(matches!(err, BindError::Values(ValuesError::UnknownCaller(CALLER))));

    let mut unbinder = fixture.resolver.try_bind(&target).unwrap();
    unbinder.unbind().unwrap();
    assert!(detail.borrow().name.is_none());
}

/// Registry that cannot serve one key.
struct FailingKey {
    store: Rc<ExtrasStore>,
    broken: &'static str,
}

impl ValueRegistry for FailingKey {
    fn lookup(&self, caller: CallerId, key: &str) -> Result<Option<Rc<dyn Any>>, ValuesError> {
        if key == self.broken {
            return Err(ValuesError::Unavailable(format!("{key} is offline")));
        }
        self.store.lookup(caller, key)
    }
}

#[test]
fn test_failed_child_lookup_releases_parent_fields() {
    let mut fixture = Fixture::new();
    fixture.put("id", "id-1");
    fixture.put("label", "hello");
    fixture.source = Source::new(Context::new(Rc::new(FailingKey {
        store: Rc::clone(&fixture.store),
        broken: "label",
    })));
    let detail = fixture.detail();
    let target: TargetRef = detail.clone();

    let err = fixture.resolver.bind(&target).err().unwrap();
    assert!(matches!(err, BindError::Values(ValuesError::Unavailable(_))));
    assert!(detail.borrow().base.id.is_none());
    assert!(detail.borrow().name.is_none());

    let mut unbinder = fixture.resolver.try_bind(&target).unwrap();
    assert!(detail.borrow().base.id.is_none());
    unbinder.unbind().unwrap();
    assert!(detail.borrow().name.is_none());
}

#[test]
fn test_type_info_follows_module_paths() {
    assert_eq!(Detail::type_info().name(), "binding_lifecycle::views::Detail");
    let ancestors: Vec<_> = Detail::type_info().ancestors().map(|t| t.name()).collect();
    assert_eq!(
        ancestors,
        vec!["binding_lifecycle::views::Detail", "binding_lifecycle::Base"]
    );
    assert_eq!(views::DetailBinder::NAME, "binding_lifecycle::views::DetailBinder");
}

#[test]
fn test_fixtures_match_emitter_output() {
    use extrabind::emit;
    use extrabind::generate::{analyze, render};
    use extrabind::model::{source::parse_source, Program};

    fn compact(code: &str) -> String {
        code.chars().filter(|c| !c.is_whitespace()).collect()
    }

    let mut program = Program::new();
    parse_source(
        &mut program,
        &["binding_lifecycle".to_string()],
        include_str!("binding_lifecycle.rs"),
    )
    .unwrap();
    let analysis = analyze(program).unwrap();
    assert!(analysis.scan.diagnostics.is_empty());

    let files = render(&analysis.sets, "registrations.rs").unwrap();

    let expected = [
        (
            emit::module_file_name("binding_lifecycle"),
            include_str!("fixtures/binding_lifecycle.binders.rs"),
        ),
        (
            emit::module_file_name("binding_lifecycle::views"),
            include_str!("fixtures/binding_lifecycle__views.binders.rs"),
        ),
        (
            "registrations.rs".to_string(),
            include_str!("fixtures/registrations.rs"),
        ),
    ];
    assert_eq!(files.len(), expected.len());
    for (name, fixture) in expected {
        assert_eq!(compact(&files[&name]), compact(fixture), "{name} is out of date");
    }
}
