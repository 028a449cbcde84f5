use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use propbind::{
    BindingOptions, Element, ElementHandle, EventHandler, MemoryElement, PropertyStore,
    ReentrancyPolicy, StoreConfig, Value,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn element(value: impl Into<Value>) -> (Rc<MemoryElement>, ElementHandle) {
    let concrete = MemoryElement::with_field("value", value).into_handle();
    let handle: ElementHandle = concrete.clone();
    (concrete, handle)
}

/// Host element that fires `change` whenever a field is written, the way some
/// widget toolkits echo programmatic edits.
#[derive(Default)]
struct EchoElement {
    fields: RefCell<HashMap<String, Value>>,
    listeners: RefCell<Vec<EventHandler>>,
    writes: Cell<usize>,
}

impl Element for EchoElement {
    fn read(&self, attribute: &str) -> Value {
        self.fields
            .borrow()
            .get(attribute)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn write(&self, attribute: &str, value: Value) {
        self.writes.set(self.writes.get() + 1);
        self.fields
            .borrow_mut()
            .insert(attribute.to_string(), value);
        let handlers: Vec<EventHandler> = self.listeners.borrow().clone();
        for handler in handlers {
            handler();
        }
    }

    fn add_listener(&self, event_type: &str, handler: EventHandler) {
        if event_type == "change" {
            self.listeners.borrow_mut().push(handler);
        }
    }
}

/// Headless element that counts the writes the store makes to it.
struct CountingElement {
    inner: MemoryElement,
    writes: Cell<usize>,
}

impl CountingElement {
    fn new(value: impl Into<Value>) -> Rc<Self> {
        Rc::new(Self {
            inner: MemoryElement::with_field("value", value),
            writes: Cell::new(0),
        })
    }
}

impl Element for CountingElement {
    fn read(&self, attribute: &str) -> Value {
        self.inner.read(attribute)
    }

    fn write(&self, attribute: &str, value: Value) {
        self.writes.set(self.writes.get() + 1);
        self.inner.write(attribute, value);
    }

    fn add_listener(&self, event_type: &str, handler: EventHandler) {
        self.inner.add_listener(event_type, handler);
    }
}

#[test]
fn nested_set_and_get() {
    let store = PropertyStore::new();
    store.set_prop("user.name", "Alice").unwrap();
    assert_eq!(store.get_prop("user.name"), Some(json!("Alice")));
    assert_eq!(store.get_prop("user.age"), None);
}

#[test]
fn bind_prop_reads_initial_element_value() {
    let store = PropertyStore::new();
    let (_e, handle) = element(5);
    store
        .bind_prop(&handle, "count", BindingOptions::new())
        .unwrap();
    assert_eq!(store.get_prop("count"), Some(json!(5)));
}

#[test]
fn bound_function_fires_once_for_sourceless_update() {
    let store = PropertyStore::new();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    store.bind_function("count", move |v| sink.borrow_mut().push(v.clone()));

    store.update_prop(None, "count", 10).unwrap();
    assert_eq!(*calls.borrow(), vec![json!(10)]);
}

#[test]
fn change_event_propagates_to_other_element_only() {
    init_tracing();
    let store = PropertyStore::new();
    let e1 = CountingElement::new("");
    let e2 = CountingElement::new("");
    let h1: ElementHandle = e1.clone();
    let h2: ElementHandle = e2.clone();
    store.bind_prop(&h1, "shared", BindingOptions::new()).unwrap();
    store.bind_prop(&h2, "shared", BindingOptions::new()).unwrap();

    let e1_before = e1.writes.get();
    let e2_before = e2.writes.get();
    e1.inner.input("value", "foo", "change");

    assert_eq!(e1.writes.get(), e1_before, "source element must not be written");
    assert_eq!(e2.writes.get(), e2_before + 1);
    assert_eq!(e2.inner.field("value"), Some(json!("foo")));
    assert_eq!(e1.inner.field("value"), Some(json!("foo")));
    assert_eq!(store.get_prop("shared"), Some(json!("foo")));
}

#[test]
fn self_exclusion_skips_source_element() {
    let store = PropertyStore::new();
    let (e1, h1) = element("original");
    store.bind_prop(&h1, "x", BindingOptions::new()).unwrap();

    store.update_prop(Some(&h1), "x", "from-a").unwrap();
    assert_eq!(e1.field("value"), Some(json!("original")));
    assert_eq!(store.get_prop("x"), Some(json!("from-a")));
}

#[test]
fn notifications_follow_registration_order() {
    let store = PropertyStore::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["b1", "b2", "b3"] {
        let order = Rc::clone(&order);
        store.bind_function("x", move |_| order.borrow_mut().push(name));
    }
    let (_unrelated, source) = element(0);
    store.update_prop(Some(&source), "x", 1).unwrap();
    assert_eq!(*order.borrow(), vec!["b1", "b2", "b3"]);
}

#[test]
fn mixed_bindings_keep_order() {
    let store = PropertyStore::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = Rc::clone(&order);
    store.bind_function("x", move |_| o.borrow_mut().push("fn-1".to_string()));

    let o = Rc::clone(&order);
    let (_e, h) = element(0);
    store
        .bind_prop(
            &h,
            "x",
            BindingOptions::new().set_fn(move |_| o.borrow_mut().push("el-2".to_string())),
        )
        .unwrap();

    let o = Rc::clone(&order);
    store.bind_function("x", move |_| o.borrow_mut().push("fn-3".to_string()));

    order.borrow_mut().clear();
    store.update_prop(None, "x", 1).unwrap();
    assert_eq!(*order.borrow(), vec!["fn-1", "el-2", "fn-3"]);
}

#[test]
fn function_bindings_fire_for_element_sources() {
    let store = PropertyStore::new();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    store.bind_function("v", move |_| h.set(h.get() + 1));

    let (e, handle) = element(1);
    store.bind_prop(&handle, "v", BindingOptions::new()).unwrap();
    assert_eq!(hits.get(), 1, "initial sync reaches the function");

    e.input("value", 2, "change");
    assert_eq!(hits.get(), 2);
}

#[test]
fn suppress_policy_stops_echoing_elements_from_looping() {
    init_tracing();
    let store = PropertyStore::with_config(
        StoreConfig::default().with_reentrancy(ReentrancyPolicy::Suppress),
    );
    let a = Rc::new(EchoElement::default());
    let b = Rc::new(EchoElement::default());
    let ha: ElementHandle = a.clone();
    let hb: ElementHandle = b.clone();
    store.bind_prop(&ha, "loop", BindingOptions::new()).unwrap();
    store.bind_prop(&hb, "loop", BindingOptions::new()).unwrap();

    store.update_prop(None, "loop", "ping").unwrap();
    assert_eq!(a.read("value"), json!("ping"));
    assert_eq!(b.read("value"), json!("ping"));
    assert_eq!(store.get_prop("loop"), Some(json!("ping")));
    assert!(a.writes.get() <= 2 && b.writes.get() <= 2);
}

#[test]
fn nested_update_of_another_key_fans_out() {
    let store = PropertyStore::new();
    let s = store.clone();
    store.bind_function("celsius", move |v| {
        let c = v.as_f64().unwrap_or(0.0);
        s.update_prop(None, "fahrenheit", c * 9.0 / 5.0 + 32.0).unwrap();
    });
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    store.bind_function("fahrenheit", move |v| l.borrow_mut().push(v.clone()));

    store.update_prop(None, "celsius", 100.0).unwrap();
    assert_eq!(store.get_prop("fahrenheit"), Some(json!(212.0)));
    assert_eq!(*log.borrow(), vec![json!(212.0)]);
}

#[test]
fn clamping_callback_settles_by_default() {
    let store = PropertyStore::new();
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let s = store.clone();
    store.bind_function("clamped", move |v| {
        c.set(c.get() + 1);
        let n = v.as_i64().unwrap_or(0);
        if n > 10 {
            s.update_prop(None, "clamped", 10).unwrap();
        }
    });

    store.update_prop(None, "clamped", 42).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(store.get_prop("clamped"), Some(json!(10)));
}

#[test]
fn bound_element_matches_store_after_clamping_callback() {
    init_tracing();
    let store = PropertyStore::new();
    let e = CountingElement::new(0);
    let h: ElementHandle = e.clone();
    store.bind_prop(&h, "x", BindingOptions::new()).unwrap();
    let s = store.clone();
    store.bind_function("x", move |v| {
        if v.as_i64().unwrap_or(0) > 10 {
            s.update_prop(None, "x", 10).unwrap();
        }
    });

    store.update_prop(None, "x", 42).unwrap();
    assert_eq!(e.inner.field("value"), Some(json!(10)));
    assert_eq!(e.inner.field("value"), store.get_prop("x"));
}

#[test]
fn store_config_from_toml_drives_defaults() {
    let config = StoreConfig::from_toml_str(
        r#"
        default_event_types = ["input"]
        default_bind_attribute = "text"
        "#,
    )
    .unwrap();
    let store = PropertyStore::with_config(config);

    let field = MemoryElement::with_field("text", "hello").into_handle();
    let handle: ElementHandle = field.clone();
    store
        .bind_prop(&handle, "greeting", BindingOptions::new())
        .unwrap();
    assert_eq!(store.get_prop("greeting"), Some(json!("hello")));
    assert_eq!(field.listener_count("input"), 1);
    assert_eq!(field.listener_count("change"), 0);

    field.input("text", "bye", "input");
    assert_eq!(store.get_prop("greeting"), Some(json!("bye")));
}

#[test]
fn dropped_element_does_not_break_store() {
    let store = PropertyStore::new();
    let (e, h) = element("a");
    let id = store.bind_prop(&h, "k", BindingOptions::new()).unwrap();
    drop(h);
    drop(e);
    // The record still owns the element.
    store.update_prop(None, "k", "b").unwrap();
    assert!(store.is_bound(id));
    assert!(store.unbind(id));
}
