#![forbid(unsafe_code)]

//! Element capability required by the store.
//!
//! The host UI toolkit supplies elements. The store only needs three things
//! from one: read a named field, write a named field, and attach a listener
//! for a named event. Listeners cannot be detached.
//!
//! Elements are shared as [`ElementHandle`] (`Rc<dyn Element>`). Two handles
//! refer to the same element only when they point at the same allocation;
//! see [`same_element`].
//!
//! [`MemoryElement`] is a headless implementation with a field map and
//! listener lists, for hosts without a real widget layer and for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

/// Callback attached to an element event.
pub type EventHandler = Rc<dyn Fn()>;

/// Shared handle to a host element.
pub type ElementHandle = Rc<dyn Element>;

/// A UI element the store can bind to.
///
/// All methods take `&self`; implementations use interior mutability the
/// way host widgets usually do.
pub trait Element {
    /// Read the field named `attribute`. Unknown fields read as `Value::Null`.
    fn read(&self, attribute: &str) -> Value;

    /// Write `value` into the field named `attribute`.
    fn write(&self, attribute: &str, value: Value);

    /// Attach `handler` to every future firing of `event_type`.
    fn add_listener(&self, event_type: &str, handler: EventHandler);
}

/// Identity comparison of two element handles.
///
/// Compares allocation addresses only, ignoring vtable pointers, so two
/// handles created through different trait-object coercions of the same
/// `Rc` still compare equal.
#[must_use]
pub fn same_element(a: &ElementHandle, b: &ElementHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// In-memory element with named fields and event listeners.
///
/// Writing a field never fires events; call [`fire`](Self::fire) to
/// simulate user interaction.
#[derive(Default)]
pub struct MemoryElement {
    fields: RefCell<HashMap<String, Value>>,
    listeners: RefCell<HashMap<String, Vec<EventHandler>>>,
}

impl MemoryElement {
    /// Create an element with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an element whose `attribute` field starts at `value`.
    #[must_use]
    pub fn with_field(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        let element = Self::new();
        element.set_field(attribute, value);
        element
    }

    /// Wrap this element in a shared handle.
    #[must_use]
    pub fn into_handle(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Current value of `attribute`, if it was ever set.
    #[must_use]
    pub fn field(&self, attribute: &str) -> Option<Value> {
        self.fields.borrow().get(attribute).cloned()
    }

    /// Set `attribute` without firing any event.
    pub fn set_field(&self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.fields
            .borrow_mut()
            .insert(attribute.into(), value.into());
    }

    /// Set `attribute` and then fire `event_type`, like a user edit.
    pub fn input(&self, attribute: &str, value: impl Into<Value>, event_type: &str) {
        self.set_field(attribute, value);
        self.fire(event_type);
    }

    /// Invoke every listener attached to `event_type`, in attach order.
    ///
    /// Returns the number of listeners invoked.
    pub fn fire(&self, event_type: &str) -> usize {
        // Clone out so listeners may attach more listeners or write fields.
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    /// Number of listeners attached to `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .borrow()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Element for MemoryElement {
    fn read(&self, attribute: &str) -> Value {
        self.field(attribute).unwrap_or(Value::Null)
    }

    fn write(&self, attribute: &str, value: Value) {
        self.fields
            .borrow_mut()
            .insert(attribute.to_string(), value);
    }

    fn add_listener(&self, event_type: &str, handler: EventHandler) {
        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}

impl std::fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listener_count: usize = self.listeners.borrow().values().map(Vec::len).sum();
        f.debug_struct("MemoryElement")
            .field("fields", &self.fields.borrow())
            .field("listener_count", &listener_count)
            .finish()
    }
}
