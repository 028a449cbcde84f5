#![forbid(unsafe_code)]

//! The property store: a nested property tree plus an ordered binding list.
//!
//! # Architecture
//!
//! `PropertyStore` is a cheap `Clone` handle over `Rc<RefCell<..>>`, shared
//! between the host and every element listener the store attaches.
//! Listeners hold `Weak` references to both the store and their element, so
//! an element that owns its listeners keeps neither alive.
//!
//! A change flows in one direction:
//!
//! ```text
//! element event ─► update_prop ─► tree write ─► update ─► bindings (in order)
//! ```
//!
//! # Invariants
//!
//! 1. Bindings are notified in registration order.
//! 2. An element binding is never notified of a change its own element
//!    produced. Function bindings are notified of every change.
//! 3. Fan-out works on a snapshot of matching bindings taken before the first
//!    delivery, with no borrow held, so callbacks may call back into the store.
//! 4. Under the default [`ReentrancyPolicy::Allow`] a nested update runs its
//!    own fan-out, so bound element fields match the tree once the outermost
//!    call returns. Under [`ReentrancyPolicy::Suppress`] a key is fanned out at
//!    most once at a time; nested fan-out for it is skipped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty key | `""` passed to a write | [`StoreError::EmptyKey`] |
//! | Path collision | write through a leaf with `Reject` | [`StoreError::PathCollision`], no fan-out |
//! | No matching bindings | nothing bound to the key | `update` is a no-op |
//! | Listener fires after store dropped | element outlives store | listener is a no-op |
//! | Callback panic | user code | propagates to the caller of `update` |

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::binding::{BindingId, BindingOptions, BindingRecord, Getter};
use crate::config::{ReentrancyPolicy, StoreConfig};
use crate::element::{Element, ElementHandle, same_element};
use crate::error::StoreError;
use crate::tree::PropertyTree;

struct StoreInner {
    tree: PropertyTree,
    bindings: Vec<BindingRecord>,
    next_id: u64,
    notifying: HashSet<String>,
    config: StoreConfig,
}

/// Nested key-value property bag with two-way element bindings.
///
/// # Example
///
/// ```
/// use propbind::{BindingOptions, ElementHandle, MemoryElement, PropertyStore};
///
/// let store = PropertyStore::new();
///
/// let input = MemoryElement::with_field("value", "Alice").into_handle();
/// let label = MemoryElement::new().into_handle();
/// let input_handle: ElementHandle = input.clone();
/// let label_handle: ElementHandle = label.clone();
///
/// // Binding syncs element -> store, so bind the empty label first.
/// store
///     .bind_prop(&label_handle, "user.name", BindingOptions::new().bind_attribute("text"))
///     .unwrap();
/// store.bind_prop(&input_handle, "user.name", BindingOptions::new()).unwrap();
/// assert_eq!(store.get_prop("user.name"), Some("Alice".into()));
/// assert_eq!(label.field("text"), Some("Alice".into()));
///
/// input.input("value", "Bob", "change");
/// assert_eq!(label.field("text"), Some("Bob".into()));
/// assert_eq!(store.get_prop("user.name"), Some("Bob".into()));
/// ```
#[derive(Clone)]
pub struct PropertyStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl PropertyStore {
    /// Create an empty store with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with `config`.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                tree: PropertyTree::new(),
                bindings: Vec::new(),
                next_id: 0,
                notifying: HashSet::new(),
                config,
            })),
        }
    }

    /// The store's config.
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config.clone()
    }

    // -----------------------------------------------------------------------
    // Property tree
    // -----------------------------------------------------------------------

    /// Write `value` at the dotted `key`, creating intermediate mappings.
    ///
    /// Does not notify bindings; see [`update_prop`](Self::update_prop).
    /// Returns the stored value.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyKey`] if `key` is empty.
    /// - [`StoreError::PathCollision`] if the path runs through a leaf and the
    ///   store uses [`CollisionPolicy::Reject`](crate::CollisionPolicy::Reject).
    pub fn set_prop(&self, key: &str, value: impl Into<Value>) -> Result<Value, StoreError> {
        let mut inner = self.inner.borrow_mut();
        let policy = inner.config.collision;
        inner.tree.set(key, value.into(), policy).cloned()
    }

    /// Read the value at the dotted `key`. `None` if it was never written or
    /// the path runs through a truthy leaf. A path through a falsy leaf
    /// (`null`, `false`, `0`, `""`) yields that leaf.
    #[must_use]
    pub fn get_prop(&self, key: &str) -> Option<Value> {
        self.inner.borrow().tree.get(key).cloned()
    }

    /// Borrow the value at `key` without cloning it.
    ///
    /// `f` must not write to the store.
    pub fn with_prop<R>(&self, key: &str, f: impl FnOnce(Option<&Value>) -> R) -> R {
        f(self.inner.borrow().tree.get(key))
    }

    /// Whether a value is stored at `key`.
    #[must_use]
    pub fn contains_prop(&self, key: &str) -> bool {
        self.inner.borrow().tree.contains(key)
    }

    /// Remove the value at `key` without notifying bindings.
    pub fn remove_prop(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().tree.remove(key)
    }

    /// Snapshot of the whole property tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.inner.borrow().tree.to_value()
    }

    // -----------------------------------------------------------------------
    // Change propagation
    // -----------------------------------------------------------------------

    /// Write `value` at `key`, then notify every binding on `key` except
    /// those bound to `source`.
    ///
    /// # Errors
    ///
    /// Same as [`set_prop`](Self::set_prop). Nothing is notified on error.
    pub fn update_prop(
        &self,
        source: Option<&ElementHandle>,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), StoreError> {
        let value = self.set_prop(key, value)?;
        self.update(source, key, &value);
        Ok(())
    }

    /// Notify every binding on `key` of `value`, in registration order.
    ///
    /// Element bindings on `source` are skipped. Function bindings always
    /// fire. The property tree is not touched.
    pub fn update(&self, source: Option<&ElementHandle>, key: &str, value: &Value) {
        let (targets, _guard) = {
            let mut inner = self.inner.borrow_mut();
            let guard = match inner.config.reentrancy {
                ReentrancyPolicy::Suppress => {
                    if !inner.notifying.insert(key.to_string()) {
                        tracing::debug!(key, "suppressed re-entrant fan-out");
                        return;
                    }
                    Some(NotifyGuard {
                        inner: Rc::clone(&self.inner),
                        key: key.to_string(),
                    })
                }
                ReentrancyPolicy::Allow => None,
            };
            let targets: Vec<BindingRecord> = inner
                .bindings
                .iter()
                .filter(|record| record.accepts(source, key))
                .cloned()
                .collect();
            (targets, guard)
        };

        let _span = tracing::debug_span!(
            "fan_out",
            key,
            targets = targets.len(),
            from_element = source.is_some()
        )
        .entered();

        for record in &targets {
            record.deliver(value);
        }
    }

    // -----------------------------------------------------------------------
    // Binding registration
    // -----------------------------------------------------------------------

    /// Bind `element` to `key` in both directions.
    ///
    /// The element's current value is read immediately, written at `key`, and
    /// propagated to the other bindings on `key`. Afterwards every configured
    /// event re-reads the element and repeats that write-and-propagate, and
    /// changes from elsewhere are written into the element.
    ///
    /// # Errors
    ///
    /// Same as [`set_prop`](Self::set_prop), raised by the initial sync. On
    /// error nothing is registered and no listener is attached.
    pub fn bind_prop(
        &self,
        element: &ElementHandle,
        key: &str,
        options: BindingOptions,
    ) -> Result<BindingId, StoreError> {
        let resolved = options.resolve(&self.inner.borrow().config);
        let reader = element_reader(element, resolved.read_attribute, resolved.get_fn);

        self.update_prop(Some(element), key, reader())?;

        // Record first, listeners second: a host that fires synchronously
        // inside `add_listener` must find the binding already registered.
        let id = self.register(|id| {
            BindingRecord::element(
                id,
                Rc::clone(element),
                key.to_string(),
                resolved.event_types.clone(),
                resolved.target,
            )
        });

        for event_type in &resolved.event_types {
            let store = Rc::downgrade(&self.inner);
            let weak_element = Rc::downgrade(element);
            let reader = Rc::clone(&reader);
            let key = key.to_string();
            element.add_listener(
                event_type,
                Rc::new(move || on_element_event(&store, &weak_element, id, &key, &reader)),
            );
        }

        tracing::debug!(
            id = id.get(),
            key,
            event_types = ?resolved.event_types,
            "bound element"
        );
        Ok(id)
    }

    /// Bind `set_function` to `key`.
    ///
    /// It is not called now; it runs on every later change to `key` from any
    /// source, including changes with no source element.
    pub fn bind_function(&self, key: &str, set_function: impl Fn(&Value) + 'static) -> BindingId {
        let setter = Rc::new(set_function);
        let id = self.register(|id| BindingRecord::function(id, key.to_string(), setter));
        tracing::debug!(id = id.get(), key, "bound function");
        id
    }

    /// Remove the binding `id`. Its element listeners stay attached but do
    /// nothing from now on.
    ///
    /// Returns `false` if `id` was not bound.
    pub fn unbind(&self, id: BindingId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.bindings.len();
        inner.bindings.retain(|record| record.id() != id);
        let removed = inner.bindings.len() != before;
        if removed {
            tracing::debug!(id = id.get(), "unbound");
        }
        removed
    }

    /// Remove every binding of `element` on `key`.
    ///
    /// Returns the number of bindings removed.
    pub fn unbind_element(&self, element: &ElementHandle, key: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.bindings.len();
        inner.bindings.retain(|record| {
            record.key() != key
                || !record
                    .bound_element()
                    .is_some_and(|bound| same_element(bound, element))
        });
        let removed = before - inner.bindings.len();
        tracing::debug!(key, removed, "unbound element");
        removed
    }

    /// Whether `id` is still bound.
    #[must_use]
    pub fn is_bound(&self, id: BindingId) -> bool {
        self.inner
            .borrow()
            .bindings
            .iter()
            .any(|record| record.id() == id)
    }

    /// Total number of bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.borrow().bindings.len()
    }

    /// Ids of the bindings on `key`, in registration order.
    #[must_use]
    pub fn bindings_for(&self, key: &str) -> Vec<BindingId> {
        self.inner
            .borrow()
            .bindings
            .iter()
            .filter(|record| record.key() == key)
            .map(BindingRecord::id)
            .collect()
    }

    /// Copy of the binding record `id`.
    #[must_use]
    pub fn binding(&self, id: BindingId) -> Option<BindingRecord> {
        self.inner
            .borrow()
            .bindings
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    fn register(&self, make: impl FnOnce(BindingId) -> BindingRecord) -> BindingId {
        let mut inner = self.inner.borrow_mut();
        let id = BindingId::new(inner.next_id);
        inner.next_id += 1;
        inner.bindings.push(make(id));
        id
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PropertyStore")
            .field("top_level_keys", &inner.tree.len())
            .field("binding_count", &inner.bindings.len())
            .field("config", &inner.config)
            .finish()
    }
}

/// Clears a key's in-progress marker when fan-out ends, including on unwind.
struct NotifyGuard {
    inner: Rc<RefCell<StoreInner>>,
    key: String,
}

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.notifying.remove(&self.key);
        }
    }
}

/// Build the value reader for an element binding. A custom getter wins over
/// the bind attribute.
fn element_reader(element: &ElementHandle, attribute: String, get_fn: Option<Getter>) -> Getter {
    if let Some(get_fn) = get_fn {
        return get_fn;
    }
    let element: Weak<dyn Element> = Rc::downgrade(element);
    Rc::new(move || {
        element
            .upgrade()
            .map_or(Value::Null, |element| element.read(&attribute))
    })
}

fn on_element_event(
    store: &Weak<RefCell<StoreInner>>,
    element: &Weak<dyn Element>,
    id: BindingId,
    key: &str,
    reader: &Getter,
) {
    let (Some(inner), Some(element)) = (store.upgrade(), element.upgrade()) else {
        return;
    };
    let store = PropertyStore { inner };
    if !store.is_bound(id) {
        tracing::trace!(id = id.get(), key, "event on unbound binding ignored");
        return;
    }
    if let Err(err) = store.update_prop(Some(&element), key, reader()) {
        tracing::warn!(id = id.get(), key, %err, "element update rejected");
    }
}
