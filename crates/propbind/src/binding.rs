#![forbid(unsafe_code)]

//! Binding options and binding records.
//!
//! A [`BindingRecord`] links a property key to either an element field or a
//! callback. Records are created by
//! [`PropertyStore::bind_prop`](crate::PropertyStore::bind_prop) and
//! [`PropertyStore::bind_function`](crate::PropertyStore::bind_function) and
//! are never mutated afterwards; they can only be removed.
//!
//! # Usage
//!
//! ```
//! use propbind::BindingOptions;
//!
//! let options = BindingOptions::new()
//!     .event_types(["change", "input"])
//!     .bind_attribute("checked");
//! assert_eq!(options.bind_attribute_name(), Some("checked"));
//! ```

use std::rc::Rc;

use serde_json::Value;

use crate::config::StoreConfig;
use crate::element::{ElementHandle, same_element};

/// Custom value reader for an element binding.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Callback invoked with each propagated value.
pub type Setter = Rc<dyn Fn(&Value)>;

/// Handle identifying one binding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value. Ids increase in registration order.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Options for [`PropertyStore::bind_prop`](crate::PropertyStore::bind_prop).
///
/// Unset fields fall back to the store's [`StoreConfig`].
#[derive(Clone, Default)]
pub struct BindingOptions {
    event_types: Option<Vec<String>>,
    bind_attribute: Option<String>,
    get_fn: Option<Getter>,
    set_fn: Option<Setter>,
}

impl BindingOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that trigger a re-read of the element.
    #[must_use]
    pub fn event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// Add one event type to the list.
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    /// Field read on events and written on propagation.
    #[must_use]
    pub fn bind_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.bind_attribute = Some(attribute.into());
        self
    }

    /// Read the element value through `f` instead of the bind attribute.
    #[must_use]
    pub fn get_fn(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.get_fn = Some(Rc::new(f));
        self
    }

    /// Receive propagated values through `f` instead of a field write.
    #[must_use]
    pub fn set_fn(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.set_fn = Some(Rc::new(f));
        self
    }

    /// Configured event types, if any.
    #[must_use]
    pub fn event_type_names(&self) -> Option<&[String]> {
        self.event_types.as_deref()
    }

    /// Configured bind attribute, if any.
    #[must_use]
    pub fn bind_attribute_name(&self) -> Option<&str> {
        self.bind_attribute.as_deref()
    }

    pub(crate) fn resolve(self, config: &StoreConfig) -> ResolvedOptions {
        let attribute = self
            .bind_attribute
            .unwrap_or_else(|| config.default_bind_attribute.clone());
        let event_types = self
            .event_types
            .unwrap_or_else(|| config.default_event_types.clone());
        let target = match self.set_fn {
            Some(setter) => BindingTarget::Callback(setter),
            None => BindingTarget::Field {
                attribute: attribute.clone(),
            },
        };
        ResolvedOptions {
            event_types,
            read_attribute: attribute,
            get_fn: self.get_fn,
            target,
        }
    }
}

impl std::fmt::Debug for BindingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingOptions")
            .field("event_types", &self.event_types)
            .field("bind_attribute", &self.bind_attribute)
            .field("get_fn", &self.get_fn.is_some())
            .field("set_fn", &self.set_fn.is_some())
            .finish()
    }
}

/// Options after applying store defaults.
pub(crate) struct ResolvedOptions {
    pub(crate) event_types: Vec<String>,
    pub(crate) read_attribute: String,
    pub(crate) get_fn: Option<Getter>,
    pub(crate) target: BindingTarget,
}

/// Where a propagated value goes.
#[derive(Clone)]
pub enum BindingTarget {
    /// Written into the bound element's field.
    Field {
        /// Field name.
        attribute: String,
    },
    /// Passed to a callback.
    Callback(Setter),
}

impl std::fmt::Debug for BindingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field { attribute } => f
                .debug_struct("Field")
                .field("attribute", attribute)
                .finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// A registered binding.
#[derive(Clone)]
pub struct BindingRecord {
    id: BindingId,
    element: Option<ElementHandle>,
    key: String,
    event_types: Vec<String>,
    target: BindingTarget,
}

impl BindingRecord {
    pub(crate) fn element(
        id: BindingId,
        element: ElementHandle,
        key: String,
        event_types: Vec<String>,
        target: BindingTarget,
    ) -> Self {
        Self {
            id,
            element: Some(element),
            key,
            event_types,
            target,
        }
    }

    pub(crate) fn function(id: BindingId, key: String, setter: Setter) -> Self {
        Self {
            id,
            element: None,
            key,
            event_types: Vec::new(),
            target: BindingTarget::Callback(setter),
        }
    }

    /// Record id.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Bound property key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bound element. `None` for function bindings.
    #[must_use]
    pub fn bound_element(&self) -> Option<&ElementHandle> {
        self.element.as_ref()
    }

    /// Event types the element listener was attached for.
    #[must_use]
    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    /// Propagation target.
    #[must_use]
    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    /// Whether this is a function binding (no element).
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.element.is_none()
    }

    /// Whether a change to `key` coming from `source` should reach this record.
    ///
    /// Function bindings accept every source. Element bindings reject their
    /// own element.
    #[must_use]
    pub fn accepts(&self, source: Option<&ElementHandle>, key: &str) -> bool {
        if self.key != key {
            return false;
        }
        match (&self.element, source) {
            (None, _) | (Some(_), None) => true,
            (Some(bound), Some(source)) => !same_element(bound, source),
        }
    }

    /// Deliver `value` to this record's target.
    pub(crate) fn deliver(&self, value: &Value) {
        match (&self.target, &self.element) {
            (BindingTarget::Callback(setter), _) => setter(value),
            (BindingTarget::Field { attribute }, Some(element)) => {
                element.write(attribute, value.clone());
            }
            (BindingTarget::Field { .. }, None) => {}
        }
    }
}

impl std::fmt::Debug for BindingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRecord")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("has_element", &self.element.is_some())
            .field("event_types", &self.event_types)
            .field("target", &self.target)
            .finish()
    }
}
