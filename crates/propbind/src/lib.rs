#![forbid(unsafe_code)]

//! Two-way property bindings for UI elements.
//!
//! A [`PropertyStore`] holds a nested property bag addressed by dotted keys
//! (`"user.address.city"`) and an ordered list of bindings. UI elements write
//! into the store when their events fire; the store then pushes the new value
//! out to every other element or callback bound to the same key.
//!
//! - [`PropertyStore`]: the store handle (`Clone`, single-threaded).
//! - [`Element`]: the capability a host element provides (read field, write
//!   field, attach listener). [`MemoryElement`] is an in-memory implementation.
//! - [`BindingOptions`]: per-binding event types, field name, and custom
//!   read/write functions.
//! - [`StoreConfig`]: binding defaults plus the path-collision and
//!   re-entrancy policies, loadable from TOML/JSON with the `config` feature.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use propbind::PropertyStore;
//!
//! let store = PropertyStore::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! store.bind_function("count", move |v| sink.borrow_mut().push(v.clone()));
//!
//! store.update_prop(None, "count", 10).unwrap();
//! assert_eq!(*seen.borrow(), vec![serde_json::json!(10)]);
//! assert_eq!(store.get_prop("count"), Some(10.into()));
//! ```

pub mod binding;
pub mod config;
pub mod element;
pub mod error;
pub mod store;
pub mod tree;

pub use binding::{BindingId, BindingOptions, BindingRecord, BindingTarget, Getter, Setter};
pub use config::{CollisionPolicy, ReentrancyPolicy, StoreConfig};
pub use element::{Element, ElementHandle, EventHandler, MemoryElement, same_element};
pub use error::StoreError;
pub use serde_json::Value;
pub use store::PropertyStore;
pub use tree::PropertyTree;
