#![forbid(unsafe_code)]

//! Nested property tree addressed by dotted keys.
//!
//! A key such as `"user.address.city"` is split on `.` and walked one segment
//! at a time with an explicit loop, so key depth is bounded only by memory.
//!
//! # Invariants
//!
//! 1. Every intermediate node on a written path is a mapping
//!    (`Value::Object`). Only the leaf may hold a non-mapping value.
//! 2. Reads never mutate. A missing segment reads as `None`. A segment that
//!    holds a leaf where a mapping was expected short-circuits: a falsy leaf
//!    (`null`, `false`, `0`, `""`) is returned as is, any other leaf reads as
//!    `None`.
//! 3. Writes create missing intermediate mappings lazily.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty key | `""` | `set` fails with [`StoreError::EmptyKey`]; `get` returns `None` |
//! | Path collision | intermediate segment holds a leaf | per [`CollisionPolicy`] |
//! | Missing key | never written | `get` returns `None` |

use serde_json::{Map, Value};

use crate::config::CollisionPolicy;
use crate::error::StoreError;

/// Separator between path segments in a dotted key.
pub const KEY_SEPARATOR: char = '.';

/// Nested mapping of path segments to JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTree {
    root: Map<String, Value>,
}

impl PropertyTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value at `key`.
    ///
    /// Descending through a falsy leaf returns that leaf, so
    /// `get("flag.x")` with `flag = false` is `Some(false)`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key.is_empty() {
            return None;
        }
        let mut segments = key.split(KEY_SEPARATOR);
        let first = segments.next()?;
        let mut node = self.root.get(first)?;
        for segment in segments {
            match node {
                Value::Object(map) => node = map.get(segment)?,
                leaf if is_falsy(leaf) => return Some(leaf),
                _ => return None,
            }
        }
        Some(node)
    }

    /// Whether a value is stored exactly at `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let mut segments = key.split(KEY_SEPARATOR);
        let Some(mut node) = segments.next().and_then(|first| self.root.get(first)) else {
            return false;
        };
        for segment in segments {
            match node.as_object().and_then(|map| map.get(segment)) {
                Some(next) => node = next,
                None => return false,
            }
        }
        true
    }

    /// Write `value` at `key`, creating intermediate mappings as needed.
    ///
    /// Returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyKey`] if `key` is empty.
    /// - [`StoreError::PathCollision`] if an intermediate segment holds a leaf
    ///   and `policy` is [`CollisionPolicy::Reject`]. The tree is unchanged.
    pub fn set(
        &mut self,
        key: &str,
        value: Value,
        policy: CollisionPolicy,
    ) -> Result<&Value, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if policy == CollisionPolicy::Reject {
            self.check_path(key)?;
        }

        let (parents, leaf) = match key.rsplit_once(KEY_SEPARATOR) {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };

        let mut node = &mut self.root;
        for segment in parents.into_iter().flat_map(|p| p.split(KEY_SEPARATOR)) {
            let slot = node
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                tracing::trace!(key, segment, "replacing leaf with mapping");
                *slot = Value::Object(Map::new());
            }
            node = slot
                .as_object_mut()
                .ok_or_else(|| collision(key, segment))?;
        }

        tracing::trace!(key, "property set");
        let slot = node.entry(leaf).or_insert(Value::Null);
        *slot = value;
        Ok(&*slot)
    }

    /// Remove and return the value at `key`. Empty parent mappings are kept.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let (parents, leaf) = match key.rsplit_once(KEY_SEPARATOR) {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        let mut node = &mut self.root;
        for segment in parents.into_iter().flat_map(|p| p.split(KEY_SEPARATOR)) {
            node = node.get_mut(segment)?.as_object_mut()?;
        }
        node.remove(leaf)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Whether the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Snapshot of the whole tree as a single JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Walk the intermediate segments of `key` without mutating, failing on
    /// the first one that holds a leaf.
    fn check_path(&self, key: &str) -> Result<(), StoreError> {
        let Some((parents, _)) = key.rsplit_once(KEY_SEPARATOR) else {
            return Ok(());
        };
        let mut node = &self.root;
        for segment in parents.split(KEY_SEPARATOR) {
            match node.get(segment) {
                None => return Ok(()),
                Some(Value::Object(map)) => node = map,
                Some(_) => return Err(collision(key, segment)),
            }
        }
        Ok(())
    }
}

/// `null`, `false`, zero, and the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn collision(key: &str, segment: &str) -> StoreError {
    StoreError::PathCollision {
        key: key.to_string(),
        segment: segment.to_string(),
    }
}
