#![forbid(unsafe_code)]

//! Store configuration.
//!
//! [`StoreConfig`] carries the binding defaults and the two explicit policies
//! the store needs: what to do when a write descends through a leaf value,
//! and whether nested fan-out for the same key is allowed.
//!
//! With the `config` feature (on by default) the config can be loaded from a
//! TOML or JSON document. Every field is optional; missing fields take their
//! default.
//!
//! ```toml
//! default_event_types = ["change", "input"]
//! default_bind_attribute = "value"
//! collision = "reject"
//! reentrancy = "suppress"
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use crate::error::StoreError;

/// Event type a binding listens for when no event types are given.
pub const DEFAULT_EVENT_TYPE: &str = "change";

/// Element field a binding reads and writes when no attribute is given.
pub const DEFAULT_BIND_ATTRIBUTE: &str = "value";

/// What a write does when an intermediate path segment holds a leaf value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CollisionPolicy {
    /// Replace the leaf with an empty mapping and keep descending.
    #[default]
    Overwrite,
    /// Fail with [`StoreError::PathCollision`](crate::StoreError::PathCollision)
    /// and leave the tree untouched.
    Reject,
}

/// How the store treats a fan-out for a key that is already being fanned out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ReentrancyPolicy {
    /// Run nested fan-out as an ordinary synchronous call. Element fields
    /// end up matching the tree; an unconditional cycle recurses.
    #[default]
    Allow,
    /// Skip the nested fan-out. The property write itself still happens, so
    /// bindings already served by the outer fan-out keep the outer value.
    Suppress,
}

/// Configuration for a [`PropertyStore`](crate::PropertyStore).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct StoreConfig {
    /// Event types used by `bind_prop` when the options name none.
    pub default_event_types: Vec<String>,
    /// Element field used by `bind_prop` when the options name none.
    pub default_bind_attribute: String,
    /// Path/leaf collision handling for writes.
    pub collision: CollisionPolicy,
    /// Nested fan-out handling.
    pub reentrancy: ReentrancyPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_event_types: vec![DEFAULT_EVENT_TYPE.to_string()],
            default_bind_attribute: DEFAULT_BIND_ATTRIBUTE.to_string(),
            collision: CollisionPolicy::default(),
            reentrancy: ReentrancyPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Set the collision policy.
    #[must_use]
    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Set the re-entrancy policy.
    #[must_use]
    pub fn with_reentrancy(mut self, reentrancy: ReentrancyPolicy) -> Self {
        self.reentrancy = reentrancy;
        self
    }

    /// Set the default event types.
    #[must_use]
    pub fn with_default_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_event_types = event_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default bind attribute.
    #[must_use]
    pub fn with_default_bind_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.default_bind_attribute = attribute.into();
        self
    }

    /// Parse a config from a TOML document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] if the document is malformed or has unknown keys.
    #[cfg(feature = "config")]
    pub fn from_toml_str(source: &str) -> Result<Self, StoreError> {
        toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Parse a config from a JSON document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] if the document is malformed or has unknown keys.
    #[cfg(feature = "config")]
    pub fn from_json_str(source: &str) -> Result<Self, StoreError> {
        serde_json::from_str(source).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a config file. `.json` files are parsed as JSON, anything else
    /// as TOML.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file cannot be read.
    /// - [`StoreError::Config`] if its contents do not parse.
    #[cfg(feature = "config")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&source)?
        } else {
            Self::from_toml_str(&source)?
        };
        tracing::debug!(path = %path.display(), ?config, "loaded store config");
        Ok(config)
    }
}
