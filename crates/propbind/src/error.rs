#![forbid(unsafe_code)]

//! Error type shared by the property tree, the store, and config loading.

/// Errors from property store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The dotted key was the empty string.
    EmptyKey,
    /// A write tried to descend through a non-mapping value while the
    /// store runs with [`CollisionPolicy::Reject`](crate::CollisionPolicy::Reject).
    PathCollision {
        /// The full dotted key being written.
        key: String,
        /// The intermediate segment that holds a leaf value.
        segment: String,
    },
    /// A configuration document could not be parsed.
    Config(String),
    /// A configuration file could not be read.
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "property key must not be empty"),
            Self::PathCollision { key, segment } => {
                write!(
                    f,
                    "cannot write '{key}': segment '{segment}' holds a non-mapping value"
                )
            }
            Self::Config(msg) => write!(f, "invalid store config: {msg}"),
            Self::Io(msg) => write!(f, "failed to read store config: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_colliding_segment() {
        let err = StoreError::PathCollision {
            key: "user.name.first".into(),
            segment: "name".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'user.name.first'"));
        assert!(msg.contains("'name'"));
    }

    #[test]
    fn empty_key_message() {
        assert_eq!(
            StoreError::EmptyKey.to_string(),
            "property key must not be empty"
        );
    }
}
