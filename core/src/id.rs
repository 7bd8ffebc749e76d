//! Identity types for catalog entities.
//!
//! A GUID is assigned once and is immutable afterwards. Callers may submit
//! batch-local placeholders (negative numbers such as `-1`) which are replaced
//! with a persisted GUID during the batch.

use std::fmt;
use uuid::Uuid;

/// Globally unique identifier for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(String);

impl Guid {
    /// Create a Guid from a raw string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate a fresh random Guid.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a batch-local placeholder Guid (`-<seq>`).
    pub fn temporary(seq: u64) -> Self {
        Self(format!("-{}", seq))
    }

    /// Returns true if this Guid was assigned by the store (or by a foreign home)
    /// rather than being a batch-local placeholder.
    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty() && !self.0.starts_with('-')
    }

    /// Returns true if the Guid is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Guid {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Guid {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for Guid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
