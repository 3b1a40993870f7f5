//! Type-safe identifiers.
//!
//! Newtype wrappers keep session keys from being confused with other
//! strings flowing through the bridge (command verbs, results).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// SessionId
// ============================================================================

/// Key of one logical browser session.
///
/// Sessions are named by whoever creates them: the driver picks an id and
/// passes it on every request, or asks the bridge to generate one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID from any string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a session ID, rejecting blank input.
    #[must_use]
    pub fn try_new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Generates a fresh random session ID.
    ///
    /// Uses the simple (hyphen-free) UUID v4 form.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_try_new_rejects_blank() {
        assert!(SessionId::try_new("").is_none());
        assert!(SessionId::try_new("   ").is_none());
        assert_eq!(
            SessionId::try_new(" abc ").map(|id| id.to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_serde_transparent() {
        let id = SessionId::new("s1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"s1\"");

        let back: SessionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
