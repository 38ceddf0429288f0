use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an item identifier is blank.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemIdError {
    #[error("item id cannot be empty")]
    Empty,
}

/// Unique identifier for a `ReviewItem`.
///
/// Identifiers are opaque, non-empty strings. Surrounding whitespace is
/// trimmed so ids typed on the command line match persisted ones.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new `ItemId`.
    ///
    /// # Errors
    ///
    /// Returns `ItemIdError::Empty` if the value is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ItemIdError> {
        let raw = id.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ItemIdError::Empty);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ItemIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_display() {
        let id = ItemId::new("vocab-42").unwrap();
        assert_eq!(id.to_string(), "vocab-42");
    }

    #[test]
    fn test_item_id_trims_whitespace() {
        let id: ItemId = "  apple ".parse().unwrap();
        assert_eq!(id.as_str(), "apple");
    }

    #[test]
    fn test_item_id_rejects_blank() {
        assert_eq!(ItemId::new("   ").unwrap_err(), ItemIdError::Empty);
        assert!("".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(ItemId::generate(), ItemId::generate());
    }

    #[test]
    fn test_item_id_roundtrip() {
        let original = ItemId::new("kanji-日").unwrap();
        let serialized = String::from(original.clone());
        let deserialized = ItemId::try_from(serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
