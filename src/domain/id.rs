//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Banner identifier - newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BannerId(i32);

impl BannerId {
    /// Create a new `BannerId` from its raw catalog value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for BannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for BannerId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// Reward item identifier - newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i32);

impl ItemId {
    /// Create a new `ItemId` from its raw catalog value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(BannerId::new(999).to_string(), "999");
        assert_eq!(ItemId::from(100_001).to_string(), "100001");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ItemId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: BannerId = serde_json::from_str("17").unwrap();
        assert_eq!(back.get(), 17);
    }
}
