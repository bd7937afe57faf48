//! Presence runs and reward membership facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BannerId, ItemId};

/// A contiguous span across adjacent banners during which an item stayed
/// obtainable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PresenceRun {
    pub item_id: ItemId,
    pub first_banner_id: BannerId,
    pub last_banner_id: BannerId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Whether an item was offered as limited on a given banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardFlag {
    pub banner_id: BannerId,
    pub item_id: ItemId,
    pub limited: bool,
}

/// A reward row as ingested from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub banner_id: BannerId,
    pub step_num: i32,
    pub item_id: ItemId,
    pub recommend_order: i32,
    pub limited: bool,
}

impl RewardEntry {
    #[must_use]
    pub fn flag(&self) -> RewardFlag {
        RewardFlag {
            banner_id: self.banner_id,
            item_id: self.item_id,
            limited: self.limited,
        }
    }
}
