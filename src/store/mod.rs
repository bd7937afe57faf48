//! Persistence layer with pluggable storage backends.
//!
//! Every operation runs inside one scoped transaction: the backend hands the
//! closure a [`PresenceTx`] and commits when it returns `Ok`, rolling back
//! otherwise. Transactions never outlive the call that opened them.

pub mod db;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::{Banner, BannerId, HistoryEntry, ItemId, PresenceRun, RewardEntry, RewardFlag};
use crate::error::Result;

/// Operations available inside a presence transaction.
pub trait PresenceTx {
    /// Delete every presence run. Returns count deleted.
    fn clear_runs(&mut self) -> Result<usize>;

    /// Items offered by a banner, regardless of limited flag.
    fn offered_items(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>>;

    /// Items whose run currently ends at `banner`.
    fn items_open_at(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>>;

    /// Advance the runs of `items` ending at `prev` so they end at `next`.
    /// Returns count updated.
    fn extend_runs(&mut self, items: &[ItemId], prev: BannerId, next: &Banner) -> Result<usize>;

    /// Insert new runs.
    fn insert_runs(&mut self, runs: &[PresenceRun]) -> Result<()>;

    /// All runs for the given items, ordered by start.
    fn runs_for_items(&mut self, items: &[ItemId]) -> Result<Vec<PresenceRun>>;

    /// Limited flags recorded for the given items.
    fn limited_flags(&mut self, items: &[ItemId]) -> Result<Vec<RewardFlag>>;

    /// Insert reward rows, replacing rows with the same key. Returns count written.
    fn upsert_rewards(&mut self, entries: &[RewardEntry]) -> Result<usize>;
}

/// Transactional access to presence runs and reward facts.
pub trait PresenceStore: Send + Sync {
    /// Run `f` inside one transaction.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn PresenceTx) -> Result<T>;
}

/// Append-only history log.
pub trait HistoryLog: Send + Sync {
    /// Append an entry stamped with `time` (epoch seconds).
    fn append(&self, time: i64, payload: &[u8]) -> Result<()>;

    /// Most recent entries first; `None` loads everything.
    fn recent(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>>;
}

/// A run covering exactly one banner.
pub(crate) fn single_banner_run(item_id: ItemId, banner: &Banner) -> PresenceRun {
    PresenceRun {
        item_id,
        first_banner_id: banner.id,
        last_banner_id: banner.id,
        start: banner.start,
        end: banner.end,
    }
}

pub(crate) fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
