//! In-memory store implementation for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::{HistoryLog, PresenceStore, PresenceTx};
use crate::domain::{Banner, BannerId, HistoryEntry, ItemId, PresenceRun, RewardEntry, RewardFlag};
use crate::error::{Result, StorageError};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    rewards: BTreeMap<(BannerId, ItemId, bool), RewardEntry>,
    runs: Vec<PresenceRun>,
    history: Vec<HistoryEntry>,
}

/// In-memory store for testing purposes.
///
/// Transactions work on a copy of the state that replaces the original only
/// when the closure succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    busy_failures: AtomicU32,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail with a transient busy error.
    pub fn fail_next(&self, n: u32) {
        self.busy_failures.store(n, Ordering::SeqCst);
    }

    fn check_busy(&self) -> Result<()> {
        let injected = self
            .busy_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StorageError::Busy("injected failure".into()).into());
        }
        Ok(())
    }
}

impl PresenceTx for MemoryState {
    fn clear_runs(&mut self) -> Result<usize> {
        let deleted = self.runs.len();
        self.runs.clear();
        Ok(deleted)
    }

    fn offered_items(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>> {
        Ok(self
            .rewards
            .values()
            .filter(|r| r.banner_id == banner)
            .map(|r| r.item_id)
            .collect())
    }

    fn items_open_at(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>> {
        Ok(self
            .runs
            .iter()
            .filter(|r| r.last_banner_id == banner)
            .map(|r| r.item_id)
            .collect())
    }

    fn extend_runs(&mut self, items: &[ItemId], prev: BannerId, next: &Banner) -> Result<usize> {
        let mut updated = 0;
        for run in &mut self.runs {
            if run.last_banner_id == prev && items.contains(&run.item_id) {
                run.last_banner_id = next.id;
                run.end = next.end;
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn insert_runs(&mut self, runs: &[PresenceRun]) -> Result<()> {
        self.runs.extend_from_slice(runs);
        Ok(())
    }

    fn runs_for_items(&mut self, items: &[ItemId]) -> Result<Vec<PresenceRun>> {
        let mut runs: Vec<PresenceRun> = self
            .runs
            .iter()
            .filter(|r| items.contains(&r.item_id))
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.start);
        Ok(runs)
    }

    fn limited_flags(&mut self, items: &[ItemId]) -> Result<Vec<RewardFlag>> {
        Ok(self
            .rewards
            .values()
            .filter(|r| r.limited && items.contains(&r.item_id))
            .map(RewardEntry::flag)
            .collect())
    }

    fn upsert_rewards(&mut self, entries: &[RewardEntry]) -> Result<usize> {
        for entry in entries {
            self.rewards
                .insert((entry.banner_id, entry.item_id, entry.limited), entry.clone());
        }
        Ok(entries.len())
    }
}

impl PresenceStore for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn PresenceTx) -> Result<T>,
    {
        self.check_busy()?;
        let mut state = self.state.lock();
        let mut draft = state.clone();
        let value = f(&mut draft)?;
        *state = draft;
        Ok(value)
    }
}

impl HistoryLog for MemoryStore {
    fn append(&self, time: i64, payload: &[u8]) -> Result<()> {
        self.check_busy()?;
        let mut state = self.state.lock();
        let id = i32::try_from(state.history.len() + 1).unwrap_or(i32::MAX);
        state.history.push(HistoryEntry {
            id,
            time,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn recent(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        self.check_busy()?;
        let mut entries = self.state.lock().history.clone();
        entries.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
        if let Some(n) = limit {
            entries.truncate(n);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn injected_failures_are_transient_and_counted() {
        let store = MemoryStore::new();
        store.fail_next(2);

        let first = store.recent(None).unwrap_err();
        assert!(first.is_transient());
        assert!(store.recent(None).is_err());
        assert!(store.recent(None).unwrap().is_empty());
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let store = MemoryStore::new();
        let entry = RewardEntry {
            banner_id: BannerId::new(1),
            step_num: 1,
            item_id: ItemId::new(10),
            recommend_order: 0,
            limited: false,
        };

        let result: Result<()> = store.transaction(|tx| {
            tx.upsert_rewards(std::slice::from_ref(&entry))?;
            Err(Error::Storage(StorageError::Database("forced".into())))
        });
        assert!(result.is_err());

        let offered = store.transaction(|tx| tx.offered_items(BannerId::new(1))).unwrap();
        assert!(offered.is_empty());
    }
}
