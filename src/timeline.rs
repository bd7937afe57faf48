//! Store-backed timeline service.
//!
//! Wires the indexer and composer to a storage backend. Every storage call
//! goes through the retry policy.

use std::collections::HashMap;

use tracing::debug;

use crate::composer::Composer;
use crate::config::Config;
use crate::domain::{Availability, Banner, Catalog, HistoryEntry, ItemId, RewardEntry};
use crate::error::Result;
use crate::indexer::{IndexSummary, PresenceIndexer};
use crate::retry::RetryPolicy;
use crate::store::{HistoryLog, PresenceStore};

/// What the versioned cache reads through on a miss.
pub trait TimelineSource: Send + Sync {
    /// Compose availability for `item_ids` from current presence data.
    fn availability(&self, item_ids: &[ItemId], catalog: &Catalog) -> Result<HashMap<ItemId, Vec<Availability>>>;

    /// Newest history entries first; `None` loads everything.
    fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>>;

    /// Append to the history log.
    fn push_history(&self, time: i64, payload: &[u8]) -> Result<()>;

    /// Rebuild presence runs from a banner feed.
    fn rebuild_presence(&self, banners: &[Banner]) -> Result<IndexSummary>;
}

pub struct Timeline<S> {
    store: S,
    indexer: PresenceIndexer,
    composer: Composer,
    retry: RetryPolicy,
}

impl<S> Timeline<S>
where
    S: PresenceStore + HistoryLog,
{
    pub fn new(store: S, indexer: PresenceIndexer, composer: Composer, retry: RetryPolicy) -> Self {
        Self {
            store,
            indexer,
            composer,
            retry,
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self::new(
            store,
            PresenceIndexer::new(&config.indexer, retry),
            Composer::new(&config.composer),
            retry,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn indexer(&self) -> &PresenceIndexer {
        &self.indexer
    }

    /// Record reward rows for later indexing.
    ///
    /// # Errors
    /// Returns an error if the write fails after retries.
    pub fn add_reward_entries(&self, entries: &[RewardEntry]) -> Result<usize> {
        self.indexer.add_reward_entries(&self.store, entries)
    }
}

impl<S> TimelineSource for Timeline<S>
where
    S: PresenceStore + HistoryLog,
{
    fn availability(&self, item_ids: &[ItemId], catalog: &Catalog) -> Result<HashMap<ItemId, Vec<Availability>>> {
        debug!(items = item_ids.len(), "Composing availability");
        let (runs, flags) = self.retry.run("load presence", || {
            self.store.transaction(|tx| {
                let runs = tx.runs_for_items(item_ids)?;
                let flags = tx.limited_flags(item_ids)?;
                Ok((runs, flags))
            })
        })?;
        Ok(self.composer.compose(item_ids, &runs, &flags, catalog))
    }

    fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        debug!(?limit, "Loading history");
        self.retry.run("load history", || self.store.recent(limit))
    }

    fn push_history(&self, time: i64, payload: &[u8]) -> Result<()> {
        self.retry.run("push history", || self.store.append(time, payload))
    }

    fn rebuild_presence(&self, banners: &[Banner]) -> Result<IndexSummary> {
        self.indexer.rebuild_all(&self.store, banners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BannerId;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn timeline() -> Timeline<MemoryStore> {
        Timeline::from_config(MemoryStore::new(), &Config::default())
    }

    #[test]
    fn from_config_uses_indexer_section() {
        let mut config = Config::default();
        config.indexer.banner_subkind = 3;
        let timeline = Timeline::from_config(MemoryStore::new(), &config);
        assert_eq!(timeline.indexer().filter(), crate::domain::BannerFilter::new(3, 3));
    }

    #[test]
    fn availability_reads_indexed_runs() {
        let timeline = timeline();
        let banner = Banner {
            id: BannerId::new(1),
            kind: 3,
            subkind: 1,
            start: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap(),
            name: "X".into(),
        };
        timeline
            .add_reward_entries(&[RewardEntry {
                banner_id: banner.id,
                step_num: 1,
                item_id: ItemId::new(10),
                recommend_order: 0,
                limited: true,
            }])
            .unwrap();
        timeline.rebuild_presence(std::slice::from_ref(&banner)).unwrap();

        let result = timeline
            .availability(&[ItemId::new(10)], &Catalog::new(std::slice::from_ref(&banner)))
            .unwrap();
        let windows = &result[&ItemId::new(10)];
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].name.as_deref(), Some("X"));
        assert!(windows[0].limited);
    }

    #[test]
    fn unreachable_store_is_an_error_not_an_empty_result() {
        let timeline = timeline();
        timeline.store().fail_next(5);
        let err = timeline.history(None).unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { operation: "load history", .. }));
    }
}
