//! Versioned cache over a [`TimelineSource`].
//!
//! Holds composed availability per item and a window of the history log.
//! Both are dropped together whenever the caller presents a data version
//! different from the last one seen. The version check and the
//! read-or-populate step run under one lock, so concurrent callers cannot
//! interleave between them.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::domain::{Availability, Banner, Catalog, HistoryEntry, ItemId};
use crate::error::Result;
use crate::indexer::IndexSummary;
use crate::timeline::TimelineSource;

#[derive(Debug, Default)]
struct HistoryCache {
    entries: Vec<HistoryEntry>,
    /// Set once an unbounded fetch has been cached.
    fully_loaded: bool,
}

#[derive(Debug)]
struct CacheState<V> {
    version: Option<V>,
    availability: HashMap<ItemId, Vec<Availability>>,
    history: HistoryCache,
}

impl<V: PartialEq + Clone + std::fmt::Debug> CacheState<V> {
    fn check_version(&mut self, version: &V) -> bool {
        if self.version.as_ref() == Some(version) {
            return false;
        }
        info!(previous = ?self.version, current = ?version, "Data version changed, dropping caches");
        self.availability.clear();
        self.history = HistoryCache::default();
        self.version = Some(version.clone());
        true
    }
}

pub struct VersionedCache<S, V> {
    source: S,
    enabled: bool,
    state: Mutex<CacheState<V>>,
}

impl<S, V> VersionedCache<S, V>
where
    S: TimelineSource,
    V: PartialEq + Clone + std::fmt::Debug,
{
    pub fn new(source: S, config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Caching disabled");
        }
        Self {
            source,
            enabled: config.enabled,
            state: Mutex::new(CacheState {
                version: None,
                availability: HashMap::new(),
                history: HistoryCache::default(),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all cached data if `version` differs from the last one seen.
    /// Returns whether anything was invalidated.
    pub fn check_version(&self, version: &V) -> bool {
        self.state.lock().check_version(version)
    }

    /// Availability for `item_ids`, composing only the items not cached yet.
    ///
    /// # Errors
    /// Returns an error if composing the misses fails; nothing is cached then.
    pub fn availability(
        &self,
        version: &V,
        item_ids: &[ItemId],
        catalog: &Catalog,
    ) -> Result<HashMap<ItemId, Vec<Availability>>> {
        let mut state = self.state.lock();
        state.check_version(version);

        if !self.enabled {
            return self.source.availability(item_ids, catalog);
        }

        let mut result = HashMap::with_capacity(item_ids.len());
        let mut misses = Vec::new();
        for id in item_ids {
            match state.availability.get(id) {
                Some(windows) => {
                    result.insert(*id, windows.clone());
                }
                None => misses.push(*id),
            }
        }
        debug!(hits = result.len(), misses = misses.len(), "Availability cache lookup");

        if !misses.is_empty() {
            let fetched = self.source.availability(&misses, catalog)?;
            for (id, windows) in fetched {
                state.availability.insert(id, windows.clone());
                result.insert(id, windows);
            }
        }
        Ok(result)
    }

    /// Newest history entries first. `None` or `Some(0)` means all of them.
    ///
    /// # Errors
    /// Returns an error if a fetch is needed and fails.
    pub fn history(&self, version: &V, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let limit = limit.filter(|n| *n > 0);
        let mut state = self.state.lock();
        state.check_version(version);

        if !self.enabled {
            return self.source.history(limit);
        }

        let cached = &state.history;
        let covered = match limit {
            Some(n) => cached.fully_loaded || n <= cached.entries.len(),
            None => cached.fully_loaded,
        };
        if covered {
            debug!(?limit, cached = cached.entries.len(), "History served from cache");
            let take = limit.unwrap_or(cached.entries.len());
            return Ok(cached.entries.iter().take(take).cloned().collect());
        }

        let entries = self.source.history(limit)?;
        state.history = HistoryCache {
            entries: entries.clone(),
            fully_loaded: limit.is_none(),
        };
        Ok(entries)
    }

    /// Append to the history log and drop the cached history window.
    ///
    /// # Errors
    /// Returns an error if the append fails.
    pub fn push_history(&self, time: i64, payload: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        self.source.push_history(time, payload)?;
        state.history = HistoryCache::default();
        Ok(())
    }

    /// Rebuild presence from a banner feed and drop cached availability.
    ///
    /// # Errors
    /// Returns an error if indexing fails. Cached availability is dropped
    /// either way, since a failed rebuild may have left partial writes.
    pub fn rebuild_presence(&self, banners: &[Banner]) -> Result<IndexSummary> {
        let mut state = self.state.lock();
        let summary = self.source.rebuild_presence(banners);
        state.availability.clear();
        summary
    }
}
