//! Presence indexing.
//!
//! Folds a chronological banner sequence into per-item presence runs. A banner
//! that starts (almost) exactly where the previous one ended continues the
//! runs of the items both offer; any other banner opens fresh runs. Runs
//! separated by a real gap are never merged here, and a banner starting
//! inside its predecessor is not a continuation either.

use std::collections::BTreeSet;

use chrono::Duration;
use tracing::{debug, info};

use crate::config::IndexerConfig;
use crate::domain::{Banner, BannerFilter, ItemId, RewardEntry};
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::store::{single_banner_run, PresenceStore};

/// Counts from a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub banners: usize,
    pub continuations: usize,
    pub fresh_seeds: usize,
}

/// Effect of one `extend` step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendOutcome {
    pub extended: BTreeSet<ItemId>,
    pub opened: BTreeSet<ItemId>,
    pub closed: BTreeSet<ItemId>,
}

#[derive(Debug, Clone)]
pub struct PresenceIndexer {
    filter: BannerFilter,
    continuation_threshold: Duration,
    retry: RetryPolicy,
}

impl PresenceIndexer {
    #[must_use]
    pub fn new(config: &IndexerConfig, retry: RetryPolicy) -> Self {
        Self {
            filter: config.filter(),
            continuation_threshold: config.continuation_threshold(),
            retry,
        }
    }

    #[must_use]
    pub fn filter(&self) -> BannerFilter {
        self.filter
    }

    /// Whether `next` picks up where `prev` left off: it starts no earlier
    /// than `prev` ends and less than the threshold after.
    #[must_use]
    pub fn is_continuation(&self, prev: &Banner, next: &Banner) -> bool {
        let gap = next.start - prev.end;
        gap >= Duration::zero() && gap < self.continuation_threshold
    }

    /// Tracked banners in chronological order.
    #[must_use]
    pub fn tracked(&self, banners: &[Banner]) -> Vec<Banner> {
        let mut tracked: Vec<Banner> = banners
            .iter()
            .filter(|b| self.filter.matches(b))
            .cloned()
            .collect();
        tracked.sort_by_key(|b| b.start);
        tracked
    }

    /// Rebuild the whole store from a banner feed.
    ///
    /// # Errors
    /// Returns an error if any storage step fails after retries.
    pub fn rebuild_all<S: PresenceStore>(&self, store: &S, banners: &[Banner]) -> Result<IndexSummary> {
        let tracked = self.tracked(banners);
        let Some((first, rest)) = tracked.split_first() else {
            self.retry
                .run("clear presence", || store.transaction(|tx| tx.clear_runs()))?;
            info!("No tracked banners, presence cleared");
            return Ok(IndexSummary::default());
        };

        let mut summary = IndexSummary {
            banners: tracked.len(),
            ..IndexSummary::default()
        };

        self.seed(store, first, true)?;
        debug!(banner = %first.id, "Primary seeding completed");

        let mut prev = first;
        for banner in rest {
            if self.is_continuation(prev, banner) {
                self.extend(store, prev, banner)?;
                summary.continuations += 1;
            } else {
                self.seed(store, banner, false)?;
                summary.fresh_seeds += 1;
            }
            prev = banner;
        }

        info!(
            banners = summary.banners,
            continuations = summary.continuations,
            fresh_seeds = summary.fresh_seeds,
            "Presence rebuilt"
        );
        Ok(summary)
    }

    /// Open one run per item `banner` offers, optionally clearing the store
    /// first. Returns the number of runs opened.
    ///
    /// # Errors
    /// Returns an error if the write fails after retries.
    pub fn seed<S: PresenceStore>(&self, store: &S, banner: &Banner, clear: bool) -> Result<usize> {
        self.retry.run("seed presence", || {
            store.transaction(|tx| {
                if clear {
                    tx.clear_runs()?;
                }
                let runs: Vec<_> = tx
                    .offered_items(banner.id)?
                    .into_iter()
                    .map(|item| single_banner_run(item, banner))
                    .collect();
                tx.insert_runs(&runs)?;
                debug!(banner = %banner.id, items = runs.len(), clear, "Seeded presence");
                Ok(runs.len())
            })
        })
    }

    /// Continue runs ending at `prev` into `next`.
    ///
    /// Items offered by both banners are extended, items new to `next` open a
    /// fresh run, and items missing from `next` stay closed. Only valid when
    /// [`Self::is_continuation`] holds for the pair.
    ///
    /// # Errors
    /// Returns an error if the write fails after retries.
    pub fn extend<S: PresenceStore>(&self, store: &S, prev: &Banner, next: &Banner) -> Result<ExtendOutcome> {
        self.retry.run("extend presence", || {
            store.transaction(|tx| {
                let open = tx.items_open_at(prev.id)?;
                let offered = tx.offered_items(next.id)?;

                let extended: BTreeSet<ItemId> = open.intersection(&offered).copied().collect();
                let opened: BTreeSet<ItemId> = offered.difference(&open).copied().collect();
                let closed: BTreeSet<ItemId> = open.difference(&offered).copied().collect();

                let carried: Vec<ItemId> = extended.iter().copied().collect();
                tx.extend_runs(&carried, prev.id, next)?;

                let fresh: Vec<_> = opened.iter().map(|item| single_banner_run(*item, next)).collect();
                tx.insert_runs(&fresh)?;

                debug!(
                    prev = %prev.id,
                    next = %next.id,
                    extended = extended.len(),
                    opened = opened.len(),
                    closed = closed.len(),
                    "Extended presence"
                );
                Ok(ExtendOutcome {
                    extended,
                    opened,
                    closed,
                })
            })
        })
    }

    /// Record reward rows that later seeding and extension read from.
    ///
    /// # Errors
    /// Returns an error if the write fails after retries.
    pub fn add_reward_entries<S: PresenceStore>(&self, store: &S, entries: &[RewardEntry]) -> Result<usize> {
        self.retry
            .run("add reward entries", || store.transaction(|tx| tx.upsert_rewards(entries)))
    }
}
