//! Availability composition.
//!
//! Turns stored presence runs into presentable windows: each run gets a
//! resolved name and limited flag, runs are ordered by start, and short
//! lapses between like-flagged runs are folded into the preceding window as
//! [`Gap`]s. Composition is pure and always allocates fresh output.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::config::ComposerConfig;
use crate::domain::{Availability, AvailabilityKind, BannerId, Catalog, Gap, ItemId, PresenceRun, RewardFlag};

#[derive(Debug, Clone)]
pub struct Composer {
    max_gap: Duration,
    suppressed_names: Vec<String>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(&ComposerConfig::default())
    }
}

impl Composer {
    #[must_use]
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            max_gap: config.max_gap(),
            suppressed_names: config.suppressed_names.clone(),
        }
    }

    /// Compose windows for `item_ids`.
    ///
    /// Every requested item is present in the result, possibly with no
    /// windows. Runs for items that were not requested are ignored.
    #[must_use]
    pub fn compose(
        &self,
        item_ids: &[ItemId],
        runs: &[PresenceRun],
        flags: &[RewardFlag],
        catalog: &Catalog,
    ) -> HashMap<ItemId, Vec<Availability>> {
        let limited: HashSet<(BannerId, ItemId)> = flags
            .iter()
            .filter(|f| f.limited)
            .map(|f| (f.banner_id, f.item_id))
            .collect();

        let mut by_item: HashMap<ItemId, Vec<Availability>> =
            item_ids.iter().map(|id| (*id, Vec::new())).collect();

        for run in runs {
            if let Some(windows) = by_item.get_mut(&run.item_id) {
                windows.push(Availability {
                    kind: AvailabilityKind::Banner,
                    name: self.resolve_name(run, catalog),
                    start: run.start,
                    end: run.end,
                    gaps: Vec::new(),
                    limited: limited.contains(&(run.first_banner_id, run.item_id)),
                });
            }
        }

        by_item
            .into_iter()
            .map(|(item, mut windows)| {
                windows.sort_by_key(|w| w.start);
                (item, coalesce(windows, self.max_gap))
            })
            .collect()
    }

    /// Name shared by the run's first and last banner, if any.
    fn resolve_name(&self, run: &PresenceRun, catalog: &Catalog) -> Option<String> {
        let first = catalog.name_of(run.first_banner_id);
        let name = if run.first_banner_id == run.last_banner_id
            || first == catalog.name_of(run.last_banner_id)
        {
            Some(first)
        } else {
            None
        };
        name.filter(|n| !self.suppressed_names.iter().any(|s| s == n))
    }
}

/// Fold lapses of at most `max_gap` between like-flagged neighbours into the
/// preceding window. Expects `windows` sorted by start; compares each window
/// only against the current accumulator.
#[must_use]
pub fn coalesce(windows: Vec<Availability>, max_gap: Duration) -> Vec<Availability> {
    let mut out = Vec::with_capacity(windows.len());
    let mut iter = windows.into_iter();
    let Some(mut acc) = iter.next() else {
        return out;
    };

    for next in iter {
        let lapse = next.start - acc.end;
        if lapse > Duration::zero() && lapse <= max_gap && acc.limited == next.limited {
            acc.gaps.push(Gap {
                start: acc.end,
                end: next.start,
            });
            acc.end = next.end;
        } else {
            out.push(std::mem::replace(&mut acc, next));
        }
    }
    out.push(acc);
    out
}
