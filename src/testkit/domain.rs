//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`Banner`], [`RewardEntry`] and
//! timestamps so tests focus on assertions rather than construction
//! boilerplate.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Banner, BannerId, ItemId, RewardEntry};

/// Midnight UTC `n` days after 2026-01-01.
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
        + Duration::days(n)
}

/// A tracked (`3, 1`) banner.
pub fn banner(id: i32, name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Banner {
    Banner {
        id: BannerId::new(id),
        kind: 3,
        subkind: 1,
        start,
        end,
        name: name.to_string(),
    }
}

/// Banners back to back from day 0, each lasting `days_each`, named
/// `banner {id}` with ids starting at `first_id`.
pub fn back_to_back(first_id: i32, count: i32, days_each: i64) -> Vec<Banner> {
    (0..count)
        .map(|i| {
            let start = day(i64::from(i) * days_each);
            let id = first_id + i;
            banner(id, &format!("banner {id}"), start, start + Duration::days(days_each))
        })
        .collect()
}

/// Reward rows offering `items` on `banner`, none limited.
pub fn offers(banner: i32, items: &[i32]) -> Vec<RewardEntry> {
    items
        .iter()
        .enumerate()
        .map(|(order, item)| RewardEntry {
            banner_id: BannerId::new(banner),
            step_num: 1,
            item_id: ItemId::new(*item),
            recommend_order: i32::try_from(order).unwrap_or(i32::MAX),
            limited: false,
        })
        .collect()
}

/// A limited reward row.
pub fn limited_offer(banner: i32, item: i32) -> RewardEntry {
    RewardEntry {
        banner_id: BannerId::new(banner),
        step_num: 1,
        item_id: ItemId::new(item),
        recommend_order: 0,
        limited: true,
    }
}

/// Item ids from raw values.
pub fn items(ids: &[i32]) -> Vec<ItemId> {
    ids.iter().copied().map(ItemId::new).collect()
}
