//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{gacha_available_ex, gacha_contiguous_presence, history};

/// Database row for a banner reward.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = gacha_available_ex)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RewardRow {
    pub gacha_id: i32,
    pub step_num: i32,
    pub reward_id: i32,
    pub recommend_order: i32,
    pub limited_flag: i32,
}

/// Database row for a presence run (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = gacha_contiguous_presence)]
pub struct NewPresenceRow {
    pub card_id: i32,
    pub gacha_id_first: i32,
    pub gacha_id_last: i32,
    pub avail_start: i64,
    pub avail_end: i64,
}

/// Database row for a presence run (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = gacha_contiguous_presence)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PresenceRow {
    pub id: i32,
    pub card_id: i32,
    pub gacha_id_first: i32,
    pub gacha_id_last: i32,
    pub avail_start: i64,
    pub avail_end: i64,
}

/// Database row for a history entry (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = history)]
pub struct NewHistoryRow<'a> {
    pub time: i64,
    pub payload: &'a [u8],
}

/// Database row for a history entry (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HistoryRow {
    pub id: i32,
    pub time: i64,
    pub payload: Vec<u8>,
}
