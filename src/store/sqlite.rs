//! SQLite store implementation using Diesel.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;
use tracing::debug;

use super::db::model::{HistoryRow, NewHistoryRow, NewPresenceRow, PresenceRow, RewardRow};
use super::db::schema::{gacha_available_ex, gacha_contiguous_presence, history};
use super::db::{configure_sqlite_connection, DbPool};
use super::{from_epoch, HistoryLog, PresenceStore, PresenceTx};
use crate::domain::{Banner, BannerId, HistoryEntry, ItemId, PresenceRun, RewardEntry, RewardFlag};
use crate::error::{Error, Result, StorageError};

/// SQLite-backed presence store and history log.
pub struct SqliteStore {
    pool: DbPool,
    busy_timeout_ms: u32,
}

impl SqliteStore {
    /// Create a new SQLite store over a migrated pool.
    pub fn new(pool: DbPool, busy_timeout_ms: u32) -> Self {
        Self {
            pool,
            busy_timeout_ms,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Pooled connection with the busy timeout applied.
    fn connection(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        let mut conn = self.pool.get().map_err(StorageError::from)?;
        configure_sqlite_connection(&mut conn, self.busy_timeout_ms)?;
        Ok(conn)
    }

    fn from_row(row: PresenceRow) -> Result<PresenceRun> {
        let corrupt = || Error::CorruptPresenceData {
            row_id: row.id,
            item_id: ItemId::new(row.card_id),
            start: row.avail_start,
            end: row.avail_end,
        };

        if row.avail_start > row.avail_end {
            return Err(corrupt());
        }
        let start = from_epoch(row.avail_start).ok_or_else(corrupt)?;
        let end = from_epoch(row.avail_end).ok_or_else(corrupt)?;

        Ok(PresenceRun {
            item_id: ItemId::new(row.card_id),
            first_banner_id: BannerId::new(row.gacha_id_first),
            last_banner_id: BannerId::new(row.gacha_id_last),
            start,
            end,
        })
    }

    fn to_row(run: &PresenceRun) -> NewPresenceRow {
        NewPresenceRow {
            card_id: run.item_id.get(),
            gacha_id_first: run.first_banner_id.get(),
            gacha_id_last: run.last_banner_id.get(),
            avail_start: run.start.timestamp(),
            avail_end: run.end.timestamp(),
        }
    }
}

fn raw_ids(items: &[ItemId]) -> Vec<i32> {
    items.iter().map(|id| id.get()).collect()
}

struct SqliteTx<'a> {
    conn: &'a mut SqliteConnection,
}

impl PresenceTx for SqliteTx<'_> {
    fn clear_runs(&mut self) -> Result<usize> {
        let deleted = diesel::delete(gacha_contiguous_presence::table).execute(self.conn)?;
        Ok(deleted)
    }

    fn offered_items(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>> {
        let ids: Vec<i32> = gacha_available_ex::table
            .filter(gacha_available_ex::gacha_id.eq(banner.get()))
            .select(gacha_available_ex::reward_id)
            .load(self.conn)?;
        Ok(ids.into_iter().map(ItemId::new).collect())
    }

    fn items_open_at(&mut self, banner: BannerId) -> Result<BTreeSet<ItemId>> {
        let ids: Vec<i32> = gacha_contiguous_presence::table
            .filter(gacha_contiguous_presence::gacha_id_last.eq(banner.get()))
            .select(gacha_contiguous_presence::card_id)
            .load(self.conn)?;
        Ok(ids.into_iter().map(ItemId::new).collect())
    }

    fn extend_runs(&mut self, items: &[ItemId], prev: BannerId, next: &Banner) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let updated = diesel::update(
            gacha_contiguous_presence::table
                .filter(gacha_contiguous_presence::card_id.eq_any(raw_ids(items)))
                .filter(gacha_contiguous_presence::gacha_id_last.eq(prev.get())),
        )
        .set((
            gacha_contiguous_presence::gacha_id_last.eq(next.id.get()),
            gacha_contiguous_presence::avail_end.eq(next.end.timestamp()),
        ))
        .execute(self.conn)?;
        Ok(updated)
    }

    fn insert_runs(&mut self, runs: &[PresenceRun]) -> Result<()> {
        if runs.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewPresenceRow> = runs.iter().map(SqliteStore::to_row).collect();
        diesel::insert_into(gacha_contiguous_presence::table)
            .values(&rows)
            .execute(self.conn)?;
        Ok(())
    }

    fn runs_for_items(&mut self, items: &[ItemId]) -> Result<Vec<PresenceRun>> {
        let rows: Vec<PresenceRow> = gacha_contiguous_presence::table
            .filter(gacha_contiguous_presence::card_id.eq_any(raw_ids(items)))
            .order((
                gacha_contiguous_presence::avail_start.asc(),
                gacha_contiguous_presence::id.asc(),
            ))
            .select(PresenceRow::as_select())
            .load(self.conn)?;
        rows.into_iter().map(SqliteStore::from_row).collect()
    }

    fn limited_flags(&mut self, items: &[ItemId]) -> Result<Vec<RewardFlag>> {
        let pairs: Vec<(i32, i32)> = gacha_available_ex::table
            .filter(gacha_available_ex::reward_id.eq_any(raw_ids(items)))
            .filter(gacha_available_ex::limited_flag.eq(1))
            .select((gacha_available_ex::gacha_id, gacha_available_ex::reward_id))
            .load(self.conn)?;
        Ok(pairs
            .into_iter()
            .map(|(banner, item)| RewardFlag {
                banner_id: BannerId::new(banner),
                item_id: ItemId::new(item),
                limited: true,
            })
            .collect())
    }

    fn upsert_rewards(&mut self, entries: &[RewardEntry]) -> Result<usize> {
        let mut written = 0;
        for entry in entries {
            let row = RewardRow {
                gacha_id: entry.banner_id.get(),
                step_num: entry.step_num,
                reward_id: entry.item_id.get(),
                recommend_order: entry.recommend_order,
                limited_flag: i32::from(entry.limited),
            };
            written += diesel::replace_into(gacha_available_ex::table)
                .values(&row)
                .execute(self.conn)?;
        }
        Ok(written)
    }
}

impl PresenceStore for SqliteStore {
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn PresenceTx) -> Result<T>,
    {
        let mut pooled = self.connection()?;
        let conn: &mut SqliteConnection = &mut pooled;

        conn.transaction(|conn| {
            let mut tx = SqliteTx { conn };
            f(&mut tx)
        })
    }
}

impl HistoryLog for SqliteStore {
    fn append(&self, time: i64, payload: &[u8]) -> Result<()> {
        let mut conn = self.connection()?;
        diesel::insert_into(history::table)
            .values(&NewHistoryRow { time, payload })
            .execute(&mut conn)?;
        debug!(time, bytes = payload.len(), "Appended history entry");
        Ok(())
    }

    fn recent(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let mut conn = self.connection()?;
        let query = history::table
            .order((history::time.desc(), history::id.desc()))
            .select(HistoryRow::as_select());

        let rows: Vec<HistoryRow> = match limit {
            Some(n) => query
                .limit(i64::try_from(n).unwrap_or(i64::MAX))
                .load(&mut conn)?,
            None => query.load(&mut conn)?,
        };

        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                id: row.id,
                time: row.time,
                payload: row.payload,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::{create_pool, run_migrations};
    use crate::store::single_banner_run;
    use chrono::{TimeZone, Utc};

    fn setup_store() -> SqliteStore {
        let pool = create_pool(":memory:", 1).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        SqliteStore::new(pool, 1000)
    }

    fn banner(id: i32, day: u32) -> Banner {
        Banner {
            id: BannerId::new(id),
            kind: 3,
            subkind: 1,
            start: Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, day + 1, 0, 0, 0).unwrap(),
            name: format!("banner {id}"),
        }
    }

    fn reward(banner: i32, item: i32, limited: bool) -> RewardEntry {
        RewardEntry {
            banner_id: BannerId::new(banner),
            step_num: 1,
            item_id: ItemId::new(item),
            recommend_order: 0,
            limited,
        }
    }

    #[test]
    fn reward_upsert_replaces_same_key() {
        let store = setup_store();
        store
            .transaction(|tx| {
                tx.upsert_rewards(&[reward(1, 10, false), reward(1, 11, true)])?;
                tx.upsert_rewards(&[reward(1, 10, false)])
            })
            .unwrap();

        let offered = store.transaction(|tx| tx.offered_items(BannerId::new(1))).unwrap();
        assert_eq!(offered.into_iter().collect::<Vec<_>>(), vec![ItemId::new(10), ItemId::new(11)]);

        let flags = store
            .transaction(|tx| tx.limited_flags(&[ItemId::new(10), ItemId::new(11)]))
            .unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].item_id, ItemId::new(11));
    }

    #[test]
    fn extend_only_touches_runs_ending_at_prev() {
        let store = setup_store();
        let (b1, b2, b3) = (banner(1, 1), banner(2, 2), banner(3, 3));

        store
            .transaction(|tx| {
                tx.insert_runs(&[
                    single_banner_run(ItemId::new(10), &b1),
                    single_banner_run(ItemId::new(11), &b2),
                ])?;
                tx.extend_runs(&[ItemId::new(10), ItemId::new(11)], b2.id, &b3)
            })
            .unwrap();

        let runs = store
            .transaction(|tx| tx.runs_for_items(&[ItemId::new(10), ItemId::new(11)]))
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].last_banner_id, b1.id);
        assert_eq!(runs[1].last_banner_id, b3.id);
        assert_eq!(runs[1].end, b3.end);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let store = setup_store();
        let b1 = banner(1, 1);

        let result: Result<()> = store.transaction(|tx| {
            tx.insert_runs(&[single_banner_run(ItemId::new(10), &b1)])?;
            Err(StorageError::Database("forced".into()).into())
        });
        assert!(result.is_err());

        let runs = store.transaction(|tx| tx.runs_for_items(&[ItemId::new(10)])).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn inverted_row_is_rejected_at_read_time() {
        let store = setup_store();
        {
            let mut conn = store.pool().get().unwrap();
            diesel::sql_query(
                "INSERT INTO gacha_contiguous_presence (card_id, gacha_id_first, gacha_id_last, avail_start, avail_end) VALUES (10, 1, 1, 200, 100)",
            )
            .execute(&mut conn)
            .unwrap();
        }

        let err = store
            .transaction(|tx| tx.runs_for_items(&[ItemId::new(10)]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptPresenceData { start: 200, end: 100, .. }
        ));
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let store = setup_store();
        store.append(100, b"{\"n\":1}").unwrap();
        store.append(300, b"{\"n\":3}").unwrap();
        store.append(200, b"{\"n\":2}").unwrap();

        let all = store.recent(None).unwrap();
        assert_eq!(all.iter().map(|e| e.time).collect::<Vec<_>>(), vec![300, 200, 100]);

        let two = store.recent(Some(2)).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].payload_json().unwrap()["n"], 3);
    }

    #[derive(diesel::QueryableByName)]
    struct BusyTimeout {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        timeout: i32,
    }

    #[test]
    fn history_connections_get_busy_timeout() {
        let pool = create_pool(":memory:", 1).unwrap();
        run_migrations(&pool).unwrap();
        let store = SqliteStore::new(pool, 1234);

        store.append(100, b"{}").unwrap();

        let mut conn = store.pool().get().unwrap();
        let rows = diesel::sql_query("PRAGMA busy_timeout")
            .load::<BusyTimeout>(&mut conn)
            .unwrap();
        assert_eq!(rows[0].timeout, 1234);
    }
}
