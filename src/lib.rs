//! Banner Timeline - availability history for items offered by rotating banners.
//!
//! This crate tracks, for every reward item, the windows during which some
//! banner offered it, and serves those windows through a cache that is
//! invalidated whenever the upstream data version changes.
//!
//! # Architecture
//!
//! Data flows banner feed -> indexer -> store -> composer -> cache:
//!
//! - **`indexer`** - folds a chronological banner sequence into per-item
//!   presence runs, continuing runs across back-to-back banners
//! - **`composer`** - turns runs into named, gap-coalesced availability windows
//! - **`cache`** - memoizes composed windows and the history log per data version
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files with environment overrides
//! - [`domain`] - Banners, presence runs, availability windows, history entries
//! - [`error`] - Error types for the crate
//! - [`retry`] - Bounded retry for transient storage failures
//! - [`store`] - Storage traits with SQLite (Diesel) and in-memory backends
//! - [`timeline`] - Store-backed service tying indexer and composer together
//!
//! # Example
//!
//! ```no_run
//! use banner_timeline::cache::VersionedCache;
//! use banner_timeline::config::Config;
//! use banner_timeline::domain::{Banner, Catalog, ItemId};
//! use banner_timeline::store::{db, SqliteStore};
//! use banner_timeline::timeline::Timeline;
//!
//! # fn main() -> banner_timeline::error::Result<()> {
//! dotenvy::dotenv().ok();
//! let config = Config::load("timeline.toml")?;
//! config.init_logging();
//!
//! let pool = db::open(&config.database)?;
//! let store = SqliteStore::new(pool, config.database.busy_timeout_ms);
//! let cache = VersionedCache::new(Timeline::from_config(store, &config), &config.cache);
//!
//! let banners: Vec<Banner> = Vec::new();
//! cache.rebuild_presence(&banners)?;
//! let windows = cache.availability(&1u64, &[ItemId::new(100_001)], &Catalog::new(&banners))?;
//! # let _ = windows;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod composer;
pub mod config;
pub mod domain;
pub mod error;
pub mod indexer;
pub mod retry;
pub mod store;
pub mod timeline;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
