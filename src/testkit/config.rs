//! Canonical test configurations.

use crate::config::{Config, DatabaseConfig};

/// Default configuration pointing at `url` with a given pool size.
pub fn with_database(url: &str, pool_size: u32) -> Config {
    Config {
        database: DatabaseConfig {
            url: url.to_string(),
            pool_size,
            busy_timeout_ms: 1000,
        },
        ..Config::default()
    }
}

/// Default configuration with caching turned off.
pub fn uncached() -> Config {
    let mut config = Config::default();
    config.cache.enabled = false;
    config
}
