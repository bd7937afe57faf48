//! Banner catalog types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::BannerId;

/// A time-boxed offer event from the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    pub kind: i32,
    pub subkind: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub name: String,
}

/// The `(kind, subkind)` pair whose banners take part in presence tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerFilter {
    pub kind: i32,
    pub subkind: i32,
}

impl BannerFilter {
    #[must_use]
    pub const fn new(kind: i32, subkind: i32) -> Self {
        Self { kind, subkind }
    }

    #[must_use]
    pub fn matches(&self, banner: &Banner) -> bool {
        banner.kind == self.kind && banner.subkind == self.subkind
    }
}

impl Default for BannerFilter {
    /// Regular premium banners.
    fn default() -> Self {
        Self::new(3, 1)
    }
}

/// Read-only lookup over a banner snapshot.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    banners: HashMap<BannerId, Banner>,
}

impl Catalog {
    #[must_use]
    pub fn new(banners: &[Banner]) -> Self {
        Self {
            banners: banners.iter().map(|b| (b.id, b.clone())).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: BannerId) -> Option<&Banner> {
        self.banners.get(&id)
    }

    /// Display name for a banner, with an in-band placeholder for ids
    /// missing from the snapshot.
    #[must_use]
    pub fn name_of(&self, id: BannerId) -> String {
        match self.banners.get(&id) {
            Some(banner) => banner.name.clone(),
            None => format!("??? (unknown banner ID: {id})"),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.banners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }
}
