//! Domain types: banners, presence runs, availability windows, history.

pub mod availability;
pub mod banner;
pub mod history;
pub mod id;
pub mod presence;

pub use availability::{Availability, AvailabilityKind, Gap};
pub use banner::{Banner, BannerFilter, Catalog};
pub use history::HistoryEntry;
pub use id::{BannerId, ItemId};
pub use presence::{PresenceRun, RewardEntry, RewardFlag};
