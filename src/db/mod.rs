//! Database layer (JSON blobs in a key-value store).

pub mod repository;
pub mod store;

pub use repository::Db;
pub use store::{DirStore, KeyValueStore, MemoryStore, StoreError};

/// Collection names as constants.
pub mod collections {
    pub const MEALS: &str = "meals";
    pub const GOALS: &str = "goals";
}
