//! `isoladb`: the persisted world state of the isola backend.
//!
//! One JSON file per table under a data directory, loaded at boot and
//! rewritten atomically (tmp + rename) on every mutation. All mutation goes
//! through a single async lock, so a read-modify-write never interleaves
//! with another writer. The storage layer, not the caller, closes the
//! lost-update window.

pub mod bestiary;
pub mod items;
pub mod player;
pub mod storage;
pub mod store;

pub use store::{Db, MoveDest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    PlayerNotFound(String),
    ItemNotFound(String),
    StorageNotFound(String),
    NoSpace,
    OutOfBounds,
    Overlap,
    Persist(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::PlayerNotFound(n) => write!(f, "no such player: {n}"),
            StoreError::ItemNotFound(id) => write!(f, "no such item: {id}"),
            StoreError::StorageNotFound(l) => write!(f, "no such storage: {l}"),
            StoreError::NoSpace => write!(f, "no free placement in grid"),
            StoreError::OutOfBounds => write!(f, "placement outside grid bounds"),
            StoreError::Overlap => write!(f, "placement overlaps an existing item"),
            StoreError::Persist(e) => write!(f, "persist failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
