//! Shared external storages (world chests). Not owner-scoped: every player
//! sees the same containers. Provisioned out of band; the core only
//! reads and writes their item lists.

use gridinv::Rect;
use serde::{Deserialize, Serialize};

use crate::items::InvItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalStorage {
    pub label: String,
    pub cols: u32,
    pub rows: u32,
    #[serde(default)]
    pub inventory: Vec<InvItem>,
}

impl ExternalStorage {
    pub fn occupied_rects(&self) -> Vec<Rect> {
        self.inventory.iter().map(InvItem::rect).collect()
    }
}
