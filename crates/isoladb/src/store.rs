//! The process-wide store. One JSON file per table, every write durable
//! before the mutating call returns.
//!
//! A single `tokio::sync::Mutex` guards the in-memory tables: a mutation
//! reads, modifies and persists under one lock acquisition, so two
//! concurrent GM commands can never interleave a read-modify-write on the
//! same player row. Multi-record mutations (transfer) stage on clones and
//! commit only when every step succeeded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gridinv::Rect;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::bestiary::{Dinosaur, Plant};
use crate::items::{default_catalog, BaseItem, InvItem, ItemIdGen};
use crate::player::{PlayerRecord, GRID_COLS, GRID_ROWS};
use crate::storage::ExternalStorage;
use crate::StoreError;

const PLAYERS_FILE: &str = "players.json";
const CATALOG_FILE: &str = "catalog.json";
const STORAGES_FILE: &str = "storages.json";
const DINOSAURS_FILE: &str = "dinosaurs.json";
const PLANTS_FILE: &str = "plants.json";

/// Where an explicit item move lands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "container", rename_all = "lowercase")]
pub enum MoveDest {
    Player { x: u32, y: u32 },
    Storage { label: String, x: u32, y: u32 },
}

pub struct Db {
    ids: ItemIdGen,
    inner: Mutex<Inner>,
}

struct Inner {
    dir: PathBuf,
    players: HashMap<String, PlayerRecord>,
    catalog: Vec<BaseItem>,
    storages: Vec<ExternalStorage>,
    dinosaurs: Vec<Dinosaur>,
    plants: Vec<Plant>,
}

impl Db {
    /// Load (or initialize) the data directory. A missing file means an
    /// empty table; a present-but-unreadable file is a boot error, never
    /// silent data loss. First boot seeds the built-in item catalog.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create data dir {}", dir.display()))?;

        let players: Vec<PlayerRecord> =
            read_json_opt(&dir.join(PLAYERS_FILE))?.unwrap_or_default();
        let catalog: Vec<BaseItem> = match read_json_opt(&dir.join(CATALOG_FILE))? {
            Some(v) => v,
            None => {
                let v = default_catalog();
                write_json(&dir.join(CATALOG_FILE), &v)?;
                info!(items = v.len(), "seeded default item catalog");
                v
            }
        };
        let storages: Vec<ExternalStorage> =
            read_json_opt(&dir.join(STORAGES_FILE))?.unwrap_or_default();
        let dinosaurs: Vec<Dinosaur> =
            read_json_opt(&dir.join(DINOSAURS_FILE))?.unwrap_or_default();
        let plants: Vec<Plant> = read_json_opt(&dir.join(PLANTS_FILE))?.unwrap_or_default();

        info!(
            dir = %dir.display(),
            players = players.len(),
            storages = storages.len(),
            "store opened"
        );

        let players = players
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect::<HashMap<_, _>>();

        Ok(Self {
            ids: ItemIdGen::new(),
            inner: Mutex::new(Inner {
                dir,
                players,
                catalog,
                storages,
                dinosaurs,
                plants,
            }),
        })
    }

    /// `None` on an unknown name; never an error.
    pub async fn find_player(&self, name: &str) -> Option<PlayerRecord> {
        self.inner.lock().await.players.get(name).cloned()
    }

    pub async fn list_players(&self) -> Vec<PlayerRecord> {
        let inner = self.inner.lock().await;
        let mut v = inner.players.values().cloned().collect::<Vec<_>>();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }

    /// Lazy creation on first authenticated access: returns the existing
    /// record untouched, or inserts and persists the one `make` builds.
    pub async fn find_or_create_player(
        &self,
        name: &str,
        make: impl FnOnce() -> PlayerRecord,
    ) -> Result<(PlayerRecord, bool), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(p) = inner.players.get(name) {
            return Ok((p.clone(), false));
        }
        let rec = make();
        inner.players.insert(name.to_string(), rec.clone());
        inner.save_players()?;
        info!(name = %name, "created player record");
        Ok((rec, true))
    }

    /// Apply one mutation to one player row under the store lock and
    /// persist it. The partial-update primitive: callers touch only the
    /// gauges/flags they mean to.
    pub async fn mutate_player(
        &self,
        name: &str,
        f: impl FnOnce(&mut PlayerRecord),
    ) -> Result<PlayerRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let p = inner
            .players
            .get_mut(name)
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;
        f(p);
        let out = p.clone();
        inner.save_players()?;
        Ok(out)
    }

    /// Apply one mutation to every player row, persisting once.
    pub async fn mutate_all_players(
        &self,
        mut f: impl FnMut(&mut PlayerRecord),
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut n = 0usize;
        for p in inner.players.values_mut() {
            f(p);
            n += 1;
        }
        if n > 0 {
            inner.save_players()?;
        }
        Ok(n)
    }

    /// Exact-name catalog lookup.
    pub async fn base_item(&self, name: &str) -> Option<BaseItem> {
        let inner = self.inner.lock().await;
        inner.catalog.iter().find(|b| b.name == name).cloned()
    }

    /// Grant up to `amount` copies, each placed first-fit against the grid
    /// as it grows. Returns how many fit; the rest are not granted.
    pub async fn grant_items(
        &self,
        name: &str,
        base: &BaseItem,
        amount: u32,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().await;
        let p = inner
            .players
            .get_mut(name)
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;

        let mut occupied = p.occupied_rects();
        let mut placed = 0usize;
        for _ in 0..amount {
            let Some((x, y)) = gridinv::find_placement(&occupied, base.w, base.h, GRID_COLS, GRID_ROWS)
            else {
                break;
            };
            occupied.push(Rect::new(x, y, base.w, base.h));
            p.inventory
                .push(InvItem::stamp(base, self.ids.next_id(&base.name), x, y));
            placed += 1;
        }

        if placed > 0 {
            inner.save_players()?;
        }
        Ok(placed)
    }

    /// Move one item between two players, all-or-nothing: when no placement
    /// fits the destination grid, neither record changes.
    pub async fn transfer_item(
        &self,
        from: &str,
        to: &str,
        item_id: &str,
    ) -> Result<InvItem, StoreError> {
        let mut inner = self.inner.lock().await;

        if from == to {
            // Degenerate self-transfer: re-place the item first-fit.
            let p = inner
                .players
                .get_mut(from)
                .ok_or_else(|| StoreError::PlayerNotFound(from.to_string()))?;
            let idx = p
                .inventory
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
            let occupied = p
                .inventory
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .map(|(_, i)| i.rect())
                .collect::<Vec<_>>();
            let (w, h) = (p.inventory[idx].w, p.inventory[idx].h);
            let (x, y) = gridinv::find_placement(&occupied, w, h, GRID_COLS, GRID_ROWS)
                .ok_or(StoreError::NoSpace)?;
            let mut item = p.inventory.remove(idx);
            item.x = x;
            item.y = y;
            p.inventory.push(item.clone());
            inner.save_players()?;
            return Ok(item);
        }

        let mut src = inner
            .players
            .get(from)
            .cloned()
            .ok_or_else(|| StoreError::PlayerNotFound(from.to_string()))?;
        let mut dst = inner
            .players
            .get(to)
            .cloned()
            .ok_or_else(|| StoreError::PlayerNotFound(to.to_string()))?;

        let idx = src
            .inventory
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
        let mut item = src.inventory[idx].clone();

        let (x, y) =
            gridinv::find_placement(&dst.occupied_rects(), item.w, item.h, GRID_COLS, GRID_ROWS)
                .ok_or(StoreError::NoSpace)?;

        src.inventory.remove(idx);
        item.x = x;
        item.y = y;
        dst.inventory.push(item.clone());

        inner.players.insert(from.to_string(), src);
        inner.players.insert(to.to_string(), dst);
        inner.save_players()?;
        Ok(item)
    }

    /// Move an item the player holds to a worn-equipment slot.
    pub async fn equip_item(&self, name: &str, item_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let p = inner
            .players
            .get_mut(name)
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;
        let idx = p
            .inventory
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
        let item = p.inventory.remove(idx);
        p.equipment.push(item);
        inner.save_players()?;
        Ok(())
    }

    /// Return a worn item to the grid via first-fit. When nothing fits the
    /// item stays equipped.
    pub async fn unequip_item(&self, name: &str, item_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let p = inner
            .players
            .get_mut(name)
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;
        let idx = p
            .equipment
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;

        let (w, h) = (p.equipment[idx].w, p.equipment[idx].h);
        let (x, y) = gridinv::find_placement(&p.occupied_rects(), w, h, GRID_COLS, GRID_ROWS)
            .ok_or(StoreError::NoSpace)?;

        let mut item = p.equipment.remove(idx);
        item.x = x;
        item.y = y;
        p.inventory.push(item);
        inner.save_players()?;
        Ok(())
    }

    /// Place one reachable item (own grid or a shared storage) at an
    /// explicit cell of the destination container.
    pub async fn move_item(
        &self,
        name: &str,
        item_id: &str,
        dest: &MoveDest,
    ) -> Result<(), StoreError> {
        enum Src {
            Grid(usize),
            Chest(usize, usize),
        }

        let mut inner = self.inner.lock().await;
        let p = inner
            .players
            .get(name)
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;

        let src = if let Some(i) = p.inventory.iter().position(|i| i.id == item_id) {
            Src::Grid(i)
        } else {
            inner
                .storages
                .iter()
                .enumerate()
                .find_map(|(si, s)| {
                    s.inventory
                        .iter()
                        .position(|i| i.id == item_id)
                        .map(|ii| Src::Chest(si, ii))
                })
                .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?
        };

        let item = match &src {
            Src::Grid(i) => p.inventory[*i].clone(),
            Src::Chest(si, ii) => inner.storages[*si].inventory[*ii].clone(),
        };

        // Validate the destination cell against its container, the moved
        // item excluded from its own collision set.
        let (cols, rows, occupied, x, y) = match dest {
            MoveDest::Player { x, y } => {
                let p = inner
                    .players
                    .get(name)
                    .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;
                let occ = p
                    .inventory
                    .iter()
                    .filter(|i| i.id != item_id)
                    .map(InvItem::rect)
                    .collect::<Vec<_>>();
                (GRID_COLS, GRID_ROWS, occ, *x, *y)
            }
            MoveDest::Storage { label, x, y } => {
                let s = inner
                    .storages
                    .iter()
                    .find(|s| s.label == *label)
                    .ok_or_else(|| StoreError::StorageNotFound(label.clone()))?;
                let occ = s
                    .inventory
                    .iter()
                    .filter(|i| i.id != item_id)
                    .map(InvItem::rect)
                    .collect::<Vec<_>>();
                (s.cols, s.rows, occ, *x, *y)
            }
        };

        let rect = Rect::new(x, y, item.w, item.h);
        if !rect.fits(cols, rows) {
            return Err(StoreError::OutOfBounds);
        }
        if gridinv::has_overlap(&occupied, rect) {
            return Err(StoreError::Overlap);
        }

        // Commit: remove from the source, land in the destination.
        match src {
            Src::Grid(i) => {
                inner
                    .players
                    .get_mut(name)
                    .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?
                    .inventory
                    .remove(i);
            }
            Src::Chest(si, ii) => {
                inner.storages[si].inventory.remove(ii);
            }
        }

        let mut item = item;
        item.x = x;
        item.y = y;
        match dest {
            MoveDest::Player { .. } => {
                inner
                    .players
                    .get_mut(name)
                    .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?
                    .inventory
                    .push(item);
            }
            MoveDest::Storage { label, .. } => {
                inner
                    .storages
                    .iter_mut()
                    .find(|s| s.label == *label)
                    .ok_or_else(|| StoreError::StorageNotFound(label.clone()))?
                    .inventory
                    .push(item);
            }
        }

        inner.save_players()?;
        inner.save_storages()?;
        Ok(())
    }

    pub async fn list_storages(&self) -> Vec<ExternalStorage> {
        self.inner.lock().await.storages.clone()
    }

    pub async fn dinosaurs(&self) -> Vec<Dinosaur> {
        self.inner.lock().await.dinosaurs.clone()
    }

    pub async fn plants(&self) -> Vec<Plant> {
        self.inner.lock().await.plants.clone()
    }
}

impl Inner {
    fn save_players(&self) -> Result<(), StoreError> {
        let mut v = self.players.values().collect::<Vec<_>>();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        write_json(&self.dir.join(PLAYERS_FILE), &v)
            .map_err(|e| StoreError::Persist(e.to_string()))
    }

    fn save_storages(&self) -> Result<(), StoreError> {
        write_json(&self.dir.join(STORAGES_FILE), &self.storages)
            .map_err(|e| StoreError::Persist(e.to_string()))
    }
}

fn read_json_opt<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let v = serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(v))
}

fn write_json<T: Serialize>(path: &Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, s).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("rename {}", path.display()))?;
    Ok(())
}
