//! Base-item catalog and concrete inventory items.
//!
//! A `BaseItem` is a catalog template; granting stamps a denormalized
//! `InvItem` snapshot from it. Later catalog edits never change items that
//! were already granted.

use std::sync::atomic::{AtomicU64, Ordering};

use gridinv::Rect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseItem {
    pub name: String,
    pub icon: String,
    pub w: u32,
    pub h: u32,
    pub kind: String,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub water: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvItem {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub kind: String,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub water: f64,
}

impl InvItem {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Stamp a concrete item from a catalog entry at a grid position.
    pub fn stamp(base: &BaseItem, id: String, x: u32, y: u32) -> Self {
        Self {
            id,
            name: base.name.clone(),
            icon: base.icon.clone(),
            x,
            y,
            w: base.w,
            h: base.h,
            kind: base.kind.clone(),
            tier: base.tier,
            damage: base.damage,
            food: base.food,
            water: base.water,
        }
    }
}

/// Item id generator: source-item slug, wall-clock millis, a process-wide
/// sequence and a random suffix. Unique even for rapid bulk grants that
/// land on the same millisecond.
#[derive(Debug)]
pub struct ItemIdGen {
    seq: AtomicU64,
}

impl ItemIdGen {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self, base_name: &str) -> String {
        let slug = base_name
            .to_ascii_lowercase()
            .replace(|c: char| c.is_whitespace(), "-");
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut rb = [0u8; 4];
        getrandom::getrandom(&mut rb).expect("getrandom");
        format!(
            "{slug}-{}-{seq}-{:02x}{:02x}{:02x}{:02x}",
            now_unix_ms(),
            rb[0],
            rb[1],
            rb[2],
            rb[3]
        )
    }
}

impl Default for ItemIdGen {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Built-in catalog, written to disk on first boot so `give` works before
/// any out-of-band provisioning.
pub fn default_catalog() -> Vec<BaseItem> {
    fn base(name: &str, icon: &str, w: u32, h: u32, kind: &str) -> BaseItem {
        BaseItem {
            name: name.to_string(),
            icon: icon.to_string(),
            w,
            h,
            kind: kind.to_string(),
            tier: 0,
            damage: 0.0,
            food: 0.0,
            water: 0.0,
        }
    }

    let mut out = vec![
        base("Roccia", "roccia.png", 1, 1, "risorsa"),
        base("Legno", "legno.png", 1, 2, "risorsa"),
        base("Fibra", "fibra.png", 1, 1, "risorsa"),
        base("Pelle", "pelle.png", 1, 1, "risorsa"),
        base("Corda", "corda.png", 1, 1, "risorsa"),
        base("Torcia", "torcia.png", 1, 2, "attrezzo"),
    ];

    let mut bacche = base("Bacche", "bacche.png", 1, 1, "cibo");
    bacche.food = 10.0;
    out.push(bacche);

    let mut carne = base("Carne cruda", "carne-cruda.png", 1, 1, "cibo");
    carne.food = 25.0;
    out.push(carne);

    let mut borraccia = base("Borraccia", "borraccia.png", 1, 2, "attrezzo");
    borraccia.water = 40.0;
    out.push(borraccia);

    let mut lancia = base("Lancia", "lancia.png", 1, 3, "arma");
    lancia.tier = 1;
    lancia.damage = 18.0;
    out.push(lancia);

    let mut ascia = base("Ascia di pietra", "ascia-pietra.png", 2, 2, "arma");
    ascia.tier = 1;
    ascia.damage = 12.0;
    out.push(ascia);

    out
}
