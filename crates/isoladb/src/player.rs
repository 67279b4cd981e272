//! Player records and the daily-decay rule.

use gridinv::Rect;
use serde::{Deserialize, Serialize};

use crate::items::InvItem;

/// Fixed player grid footprint.
pub const GRID_COLS: u32 = 10;
pub const GRID_ROWS: u32 = 7;

/// How much each survival gauge drops at the start of a new day.
pub const NEW_DAY_DECAY: f64 = 25.0;

/// One player row. Gauges live in `[0, 100]` except `temperature`.
/// Robots run on `energy`; the organic gauges stay untouched for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub name: String,
    pub password_hash: String,
    pub hunger: f64,
    pub thirst: f64,
    pub sleep: f64,
    pub oxygen: f64,
    pub energy: f64,
    pub biofeedback: f64,
    pub temperature: f64,
    #[serde(default)]
    pub is_robot: bool,
    #[serde(default)]
    pub is_sick: bool,
    #[serde(default)]
    pub is_gm: bool,
    #[serde(default)]
    pub inventory: Vec<InvItem>,
    #[serde(default)]
    pub equipment: Vec<InvItem>,
    pub created_unix: u64,
}

impl PlayerRecord {
    pub fn new(name: &str, password_hash: &str) -> Self {
        Self {
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            hunger: 100.0,
            thirst: 100.0,
            sleep: 100.0,
            oxygen: 100.0,
            energy: 100.0,
            biofeedback: 100.0,
            temperature: 36.6,
            is_robot: false,
            is_sick: false,
            is_gm: false,
            inventory: Vec::new(),
            equipment: Vec::new(),
            created_unix: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn occupied_rects(&self) -> Vec<Rect> {
        self.inventory.iter().map(InvItem::rect).collect()
    }
}

/// Clamp a gauge to its nominal range.
pub fn clamp_gauge(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// The daily decay applied by the periodic tick and by `_newday`.
///
/// Robots pay the day in energy. Everyone else loses hunger, thirst and
/// sleep, and wakes fully healed unless sick.
pub fn apply_new_day(p: &mut PlayerRecord) {
    if p.is_robot {
        p.energy = clamp_gauge(p.energy - NEW_DAY_DECAY);
        return;
    }
    p.hunger = clamp_gauge(p.hunger - NEW_DAY_DECAY);
    p.thirst = clamp_gauge(p.thirst - NEW_DAY_DECAY);
    p.sleep = clamp_gauge(p.sleep - NEW_DAY_DECAY);
    if !p.is_sick {
        p.biofeedback = 100.0;
    }
}

/// The over-the-wire projection: everything except the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub name: String,
    pub hunger: f64,
    pub thirst: f64,
    pub sleep: f64,
    pub oxygen: f64,
    pub energy: f64,
    pub biofeedback: f64,
    pub temperature: f64,
    pub is_robot: bool,
    pub is_sick: bool,
    pub is_gm: bool,
    pub inventory: Vec<InvItem>,
    pub equipment: Vec<InvItem>,
}

impl From<&PlayerRecord> for PlayerPublic {
    fn from(p: &PlayerRecord) -> Self {
        Self {
            name: p.name.clone(),
            hunger: p.hunger,
            thirst: p.thirst,
            sleep: p.sleep,
            oxygen: p.oxygen,
            energy: p.energy,
            biofeedback: p.biofeedback,
            temperature: p.temperature,
            is_robot: p.is_robot,
            is_sick: p.is_sick,
            is_gm: p.is_gm,
            inventory: p.inventory.clone(),
            equipment: p.equipment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauges_stay_in_range_under_any_sequence() {
        let mut p = PlayerRecord::new("bob", "h");
        for amt in [300.0, -17.5, 42.0, -9000.0, 0.25] {
            p.biofeedback = clamp_gauge(p.biofeedback - amt);
            assert!((0.0..=100.0).contains(&p.biofeedback));
            p.hunger = clamp_gauge(p.hunger + amt);
            assert!((0.0..=100.0).contains(&p.hunger));
        }
    }

    #[test]
    fn new_day_clamps_and_fully_heals() {
        let mut p = PlayerRecord::new("bob", "h");
        p.hunger = 10.0;
        p.thirst = 80.0;
        p.sleep = 25.0;
        p.biofeedback = 3.0;
        apply_new_day(&mut p);
        assert_eq!(p.hunger, 0.0);
        assert_eq!(p.thirst, 55.0);
        assert_eq!(p.sleep, 0.0);
        assert_eq!(p.biofeedback, 100.0);
    }

    #[test]
    fn new_day_leaves_sick_biofeedback_alone() {
        let mut p = PlayerRecord::new("bob", "h");
        p.is_sick = true;
        p.biofeedback = 40.0;
        apply_new_day(&mut p);
        assert_eq!(p.biofeedback, 40.0);
        assert_eq!(p.hunger, 75.0);
    }

    #[test]
    fn new_day_charges_robots_energy_only() {
        let mut p = PlayerRecord::new("r2", "h");
        p.is_robot = true;
        p.hunger = 50.0;
        p.energy = 20.0;
        p.biofeedback = 10.0;
        apply_new_day(&mut p);
        assert_eq!(p.energy, 0.0);
        assert_eq!(p.hunger, 50.0);
        assert_eq!(p.biofeedback, 10.0);
    }

    #[test]
    fn public_projection_drops_the_password_hash() {
        let p = PlayerRecord::new("bob", "segretissimo");
        let v = serde_json::to_value(PlayerPublic::from(&p)).expect("serialize");
        assert!(v.get("passwordHash").is_none());
        assert_eq!(v.get("name").and_then(|n| n.as_str()), Some("bob"));
        assert!(v.get("isRobot").is_some());
    }
}
