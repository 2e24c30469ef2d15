//! Ship catalog, upgrades and the persisted progress record
//!
//! The record is the only meta state a run reads (to derive ship stats) or
//! writes (currency at run end and on achievement unlocks). Hangar purchases
//! happen between runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HangarError, StorageError};
use crate::persistence::{self, PROGRESS_KEY};
use crate::platform::Storage;

/// How a ship's main gun fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FirePattern {
    /// One forward shot
    #[default]
    Single,
    /// Three shots fanned by the ship's spread angle
    Spread,
    /// One forward shot plus two turret shots from the wings
    Side,
}

/// Ships in the hangar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipId {
    Interceptor,
    Vanguard,
    Striker,
}

impl ShipId {
    pub const ALL: [ShipId; 3] = [ShipId::Interceptor, ShipId::Vanguard, ShipId::Striker];

    /// Free starter ship every profile owns
    pub const BASE: ShipId = ShipId::Interceptor;

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipId::Interceptor => "interceptor",
            ShipId::Vanguard => "vanguard",
            ShipId::Striker => "striker",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "interceptor" => Some(ShipId::Interceptor),
            "vanguard" => Some(ShipId::Vanguard),
            "striker" => Some(ShipId::Striker),
            _ => None,
        }
    }

    /// Catalog entry for this ship
    pub fn def(self) -> &'static ShipDef {
        match self {
            ShipId::Interceptor => &INTERCEPTOR,
            ShipId::Vanguard => &VANGUARD,
            ShipId::Striker => &STRIKER,
        }
    }
}

/// Which stat an upgrade level changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStat {
    Damage,
    SideDamage,
    /// Negative increments shorten the fire interval
    ShootInterval,
    SpreadAngle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeDef {
    /// Key in the persisted upgrade table
    pub key: &'static str,
    pub label: &'static str,
    /// Price of the first level; level `n` costs `cost * (n + 1)`
    pub cost: u64,
    pub max_level: u32,
    pub stat: UpgradeStat,
    /// Change per level
    pub increment: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipDef {
    pub id: ShipId,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u64,
    pub base: ShipStats,
    pub upgrades: &'static [UpgradeDef],
}

impl ShipDef {
    pub fn upgrade(&self, key: &str) -> Option<&'static UpgradeDef> {
        self.upgrades.iter().find(|u| u.key == key)
    }
}

/// Stat block a run is started with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    pub fire_pattern: FirePattern,
    pub damage: f32,
    /// Wing turret damage (`Side` pattern only)
    pub side_damage: f32,
    pub speed: f32,
    pub shoot_interval_ms: f64,
    /// Fan half-angle in radians (`Spread` pattern only)
    pub spread_angle: f32,
}

/// Shortest fire interval upgrades can reach
pub const MIN_SHOOT_INTERVAL_MS: f64 = 50.0;

impl Default for ShipStats {
    fn default() -> Self {
        INTERCEPTOR.base
    }
}

impl ShipStats {
    /// Base stats of the selected ship with every purchased level applied
    pub fn derive(record: &ProgressionRecord) -> Self {
        let def = record.selected().def();
        let mut stats = def.base;
        for upgrade in def.upgrades {
            let levels = record.upgrade_level(def.id, upgrade.key) as f32;
            let delta = upgrade.increment * levels;
            match upgrade.stat {
                UpgradeStat::Damage => stats.damage += delta,
                UpgradeStat::SideDamage => stats.side_damage += delta,
                UpgradeStat::ShootInterval => stats.shoot_interval_ms += delta as f64,
                UpgradeStat::SpreadAngle => stats.spread_angle += delta,
            }
        }
        stats.shoot_interval_ms = stats.shoot_interval_ms.max(MIN_SHOOT_INTERVAL_MS);
        stats
    }
}

static INTERCEPTOR_UPGRADES: [UpgradeDef; 2] = [
    UpgradeDef {
        key: "damage",
        label: "Plasma Damage",
        cost: 100,
        max_level: 5,
        stat: UpgradeStat::Damage,
        increment: 2.0,
    },
    UpgradeDef {
        key: "firerate",
        label: "Fire Rate",
        cost: 150,
        max_level: 5,
        stat: UpgradeStat::ShootInterval,
        increment: -20.0,
    },
];

static VANGUARD_UPGRADES: [UpgradeDef; 2] = [
    UpgradeDef {
        key: "damage",
        label: "Shot Damage",
        cost: 120,
        max_level: 5,
        stat: UpgradeStat::Damage,
        increment: 2.0,
    },
    UpgradeDef {
        key: "spread",
        label: "Spread Width",
        cost: 200,
        max_level: 3,
        stat: UpgradeStat::SpreadAngle,
        increment: 0.05,
    },
];

static STRIKER_UPGRADES: [UpgradeDef; 2] = [
    UpgradeDef {
        key: "mainDamage",
        label: "Main Cannon",
        cost: 150,
        max_level: 5,
        stat: UpgradeStat::Damage,
        increment: 3.0,
    },
    UpgradeDef {
        key: "sideDamage",
        label: "Side Cannons",
        cost: 180,
        max_level: 5,
        stat: UpgradeStat::SideDamage,
        increment: 2.0,
    },
];

static INTERCEPTOR: ShipDef = ShipDef {
    id: ShipId::Interceptor,
    name: "Interceptor",
    description: "Balanced ship with a fast forward plasma cannon.",
    price: 0,
    base: ShipStats {
        fire_pattern: FirePattern::Single,
        damage: 10.0,
        side_damage: 0.0,
        speed: 5.0,
        shoot_interval_ms: 450.0,
        spread_angle: 0.0,
    },
    upgrades: &INTERCEPTOR_UPGRADES,
};

static VANGUARD: ShipDef = ShipDef {
    id: ShipId::Vanguard,
    name: "Vanguard",
    description: "Scatter cannon that fires three shots at once.",
    price: 500,
    base: ShipStats {
        fire_pattern: FirePattern::Spread,
        damage: 7.0,
        side_damage: 0.0,
        speed: 4.5,
        shoot_interval_ms: 500.0,
        spread_angle: 0.2,
    },
    upgrades: &VANGUARD_UPGRADES,
};

static STRIKER: ShipDef = ShipDef {
    id: ShipId::Striker,
    name: "Striker",
    description: "Heavy forward shot backed by two wing cannons.",
    price: 1000,
    base: ShipStats {
        fire_pattern: FirePattern::Side,
        damage: 12.0,
        side_damage: 4.0,
        speed: 4.0,
        shoot_interval_ms: 480.0,
        spread_angle: 0.0,
    },
    upgrades: &STRIKER_UPGRADES,
};

/// Persisted meta progress
///
/// Stored as camelCase JSON so saves stay compatible with the browser build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionRecord {
    pub currency: u64,
    pub selected_ship: String,
    pub unlocked_ships: Vec<String>,
    /// ship id -> upgrade key -> level
    pub ship_upgrades: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Default for ProgressionRecord {
    fn default() -> Self {
        let mut record = Self {
            currency: 0,
            selected_ship: ShipId::BASE.as_str().to_string(),
            unlocked_ships: vec![ShipId::BASE.as_str().to_string()],
            ship_upgrades: BTreeMap::new(),
        };
        record.backfill_upgrades();
        record
    }
}

/// Loose shape used to read saves that may be damaged
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    currency: Value,
    #[serde(default)]
    selected_ship: Option<String>,
    unlocked_ships: Vec<String>,
    #[serde(default)]
    ship_upgrades: BTreeMap<String, BTreeMap<String, Value>>,
}

impl ProgressionRecord {
    /// Parse a saved record
    ///
    /// Anything that is not an object with an `unlockedShips` list yields the
    /// default record. Otherwise bad fields are repaired individually:
    /// non-numeric or negative currency becomes 0, unknown ships are dropped,
    /// a selection that is not owned falls back to the base ship, and missing
    /// upgrade tables are filled with zeros.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<RawRecord>(json) {
            Ok(raw) => Self::sanitize(raw),
            Err(e) => {
                log::warn!("Discarding corrupt progress record: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialize {
            key: PROGRESS_KEY.to_string(),
            reason: e.to_string(),
        })
    }

    fn sanitize(raw: RawRecord) -> Self {
        let currency = match raw.currency.as_f64() {
            Some(c) if c.is_finite() && c > 0.0 => c.floor() as u64,
            _ => 0,
        };

        let mut unlocked_ships = vec![ShipId::BASE.as_str().to_string()];
        for ship in raw.unlocked_ships.iter().filter_map(|s| ShipId::from_str(s)) {
            let id = ship.as_str().to_string();
            if !unlocked_ships.contains(&id) {
                unlocked_ships.push(id);
            }
        }

        let selected_ship = raw
            .selected_ship
            .and_then(|s| ShipId::from_str(&s))
            .map(|s| s.as_str().to_string())
            .filter(|s| unlocked_ships.contains(s))
            .unwrap_or_else(|| ShipId::BASE.as_str().to_string());

        let mut ship_upgrades = BTreeMap::new();
        for (ship_key, levels) in raw.ship_upgrades {
            let Some(ship) = ShipId::from_str(&ship_key) else {
                continue;
            };
            let def = ship.def();
            let table = levels
                .into_iter()
                .filter_map(|(key, value)| {
                    let upgrade = def.upgrade(&key)?;
                    let level = value
                        .as_f64()
                        .filter(|v| v.is_finite() && *v > 0.0)
                        .map(|v| (v.floor() as u32).min(upgrade.max_level))
                        .unwrap_or(0);
                    Some((key, level))
                })
                .collect();
            ship_upgrades.insert(ship.as_str().to_string(), table);
        }

        let mut record = Self {
            currency,
            selected_ship,
            unlocked_ships,
            ship_upgrades,
        };
        record.backfill_upgrades();
        record
    }

    /// Give every catalog ship a full table of upgrade levels
    fn backfill_upgrades(&mut self) {
        for ship in ShipId::ALL {
            let table = self.ship_upgrades.entry(ship.as_str().to_string()).or_default();
            for upgrade in ship.def().upgrades {
                table.entry(upgrade.key.to_string()).or_insert(0);
            }
        }
    }

    /// Load from storage, falling back to the default record
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        match storage.get_item(PROGRESS_KEY) {
            Some(json) => {
                let record = Self::from_json(&json);
                log::info!("Loaded progress: {} credits, ship {}", record.currency, record.selected_ship);
                record
            }
            None => {
                log::info!("No saved progress, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        persistence::save_json(storage, PROGRESS_KEY, self)
    }

    /// Selected ship, or the base ship if the stored id is unknown
    pub fn selected(&self) -> ShipId {
        ShipId::from_str(&self.selected_ship).unwrap_or(ShipId::BASE)
    }

    pub fn owns(&self, ship: ShipId) -> bool {
        self.unlocked_ships.iter().any(|s| s == ship.as_str())
    }

    pub fn upgrade_level(&self, ship: ShipId, key: &str) -> u32 {
        self.ship_upgrades
            .get(ship.as_str())
            .and_then(|t| t.get(key))
            .copied()
            .unwrap_or(0)
    }

    /// Add credits (run payout or achievement reward)
    pub fn credit(&mut self, amount: u64) {
        self.currency = self.currency.saturating_add(amount);
    }

    fn parse_ship(id: &str) -> Result<ShipId, HangarError> {
        ShipId::from_str(id).ok_or_else(|| HangarError::UnknownShip { id: id.to_string() })
    }

    fn spend(&mut self, cost: u64) -> Result<(), HangarError> {
        if self.currency < cost {
            return Err(HangarError::InsufficientCurrency {
                needed: cost,
                available: self.currency,
            });
        }
        self.currency -= cost;
        Ok(())
    }

    /// Buy a ship; it is not selected automatically
    pub fn purchase_ship(&mut self, id: &str) -> Result<(), HangarError> {
        let ship = Self::parse_ship(id)?;
        if self.owns(ship) {
            return Err(HangarError::AlreadyOwned {
                ship: ship.as_str().to_string(),
            });
        }
        self.spend(ship.def().price)?;
        self.unlocked_ships.push(ship.as_str().to_string());
        log::info!("Purchased {}", ship.def().name);
        Ok(())
    }

    pub fn select_ship(&mut self, id: &str) -> Result<(), HangarError> {
        let ship = Self::parse_ship(id)?;
        if !self.owns(ship) {
            return Err(HangarError::ShipLocked {
                ship: ship.as_str().to_string(),
            });
        }
        self.selected_ship = ship.as_str().to_string();
        Ok(())
    }

    /// Price of the next level of `key` on `ship`
    pub fn upgrade_cost(&self, ship_id: &str, key: &str) -> Result<u64, HangarError> {
        let ship = Self::parse_ship(ship_id)?;
        let upgrade = ship.def().upgrade(key).ok_or_else(|| HangarError::UnknownUpgrade {
            ship: ship.as_str().to_string(),
            key: key.to_string(),
        })?;
        let level = self.upgrade_level(ship, key);
        if level >= upgrade.max_level {
            return Err(HangarError::MaxLevel {
                ship: ship.as_str().to_string(),
                key: key.to_string(),
                max: upgrade.max_level,
            });
        }
        Ok(upgrade.cost * (level as u64 + 1))
    }

    /// Buy the next level of an upgrade; returns the new level
    pub fn purchase_upgrade(&mut self, ship_id: &str, key: &str) -> Result<u32, HangarError> {
        let ship = Self::parse_ship(ship_id)?;
        if !self.owns(ship) {
            return Err(HangarError::ShipLocked {
                ship: ship.as_str().to_string(),
            });
        }
        let cost = self.upgrade_cost(ship_id, key)?;
        self.spend(cost)?;

        let level = self
            .ship_upgrades
            .entry(ship.as_str().to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(0);
        *level += 1;
        log::info!("Upgraded {} {} to level {}", ship.def().name, key, level);
        Ok(*level)
    }
}
