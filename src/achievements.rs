//! Achievement definitions and the persisted unlock store
//!
//! Stored as `{ "<id>": { "unlocked": bool } }`. Unlocks are permanent: saving
//! merges with whatever is already in storage and never re-locks an entry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::StorageError;
use crate::persistence::{self, ACHIEVEMENTS_KEY};
use crate::platform::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AchievementId {
    Level5,
    Combo50,
    NoHitBoss,
    Minions100,
    AllPowerups,
    LaserAdept,
    BossHunter,
    CloseCall,
    Tycoon,
}

impl AchievementId {
    pub const ALL: [AchievementId; 9] = [
        AchievementId::Level5,
        AchievementId::Combo50,
        AchievementId::NoHitBoss,
        AchievementId::Minions100,
        AchievementId::AllPowerups,
        AchievementId::LaserAdept,
        AchievementId::BossHunter,
        AchievementId::CloseCall,
        AchievementId::Tycoon,
    ];

    /// Storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::Level5 => "level5",
            AchievementId::Combo50 => "combo50",
            AchievementId::NoHitBoss => "noHitBoss",
            AchievementId::Minions100 => "minions100",
            AchievementId::AllPowerups => "allPowerups",
            AchievementId::LaserAdept => "laserAdept",
            AchievementId::BossHunter => "bossHunter",
            AchievementId::CloseCall => "closeCall",
            AchievementId::Tycoon => "tycoon",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    pub fn title(&self) -> &'static str {
        match self {
            AchievementId::Level5 => "Born Survivor",
            AchievementId::Combo50 => "Combo Master",
            AchievementId::NoHitBoss => "Untouchable",
            AchievementId::Minions100 => "Annihilator",
            AchievementId::AllPowerups => "Collector",
            AchievementId::LaserAdept => "Beam Adept",
            AchievementId::BossHunter => "Boss Hunter",
            AchievementId::CloseCall => "Close Call",
            AchievementId::Tycoon => "Tycoon",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AchievementId::Level5 => "Reach level 5.",
            AchievementId::Combo50 => "Reach a 50 kill combo.",
            AchievementId::NoHitBoss => "Defeat a boss without taking damage.",
            AchievementId::Minions100 => "Destroy 100 minions in one run.",
            AchievementId::AllPowerups => "Use every type of power-up in one run.",
            AchievementId::LaserAdept => "Fire the laser 5 times in one run.",
            AchievementId::BossHunter => "Defeat 3 bosses in one run.",
            AchievementId::CloseCall => "Defeat a boss with 10% health or less.",
            AchievementId::Tycoon => "Earn 200 credits in one run.",
        }
    }

    /// Credits paid out on unlock
    pub fn reward(&self) -> u64 {
        match self {
            AchievementId::Level5 => 200,
            AchievementId::Combo50 => 150,
            AchievementId::NoHitBoss => 150,
            AchievementId::Minions100 => 100,
            AchievementId::AllPowerups => 100,
            AchievementId::LaserAdept => 75,
            AchievementId::BossHunter => 150,
            AchievementId::CloseCall => 100,
            AchievementId::Tycoon => 100,
        }
    }
}

/// Unlocked achievements for this profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementStore {
    unlocked: BTreeSet<AchievementId>,
}

impl AchievementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored table; unknown ids and malformed entries are skipped
    pub fn from_json(json: &str) -> Self {
        let mut store = Self::new();
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => store.merge_table(&map),
            Ok(_) => log::warn!("Discarding achievements table: not an object"),
            Err(e) => log::warn!("Discarding corrupt achievements table: {}", e),
        }
        store
    }

    fn merge_table(&mut self, map: &Map<String, Value>) {
        for (key, entry) in map {
            let unlocked = entry.get("unlocked").and_then(Value::as_bool).unwrap_or(false);
            if let Some(id) = AchievementId::from_str(key).filter(|_| unlocked) {
                self.unlocked.insert(id);
            }
        }
    }

    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        let store = storage
            .get_item(ACHIEVEMENTS_KEY)
            .map(|json| Self::from_json(&json))
            .unwrap_or_default();
        log::info!("Loaded {} unlocked achievements", store.unlocked.len());
        store
    }

    /// Write unlocks back, keeping anything another writer already stored
    pub fn save<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        let mut table = persistence::load_json::<Map<String, Value>, _>(storage, ACHIEVEMENTS_KEY)
            .unwrap_or_default();
        self.merge_into(&mut table);
        persistence::save_json(storage, ACHIEVEMENTS_KEY, &table)
    }

    fn merge_into(&self, table: &mut Map<String, Value>) {
        for id in AchievementId::ALL {
            let stored = table
                .get(id.as_str())
                .and_then(|e| e.get("unlocked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            table.insert(
                id.as_str().to_string(),
                json!({ "unlocked": stored || self.is_unlocked(id) }),
            );
        }
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    /// Returns true if this call unlocked it
    pub fn unlock(&mut self, id: AchievementId) -> bool {
        self.unlocked.insert(id)
    }

    pub fn unlocked_set(&self) -> BTreeSet<AchievementId> {
        self.unlocked.clone()
    }

    /// Every achievement with its unlock state, in display order
    pub fn entries(&self) -> impl Iterator<Item = (AchievementId, bool)> + '_ {
        AchievementId::ALL.into_iter().map(|id| (id, self.is_unlocked(id)))
    }
}
