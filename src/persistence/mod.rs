//! Save/load helpers with corruption recovery
//!
//! Every persisted table is flat JSON under its own key. Loading never fails:
//! missing data yields `None`, corrupt data is logged and yields `None`, and
//! the caller substitutes its default.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;
use crate::platform::Storage;

pub const PROGRESS_KEY: &str = "aceCraftPlayerProgress";
pub const HIGH_SCORES_KEY: &str = "aceCraftHighScores";
pub const ACHIEVEMENTS_KEY: &str = "aceCraftAchievements";
pub const SETTINGS_KEY: &str = "aceCraftSettings";

/// Load and decode `key`; `None` if absent or corrupt
pub fn load_json<T, S>(storage: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    let raw = storage.get_item(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Discarding corrupt '{}': {}", key, e);
            None
        }
    }
}

/// Encode `value` and store it under `key`
pub fn save_json<T, S>(storage: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: Storage + ?Sized,
{
    let json = serde_json::to_string(value).map_err(|e| StorageError::Serialize {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    storage.set_item(key, &json)
}
