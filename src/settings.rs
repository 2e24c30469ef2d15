//! Game settings and preferences
//!
//! Persisted separately from progress in storage.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::highscores::DEFAULT_PILOT_NAME;
use crate::persistence::{self, SETTINGS_KEY};
use crate::platform::Storage;

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Scales boss health and speed, minion stats and projectile speed
    pub fn multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Touch layout: drag controls and lighter shotgun volleys
    pub touch_controls: bool,
    /// Render the scrolling starfield
    pub starfield: bool,
    /// Name recorded with high scores
    pub pilot_name: String,
    /// Start runs without the 3 second countdown
    pub skip_countdown: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            touch_controls: false,
            starfield: true,
            pilot_name: DEFAULT_PILOT_NAME.to_string(),
            skip_countdown: false,
        }
    }
}

impl Settings {
    /// Create settings with a difficulty preset
    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Pilot name trimmed to 12 characters, or the default when blank
    pub fn effective_pilot_name(&self) -> String {
        let name: String = self.pilot_name.trim().chars().take(12).collect();
        if name.is_empty() {
            DEFAULT_PILOT_NAME.to_string()
        } else {
            name
        }
    }

    /// Load settings from storage, falling back to defaults
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        match persistence::load_json(storage, SETTINGS_KEY) {
            Some(settings) => {
                log::info!("Loaded settings");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        persistence::save_json(storage, SETTINGS_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStorage;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("easy"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_str("insane"), None);
        assert_eq!(Difficulty::Hard.multiplier(), 1.5);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(SETTINGS_KEY, r#"{"difficulty":"Hard"}"#)
            .unwrap();
        let settings = Settings::load(&storage);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert!(settings.starfield);
        assert_eq!(settings.pilot_name, DEFAULT_PILOT_NAME);
    }

    #[test]
    fn test_roundtrip() {
        let mut storage = MemoryStorage::new();
        let settings = Settings {
            touch_controls: true,
            pilot_name: "MAVERICK".into(),
            ..Settings::with_difficulty(Difficulty::Easy)
        };
        settings.save(&mut storage).unwrap();
        assert_eq!(Settings::load(&storage), settings);
    }

    #[test]
    fn test_pilot_name_trimmed() {
        let settings = Settings {
            pilot_name: "  A_VERY_LONG_PILOT_NAME ".into(),
            ..Settings::default()
        };
        assert_eq!(settings.effective_pilot_name(), "A_VERY_LONG_");
        let blank = Settings {
            pilot_name: " ".into(),
            ..Settings::default()
        };
        assert_eq!(blank.effective_pilot_name(), DEFAULT_PILOT_NAME);
    }
}
