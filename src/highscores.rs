//! High score leaderboard system
//!
//! Persisted to storage as a JSON array, tracks the top 5 scores. A fresh
//! profile starts with a seeded board so there is something to beat.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::persistence::{self, HIGH_SCORES_KEY};
use crate::platform::Storage;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 5;

/// Name used when the pilot leaves the field blank
pub const DEFAULT_PILOT_NAME: &str = "PILOT";

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: u64,
}

impl HighScoreEntry {
    pub fn new(name: &str, score: u64) -> Self {
        Self {
            name: name.to_string(),
            score,
        }
    }
}

/// High score leaderboard, sorted descending by score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl Default for HighScores {
    /// The seeded board a new profile starts with
    fn default() -> Self {
        Self {
            entries: vec![
                HighScoreEntry::new("ACE_PILOT", 150_000),
                HighScoreEntry::new("VOID_DRIFTER", 100_000),
                HighScoreEntry::new("NOVA_STRIKER", 75_000),
                HighScoreEntry::new("CYGNUS_X1", 40_000),
                HighScoreEntry::new("ROOKIE", 10_000),
            ],
        }
    }
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sort descending and trim; used after loading untrusted data
    fn normalize(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, name: &str, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_PILOT_NAME } else { name };
        let entry = HighScoreEntry::new(name, score);

        // Ties go below existing entries
        let rank = match self.entries.iter().position(|e| score > e.score) {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load from storage; missing or corrupt data gives the seeded board
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        match persistence::load_json::<HighScores, _>(storage, HIGH_SCORES_KEY) {
            Some(mut scores) => {
                scores.normalize();
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            None => {
                log::info!("No high scores found, using the default board");
                Self::default()
            }
        }
    }

    pub fn save<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        persistence::save_json(storage, HIGH_SCORES_KEY, self)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}
