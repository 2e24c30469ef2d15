//! Error types
//!
//! Only player-facing purchases and storage writes can fail. Corrupt saved
//! data is never an error: loaders fall back to defaults instead.

use std::fmt;

/// Why a hangar purchase or selection was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HangarError {
    /// No ship with this id in the catalog
    UnknownShip { id: String },
    /// The ship has no upgrade with this key
    UnknownUpgrade { ship: String, key: String },
    /// The ship must be bought first
    ShipLocked { ship: String },
    /// The ship is already in the hangar
    AlreadyOwned { ship: String },
    /// The upgrade is already at its last level
    MaxLevel { ship: String, key: String, max: u32 },
    /// Not enough credits
    InsufficientCurrency { needed: u64, available: u64 },
}

impl fmt::Display for HangarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HangarError::UnknownShip { id } => write!(f, "unknown ship '{}'", id),
            HangarError::UnknownUpgrade { ship, key } => {
                write!(f, "ship '{}' has no upgrade '{}'", ship, key)
            }
            HangarError::ShipLocked { ship } => write!(f, "ship '{}' is not unlocked", ship),
            HangarError::AlreadyOwned { ship } => write!(f, "ship '{}' is already owned", ship),
            HangarError::MaxLevel { ship, key, max } => {
                write!(f, "upgrade '{}' on '{}' is already at level {}", key, ship, max)
            }
            HangarError::InsufficientCurrency { needed, available } => write!(
                f,
                "insufficient credits: need {}, have {}",
                needed, available
            ),
        }
    }
}

impl std::error::Error for HangarError {}

/// Failure writing to a storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No storage backend (private browsing, no window)
    Unavailable,
    /// The backend rejected the write
    Write { key: String, reason: String },
    /// The value could not be encoded
    Serialize { key: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage is unavailable"),
            StorageError::Write { key, reason } => {
                write!(f, "failed to write '{}': {}", key, reason)
            }
            StorageError::Serialize { key, reason } => {
                write!(f, "failed to encode '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for StorageError {}
