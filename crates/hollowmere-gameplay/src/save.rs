//! Save/Load game state system.
//!
//! A save is one versioned JSON document per slot holding the player's
//! progress plus the quest, achievement and inventory snapshots. Missing
//! keys fall back to defaults so older saves keep loading.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hollowmere_common::SchemaVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::achievement::AchievementSaveData;
use crate::inventory::InventorySaveData;
use crate::player::PlayerProgress;
use crate::quest::QuestSaveData;

/// In-game hour a fresh save starts at.
pub const DEFAULT_GAME_HOUR: f32 = 8.0;

/// Default number of save slots.
pub const DEFAULT_SLOT_COUNT: u32 = 3;

/// Errors that can occur during save/load operations.
#[derive(Debug, Error)]
pub enum SaveError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Version mismatch
    #[error("Incompatible save version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Found version
        found: String,
    },

    /// Save file not found
    #[error("Save not found: slot {0}")]
    NotFound(u32),

    /// Slot number out of range
    #[error("Invalid save slot {slot} (have {count})")]
    InvalidSlot {
        /// Requested slot
        slot: u32,
        /// Number of slots
        count: u32,
    },
}

/// Result type for save operations.
pub type SaveResult<T> = Result<T, SaveError>;

fn default_game_hour() -> f32 {
    DEFAULT_GAME_HOUR
}

fn default_area() -> String {
    "village".to_string()
}

/// Complete game save data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Save format version
    #[serde(default)]
    pub version: SchemaVersion,
    /// Save timestamp (Unix seconds)
    #[serde(default)]
    pub timestamp: u64,
    /// Save name/description
    #[serde(default)]
    pub name: String,
    /// Random seed of the session
    #[serde(default)]
    pub seed: u64,
    /// Total playtime (real seconds)
    #[serde(default)]
    pub playtime: f64,
    /// Hour of the in-game day
    #[serde(default = "default_game_hour")]
    pub game_hour: f32,
    /// Area the player was in
    #[serde(default = "default_area")]
    pub current_area: String,
    /// Player stats and position
    #[serde(default)]
    pub player: PlayerProgress,
    /// Quest statuses and progress
    #[serde(default)]
    pub quests: QuestSaveData,
    /// Unlocked achievements and counters
    #[serde(default)]
    pub achievements: AchievementSaveData,
    /// Stacks and equipment
    #[serde(default)]
    pub inventory: InventorySaveData,
    /// Chests already opened
    #[serde(default)]
    pub opened_chests: BTreeSet<String>,
}

impl Default for SaveGame {
    fn default() -> Self {
        Self {
            version: SchemaVersion::SAVE_FILE,
            timestamp: current_timestamp(),
            name: String::new(),
            seed: 0,
            playtime: 0.0,
            game_hour: DEFAULT_GAME_HOUR,
            current_area: default_area(),
            player: PlayerProgress::default(),
            quests: QuestSaveData::default(),
            achievements: AchievementSaveData::default(),
            inventory: InventorySaveData::default(),
            opened_chests: BTreeSet::new(),
        }
    }
}

impl SaveGame {
    /// Creates a new save game with default values.
    #[must_use]
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            seed,
            ..Default::default()
        }
    }

    /// Sets playtime.
    #[must_use]
    pub fn with_playtime(mut self, playtime: f64) -> Self {
        self.playtime = playtime;
        self
    }

    /// Sets the player data.
    #[must_use]
    pub fn with_player(mut self, player: PlayerProgress) -> Self {
        self.player = player;
        self
    }

    /// Updates timestamp to current time.
    pub fn update_timestamp(&mut self) {
        self.timestamp = current_timestamp();
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> SaveResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SaveError::Serialization(e.to_string()))
    }

    /// Parses JSON, rejecting saves from another major version.
    pub fn from_json(json: &str) -> SaveResult<Self> {
        let save: SaveGame =
            serde_json::from_str(json).map_err(|e| SaveError::Serialization(e.to_string()))?;
        if !SchemaVersion::SAVE_FILE.can_read(&save.version) {
            return Err(SaveError::VersionMismatch {
                expected: SchemaVersion::SAVE_FILE.to_string(),
                found: save.version.to_string(),
            });
        }
        Ok(save)
    }
}

/// Save metadata for listing saves without loading full data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// Slot number
    pub slot: u32,
    /// Save name
    pub name: String,
    /// Save timestamp
    pub timestamp: u64,
    /// Total playtime
    pub playtime: f64,
    /// Player level
    pub level: u32,
    /// Area the player was in
    pub area: String,
    /// Save file size in bytes
    pub file_size: u64,
}

impl SaveMetadata {
    /// Creates metadata from a save game.
    #[must_use]
    pub fn from_save(slot: u32, save: &SaveGame, file_size: u64) -> Self {
        Self {
            slot,
            name: save.name.clone(),
            timestamp: save.timestamp,
            playtime: save.playtime,
            level: save.player.level,
            area: save.current_area.clone(),
            file_size,
        }
    }

    /// Returns formatted playtime as HH:MM:SS.
    #[must_use]
    pub fn formatted_playtime(&self) -> String {
        let total_secs = self.playtime as u64;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Save manager for handling save slots.
#[derive(Debug, Clone)]
pub struct SaveManager {
    /// Directory for save files
    save_dir: PathBuf,
    /// Number of slots
    slot_count: u32,
}

impl SaveManager {
    /// Creates a new save manager with the given save directory.
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            slot_count: DEFAULT_SLOT_COUNT,
        }
    }

    /// Sets the number of slots.
    #[must_use]
    pub fn with_slot_count(mut self, slot_count: u32) -> Self {
        self.slot_count = slot_count.max(1);
        self
    }

    /// Gets the save directory path.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Number of slots.
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Ensures the save directory exists.
    pub fn ensure_dir(&self) -> SaveResult<()> {
        fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }

    fn check_slot(&self, slot: u32) -> SaveResult<()> {
        if slot < self.slot_count {
            Ok(())
        } else {
            Err(SaveError::InvalidSlot {
                slot,
                count: self.slot_count,
            })
        }
    }

    /// Gets the path for a slot file.
    #[must_use]
    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.save_dir.join(format!("slot_{slot}.json"))
    }

    fn temp_path(&self, slot: u32) -> PathBuf {
        self.save_dir.join(format!("slot_{slot}.json.tmp"))
    }

    /// Writes a save to a slot.
    ///
    /// Uses atomic write (write to temp, then rename) for safety.
    pub fn save_slot(&self, slot: u32, data: &SaveGame) -> SaveResult<()> {
        self.check_slot(slot)?;
        self.ensure_dir()?;

        let json = data.to_json()?;
        let temp_path = self.temp_path(slot);
        let final_path = self.slot_path(slot);

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &final_path)?;
        info!("Saved slot {} ({} bytes)", slot, json.len());
        Ok(())
    }

    /// Reads a slot, reporting why it failed.
    pub fn try_load_slot(&self, slot: u32) -> SaveResult<SaveGame> {
        self.check_slot(slot)?;
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::NotFound(slot));
        }
        let json = fs::read_to_string(&path)?;
        SaveGame::from_json(&json)
    }

    /// Reads a slot. Missing or corrupt saves are "no save".
    #[must_use]
    pub fn load_slot(&self, slot: u32) -> Option<SaveGame> {
        match self.try_load_slot(slot) {
            Ok(save) => {
                info!("Loaded slot {}", slot);
                Some(save)
            },
            Err(SaveError::NotFound(_)) => None,
            Err(err) => {
                warn!("Ignoring unreadable save slot {}: {}", slot, err);
                None
            },
        }
    }

    /// Checks if a slot holds a save.
    #[must_use]
    pub fn slot_exists(&self, slot: u32) -> bool {
        slot < self.slot_count && self.slot_path(slot).exists()
    }

    /// Deletes a slot.
    pub fn delete_slot(&self, slot: u32) -> SaveResult<()> {
        self.check_slot(slot)?;
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::NotFound(slot));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Metadata for every readable slot, in slot order.
    #[must_use]
    pub fn list_slots(&self) -> Vec<SaveMetadata> {
        (0..self.slot_count)
            .filter_map(|slot| {
                let save = self.try_load_slot(slot).ok()?;
                let file_size = fs::metadata(self.slot_path(slot))
                    .map(|m| m.len())
                    .unwrap_or(0);
                Some(SaveMetadata::from_save(slot, &save, file_size))
            })
            .collect()
    }
}

/// Returns current Unix timestamp.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
