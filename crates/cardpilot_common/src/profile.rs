//! Profile Store - read-only user profile backing the action tools
//!
//! Loads the profile JSON fresh on every read. The file is read-only in this
//! system's scope, so there is no cache or invalidation. A missing or invalid
//! profile is a hard error; the CLI treats it as fatal at startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default profile location, relative to the working directory
pub const DEFAULT_PROFILE_PATH: &str = "data/mock_cards.json";

/// Profile store errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A card on file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub masked_number: String,
    pub status: String,
}

/// Default delivery address on file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub country: String,
}

/// User profile: id, default address, cards on file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Profile {
    /// Format the default address as one comma-separated line.
    /// Empty edge components leave no dangling punctuation.
    pub fn default_address(&self) -> String {
        let a = &self.address;
        let line = format!(
            "{}, {}, {}, {}-{}, {}",
            a.line1, a.line2, a.city, a.state, a.pincode, a.country
        );
        line.trim_matches(|c| c == ',' || c == ' ').to_string()
    }
}

/// File-backed profile source
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile from disk. Called fresh on every read.
    pub fn load(&self) -> Result<Profile, ProfileError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ProfileError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ProfileError::InvalidJson {
            path: self.path.clone(),
            source,
        })
    }
}
