use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::HIGH_SCORE_KEY;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredScore {
    value: u32,
    #[serde(rename = "updatedAt", alias = "updated_at")]
    updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HighScoreFile {
    version: u8,
    entries: HashMap<String, StoredScore>,
}

#[derive(Clone, Debug, Deserialize)]
struct HighScoreFileRaw {
    version: u8,
    entries: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreResponse {
    pub value: u32,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
}

/// Durable best score, stored as a tiny versioned key-value JSON document.
pub struct HighScoreStore {
    file_path: PathBuf,
    entries: HashMap<String, StoredScore>,
}

impl HighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let entries = load_entries(&file_path);
        Self { file_path, entries }
    }

    pub fn get(&self) -> u32 {
        self.entries
            .get(HIGH_SCORE_KEY)
            .map_or(0, |entry| entry.value)
    }

    /// Stores `value` if it beats the current best. Returns whether it did.
    pub fn record(&mut self, value: u32) -> bool {
        if value <= self.get() {
            return false;
        }
        self.entries.insert(
            HIGH_SCORE_KEY.to_string(),
            StoredScore {
                value,
                updated_at: now_iso(),
            },
        );
        self.save();
        info!(value, "new high score stored");
        true
    }

    pub fn build_response(&self) -> HighScoreResponse {
        let entry = self.entries.get(HIGH_SCORE_KEY);
        HighScoreResponse {
            value: entry.map_or(0, |entry| entry.value),
            updated_at: entry.map(|entry| entry.updated_at.clone()),
            generated_at_iso: now_iso(),
        }
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), %error, "failed to create high score dir");
                return;
            }
        }

        let payload = HighScoreFile {
            version: 1,
            entries: self.entries.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    warn!(path = %self.file_path.display(), %error, "failed to write high score");
                }
            }
            Err(error) => {
                warn!(path = %self.file_path.display(), %error, "failed to serialize high score");
            }
        }
    }
}

fn load_entries(path: &Path) -> HashMap<String, StoredScore> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read high score");
            }
            return HashMap::new();
        }
    };

    let parsed = match serde_json::from_str::<HighScoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(
                version = value.version,
                path = %path.display(),
                "unsupported high score file version"
            );
            return HashMap::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse high score");
            return HashMap::new();
        }
    };

    let mut entries = HashMap::new();
    for (key, raw_value) in parsed.entries {
        match serde_json::from_value::<StoredScore>(raw_value) {
            Ok(entry) => {
                entries.insert(key, entry);
            }
            Err(error) => {
                warn!(%key, path = %path.display(), %error, "skipping malformed high score entry");
            }
        }
    }
    entries
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
