//! Persisted favorites and recently-joined lists.
//!
//! One JSON document per list in the data directory. A missing file is an
//! empty list, not an error, so first launch needs no setup step.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::ServerRecord;

const FAVORITES_FILE: &str = "favorites.json";
const RECENT_FILE: &str = "recently_joined.json";

/// A recently-joined entry remembers when the connection happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub server: ServerRecord,
    pub joined_at: DateTime<Utc>,
}

pub struct ListStore {
    dir: PathBuf,
}

impl ListStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load_favorites(&self) -> Result<Vec<ServerRecord>> {
        self.load(FAVORITES_FILE)
    }

    pub fn save_favorites(&self, favorites: &[ServerRecord]) -> Result<()> {
        self.save(FAVORITES_FILE, favorites)
    }

    pub fn load_recent(&self) -> Result<Vec<RecentEntry>> {
        self.load(RECENT_FILE)
    }

    pub fn save_recent(&self, recent: &[RecentEntry]) -> Result<()> {
        self.save(RECENT_FILE, recent)
    }

    fn load<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    fn save<T: Serialize>(&self, file: &str, list: &[T]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.dir.join(file);
        let content = serde_json::to_string_pretty(list).context("failed to serialize list")?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Default data directory under the platform-local application data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("sbl")
}
