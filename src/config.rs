//! Application configuration.
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `SBL_`-prefixed environment variables, then CLI overrides. The
//! polling cadences and batch sizes are deliberately not configurable —
//! they are part of the protocol behavior, not user preference.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::storage::default_data_dir;

pub const DEFAULT_RPC_ENDPOINT: &str = "http://127.0.0.1:46290";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the local backend RPC bridge.
    pub rpc_endpoint: String,
    /// Base URL of the hosted server directory.
    pub master_url: String,
    /// In-game nickname.
    pub nickname: String,
    /// Game install directory handed to the injector.
    pub game_dir: PathBuf,
    /// Client DLL injected alongside the game.
    pub client_dll: PathBuf,
    /// Where persisted lists live.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            master_url: crate::masterlist::DEFAULT_MASTER_URL.to_string(),
            nickname: String::new(),
            game_dir: PathBuf::new(),
            client_dll: PathBuf::new(),
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Merge defaults, the optional config file, environment and CLI
    /// overrides, in that order.
    pub fn load<A: Serialize>(file: Option<&Path>, overrides: Option<&A>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed("SBL_"));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().context("invalid configuration")
    }

    /// Write a starter config file with the current values.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
