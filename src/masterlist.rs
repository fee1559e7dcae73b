//! Client for the hosted server directory.
//!
//! The directory returns the whole internet list in one compact JSON
//! array; the result wholesale-replaces the Internet collection. Live
//! fields (ping, roster) start defaulted and are filled in later by the
//! query engine.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::core::models::{RuleSet, ServerAddr, ServerRecord};

pub const DEFAULT_MASTER_URL: &str = "https://api.open.mp";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Compact wire record: single-purpose short keys to keep the list small.
#[derive(Debug, Deserialize)]
struct WireServer {
    core: WireCore,
    #[serde(default)]
    ru: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct WireCore {
    gm: String,
    hn: String,
    /// Combined "host:port".
    ip: String,
    la: String,
    pa: bool,
    pc: u32,
    pm: u32,
    vn: String,
    #[serde(default)]
    omp: bool,
    #[serde(default)]
    pr: bool,
}

pub struct MasterList {
    http: reqwest::Client,
    base_url: String,
}

impl MasterList {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("failed to build directory http client")?;

        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full internet list. Entries with a malformed address are
    /// skipped with a warning rather than failing the whole fetch.
    pub async fn fetch_servers(&self) -> Result<Vec<ServerRecord>> {
        let url = format!("{}/servers", self.base_url);

        let list: Vec<WireServer> = self
            .http
            .get(&url)
            .send()
            .await
            .context("directory request failed")?
            .error_for_status()
            .context("directory returned an error status")?
            .json()
            .await
            .context("directory returned malformed JSON")?;

        Ok(list
            .into_iter()
            .filter_map(|wire| match map_server(wire) {
                Ok(record) => Some(record),
                Err(input) => {
                    warn!(input = %input, "skipping directory entry with bad address");
                    None
                }
            })
            .collect())
    }
}

fn map_server(wire: WireServer) -> Result<ServerRecord, String> {
    let addr: ServerAddr = wire.core.ip.parse().map_err(|_| wire.core.ip.clone())?;

    let mut record = ServerRecord::new(addr);
    record.hostname = wire.core.hn;
    record.game_mode = wire.core.gm;
    record.language = wire.core.la;
    record.has_password = wire.core.pa;
    record.player_count = wire.core.pc;
    record.max_players = wire.core.pm;
    record.version = wire.core.vn;
    record.using_omp = wire.core.omp;
    record.partner = wire.core.pr;
    if let Some(rules) = wire.ru {
        record.rules = RuleSet::from_pairs(rules);
    }

    Ok(record)
}
