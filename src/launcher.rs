//! Game launch flow.
//!
//! Validates the user's settings, hands the connection off to the native
//! injector through the sync RPC route, and on success records the server
//! as recently joined. The injector's one interesting failure mode — the
//! backend needs elevated privileges — comes back as a sentinel body and
//! is surfaced as its own error variant for the caller to present.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::models::ServerRecord;
use crate::core::registry::ServerRegistry;
use crate::rpc::methods;
use crate::rpc::transport::{RpcError, RpcTransport};
use crate::storage::{ListStore, RecentEntry};

/// Injector response body signaling "run me as administrator first".
pub const NEED_ADMIN: &str = "need_admin";

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("game directory is not configured")]
    GameDirNotSet,
    #[error("game directory not found: {0}")]
    GameDirMissing(String),
    #[error("nickname is not configured")]
    NicknameNotSet,
    #[error("elevated privileges are required to start the game")]
    NeedsElevation,
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

pub struct Launcher {
    transport: Arc<dyn RpcTransport>,
    registry: ServerRegistry,
    store: ListStore,
    config: Arc<AppConfig>,
}

impl Launcher {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        registry: ServerRegistry,
        store: ListStore,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            transport,
            registry,
            store,
            config,
        }
    }

    pub async fn launch(&self, server: &ServerRecord, password: &str) -> Result<(), LaunchError> {
        // Remember the password on every copy of the record first, so it
        // survives for reconnects even if the injector fails below.
        if !password.is_empty() {
            self.registry.set_password(&server.addr, password).await;
        }

        let game_dir = &self.config.game_dir;
        if game_dir.as_os_str().is_empty() {
            return Err(LaunchError::GameDirNotSet);
        }
        if !game_dir.exists() {
            return Err(LaunchError::GameDirMissing(game_dir.display().to_string()));
        }

        let nickname = self.config.nickname.trim();
        if nickname.is_empty() {
            return Err(LaunchError::NicknameNotSet);
        }

        let body = methods::inject(
            self.transport.as_ref(),
            nickname,
            &server.addr,
            &game_dir.display().to_string(),
            &self.config.client_dll.display().to_string(),
            password,
        )
        .await?;

        if body == NEED_ADMIN {
            return Err(LaunchError::NeedsElevation);
        }

        info!(addr = %server.addr, "game launched");
        self.record_join(server, password).await;

        Ok(())
    }

    /// Append to recently-joined (move-to-end on rejoin) and persist. A
    /// storage failure is logged but never fails an already-running game.
    async fn record_join(&self, server: &ServerRecord, password: &str) {
        let mut joined = server.clone();
        if !password.is_empty() {
            joined.password = password.to_string();
        }

        self.registry.touch_recently_joined(joined.clone()).await;

        let mut recent = match self.store.load_recent() {
            Ok(recent) => recent,
            Err(e) => {
                warn!(error = %e, "could not load recently-joined list");
                Vec::new()
            }
        };
        recent.retain(|entry| entry.server.addr != joined.addr);
        recent.push(RecentEntry {
            server: joined,
            joined_at: Utc::now(),
        });

        if let Err(e) = self.store.save_recent(&recent) {
            warn!(error = %e, "could not persist recently-joined list");
        }
    }
}
