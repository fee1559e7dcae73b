//! Live server polling.
//!
//! The query engine watches at most one server at a time (the one the
//! detail pane is showing) and polls it on a fixed cadence. One round
//! fires the backend queries concurrently and merges every response into
//! the registry the moment it individually completes — rounds are not
//! atomic, and a round may still be in flight when the next one starts.
//! Each merge overwrites only the fields its query touched on the
//! last-known record, atomically, so a ping update can never clobber a
//! previously fetched roster.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::models::{ListKind, PING_UNREACHABLE, Player, RuleSet, ServerAddr, ServerRecord};
use super::registry::ServerRegistry;
use crate::rpc::methods::{self, InfoPayload};
use crate::rpc::transport::RpcTransport;

/// Cadence of the recurring poll while a watch is active.
pub const QUERY_INTERVAL: Duration = Duration::from_millis(1000);

/// Floor between extra-info fetches for one address. Banner art and the
/// invite link change far less often than ping or roster state.
pub const EXTRA_INFO_MIN_INTERVAL: Duration = Duration::from_millis(5000);

/// How much of a round to issue.
///
/// `Basic` covers what list rows display (info, ping, rules); the roster
/// and extra-info queries only matter in the detail view and are skipped
/// during bulk refresh to keep the load down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Full,
    Basic,
}

enum WatchState {
    Idle,
    Active {
        addr: ServerAddr,
        cancel: CancellationToken,
    },
}

/// The polling engine. Cloneable handle; all clones share one watch slot
/// and one extra-info table, so starting a watch anywhere replaces the
/// previous one system-wide.
#[derive(Clone)]
pub struct QueryEngine {
    transport: Arc<dyn RpcTransport>,
    registry: ServerRegistry,
    watch: Arc<Mutex<WatchState>>,
    extra_info_fetched: Arc<RwLock<HashMap<ServerAddr, Instant>>>,
}

impl QueryEngine {
    pub fn new(transport: Arc<dyn RpcTransport>, registry: ServerRegistry) -> Self {
        Self {
            transport,
            registry,
            watch: Arc::new(Mutex::new(WatchState::Idle)),
            extra_info_fetched: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start watching `server`: tear down any previous watch, select the
    /// server, fire one full round immediately and keep polling every
    /// [`QUERY_INTERVAL`] until stopped.
    pub async fn start(&self, server: &ServerRecord, list: ListKind) {
        let cancel = CancellationToken::new();
        {
            let mut watch = self.watch.lock().await;
            if let WatchState::Active { addr, cancel: old } =
                mem::replace(&mut *watch, WatchState::Idle)
            {
                old.cancel();
                debug!(addr = %addr, "replacing active watch");
            }
            *watch = WatchState::Active {
                addr: server.addr.clone(),
                cancel: cancel.clone(),
            };
        }

        self.registry.set_selected(Some(server.clone())).await;
        info!(addr = %server.addr, list = %list, "watch started");

        let engine = self.clone();
        let addr = server.addr.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(QUERY_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    // The ticker does not wait for the previous round's
                    // calls to resolve; overlapping in-flight rounds are
                    // tolerated because merges are per-field overwrites.
                    _ = ticker.tick() => engine.spawn_query(addr.clone(), list, QueryMode::Full),
                }
            }
        });
    }

    /// Stop the active watch and clear the selection. Idempotent: with no
    /// active watch this is a no-op. In-flight calls are not cancelled —
    /// their merges still land in the server's own list entry.
    pub async fn stop(&self) {
        let previous = {
            let mut watch = self.watch.lock().await;
            mem::replace(&mut *watch, WatchState::Idle)
        };

        if let WatchState::Active { addr, cancel } = previous {
            cancel.cancel();
            self.registry.set_selected(None).await;
            info!(addr = %addr, "watch stopped");
        }
    }

    /// Address currently being watched, if any.
    pub async fn watching(&self) -> Option<ServerAddr> {
        match &*self.watch.lock().await {
            WatchState::Idle => None,
            WatchState::Active { addr, .. } => Some(addr.clone()),
        }
    }

    /// Fire-and-forget round, used by the poll loop and bulk refresh.
    pub fn spawn_query(&self, addr: ServerAddr, list: ListKind, mode: QueryMode) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.query_once(&addr, list, mode).await;
        });
    }

    /// Run one query round to completion. The individual calls run
    /// concurrently and each merges as soon as it completes.
    pub async fn query_once(&self, addr: &ServerAddr, list: ListKind, mode: QueryMode) {
        match mode {
            QueryMode::Basic => {
                tokio::join!(
                    self.fetch_info(addr, list),
                    self.fetch_ping(addr, list),
                    self.fetch_rules(addr, list),
                );
            }
            QueryMode::Full => {
                tokio::join!(
                    self.fetch_info(addr, list),
                    self.fetch_ping(addr, list),
                    self.fetch_rules(addr, list),
                    self.fetch_players(addr, list),
                    self.fetch_extra_info(addr, list),
                );
            }
        }
    }

    async fn fetch_info(&self, addr: &ServerAddr, list: ListKind) {
        match methods::server_info(self.transport.as_ref(), addr).await {
            Ok(Some(info)) => {
                self.registry
                    .merge_with(list, addr, |rec| apply_info(rec, &info))
                    .await;
            }
            Ok(None) => {}
            Err(e) => debug!(addr = %addr, error = %e, "info query failed"),
        }
    }

    async fn fetch_ping(&self, addr: &ServerAddr, list: ListKind) {
        match methods::server_ping(self.transport.as_ref(), addr).await {
            Ok(body) => {
                self.registry
                    .merge_with(list, addr, |rec| apply_ping(rec, &body))
                    .await;
            }
            Err(e) => debug!(addr = %addr, error = %e, "ping query failed"),
        }
    }

    async fn fetch_rules(&self, addr: &ServerAddr, list: ListKind) {
        match methods::server_rules(self.transport.as_ref(), addr).await {
            Ok(Some(pairs)) => {
                self.registry
                    .merge_with(list, addr, |rec| apply_rules(rec, pairs))
                    .await;
            }
            Ok(None) => {}
            Err(e) => debug!(addr = %addr, error = %e, "rules query failed"),
        }
    }

    async fn fetch_players(&self, addr: &ServerAddr, list: ListKind) {
        match methods::server_players(self.transport.as_ref(), addr).await {
            Ok(Some(players)) => {
                self.registry
                    .merge_with(list, addr, |rec| apply_players(rec, players))
                    .await;
            }
            Ok(None) => {}
            Err(e) => debug!(addr = %addr, error = %e, "players query failed"),
        }
    }

    async fn fetch_extra_info(&self, addr: &ServerAddr, list: ListKind) {
        if !self.extra_info_due(addr).await {
            return;
        }

        match methods::server_extra_info(self.transport.as_ref(), addr).await {
            Ok(Some(extra)) => {
                self.extra_info_fetched
                    .write()
                    .await
                    .insert(addr.clone(), Instant::now());
                self.registry
                    .merge_with(list, addr, |rec| {
                        rec.extra = Some(extra);
                        rec.using_omp = true;
                    })
                    .await;
            }
            Ok(None) => {}
            Err(e) => debug!(addr = %addr, error = %e, "extra info query failed"),
        }
    }

    /// The rate limit is keyed by address and survives watch restarts:
    /// re-selecting a server within the window does not re-fetch.
    async fn extra_info_due(&self, addr: &ServerAddr) -> bool {
        let fetched = self.extra_info_fetched.read().await;
        match fetched.get(addr) {
            Some(at) => at.elapsed() >= EXTRA_INFO_MIN_INTERVAL,
            None => true,
        }
    }
}

fn apply_info(rec: &mut ServerRecord, info: &InfoPayload) {
    rec.has_password = info.password;
    rec.player_count = info.players;
    rec.max_players = info.max_players;
    rec.hostname = info.hostname.clone();
    rec.game_mode = info.gamemode.clone();
    rec.language = info.language.clone();
}

/// Sentinel rules for ping:
/// - a numeric body is the measured ping, except the sentinel value,
///   which only lands on a never-queried (0) record — one transient
///   failure must not discard a known-good reading;
/// - a non-numeric body forces the sentinel.
fn apply_ping(rec: &mut ServerRecord, body: &str) {
    match body.trim().parse::<u32>() {
        Ok(ping) if ping >= PING_UNREACHABLE => {
            if rec.ping == 0 {
                rec.ping = PING_UNREACHABLE;
            }
        }
        Ok(ping) => rec.ping = ping,
        Err(_) => rec.ping = PING_UNREACHABLE,
    }
}

fn apply_rules(rec: &mut ServerRecord, pairs: Vec<(String, String)>) {
    rec.rules = RuleSet::from_pairs(pairs);
}

/// The roster is replaced wholesale on every successful players query.
fn apply_players(rec: &mut ServerRecord, players: Vec<Player>) {
    rec.players = players;
}
