//! Background refresh of whole server lists.
//!
//! On startup (and on any later list refresh) every favorite and every
//! internet server gets one basic-info round, staggered in small batches
//! so hundreds of servers don't hit the RPC bridge at once. Scheduling is
//! fire-and-forget: nothing tracks completion or retries, the next
//! app-level refresh simply walks the lists again.

use std::time::Duration;

use tracing::debug;

use super::models::{ListKind, ServerAddr, ServerRecord};
use super::query::{QueryEngine, QueryMode};

/// Servers queried per batch.
pub const REFRESH_BATCH_SIZE: usize = 2;

/// Gap between consecutive batches of one list walk.
pub const REFRESH_BATCH_SPACING: Duration = Duration::from_millis(2000);

/// Fixed delay before the first batch fires.
pub const REFRESH_STARTUP_DELAY: Duration = Duration::from_millis(500);

/// One scheduled slice of a list walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshBatch {
    pub delay: Duration,
    pub addrs: Vec<ServerAddr>,
}

/// Chunk one collection into batches with linearly increasing delays.
pub fn plan(records: &[ServerRecord]) -> Vec<RefreshBatch> {
    records
        .chunks(REFRESH_BATCH_SIZE)
        .enumerate()
        .map(|(index, chunk)| RefreshBatch {
            delay: REFRESH_STARTUP_DELAY + REFRESH_BATCH_SPACING * index as u32,
            addrs: chunk.iter().map(|r| r.addr.clone()).collect(),
        })
        .collect()
}

/// Walk favorites and the internet list, issuing one basic-info round per
/// server. Each list is staggered independently; the two walks overlap.
pub fn refresh_all(engine: &QueryEngine, favorites: &[ServerRecord], internet: &[ServerRecord]) {
    schedule(engine, favorites, ListKind::Favorites);
    schedule(engine, internet, ListKind::Internet);
}

fn schedule(engine: &QueryEngine, records: &[ServerRecord], list: ListKind) {
    let batches = plan(records);
    debug!(list = %list, servers = records.len(), batches = batches.len(), "refresh scheduled");

    for batch in batches {
        let engine = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(batch.delay).await;
            for addr in batch.addrs {
                engine.spawn_query(addr, list, QueryMode::Basic);
            }
        });
    }
}
