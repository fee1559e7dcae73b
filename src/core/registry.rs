//! Shared mutable server-list state.
//!
//! Holds the internet, favorites and recently-joined collections plus the
//! currently selected server. Every view reads from here and every query
//! response is merged in through here, so all mutation goes through one
//! `RwLock`; a merge is atomic with respect to other tasks.
//!
//! The same logical server may appear in several collections at once —
//! same address, independently merged copies.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::models::{ListKind, ServerAddr, ServerRecord};

#[derive(Default)]
struct Collections {
    internet: Vec<ServerRecord>,
    favorites: Vec<ServerRecord>,
    recently_joined: Vec<ServerRecord>,
    selected: Option<ServerRecord>,
}

impl Collections {
    fn list(&self, kind: ListKind) -> &Vec<ServerRecord> {
        match kind {
            ListKind::Internet => &self.internet,
            ListKind::Favorites => &self.favorites,
            ListKind::RecentlyJoined => &self.recently_joined,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<ServerRecord> {
        match kind {
            ListKind::Internet => &mut self.internet,
            ListKind::Favorites => &mut self.favorites,
            ListKind::RecentlyJoined => &mut self.recently_joined,
        }
    }

    fn sync_selected(&mut self, record: &ServerRecord) {
        if let Some(selected) = &mut self.selected {
            if selected.addr == record.addr {
                *selected = record.clone();
            }
        }
    }
}

/// Cloneable handle over the shared collections. All clones see the same
/// state; this is handed to the query engine, the launch flow and views.
#[derive(Clone, Default)]
pub struct ServerRegistry {
    inner: Arc<RwLock<Collections>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replacement of a collection (directory refresh).
    pub async fn replace_all(&self, kind: ListKind, records: Vec<ServerRecord>) {
        let mut state = self.inner.write().await;
        *state.list_mut(kind) = records;
    }

    /// Insert if the address is absent (appended), otherwise replace in
    /// place, keeping the record's position in the list.
    ///
    /// Upserts into favorites or recently-joined also refresh the selected
    /// slot when the address matches, so the detail view tracks live data.
    pub async fn upsert(&self, kind: ListKind, record: ServerRecord) {
        let mut state = self.inner.write().await;

        let list = state.list_mut(kind);
        match list.iter_mut().find(|r| r.addr == record.addr) {
            Some(existing) => *existing = record.clone(),
            None => list.push(record.clone()),
        }

        if matches!(kind, ListKind::Favorites | ListKind::RecentlyJoined) {
            state.sync_selected(&record);
        }
    }

    /// Remove the record with the given address. Returns whether anything
    /// was removed.
    pub async fn remove(&self, kind: ListKind, addr: &ServerAddr) -> bool {
        let mut state = self.inner.write().await;
        let list = state.list_mut(kind);
        let before = list.len();
        list.retain(|r| r.addr != *addr);
        list.len() != before
    }

    pub async fn get(&self, kind: ListKind, addr: &ServerAddr) -> Option<ServerRecord> {
        let state = self.inner.read().await;
        state.list(kind).iter().find(|r| r.addr == *addr).cloned()
    }

    pub async fn list(&self, kind: ListKind) -> Vec<ServerRecord> {
        let state = self.inner.read().await;
        state.list(kind).clone()
    }

    pub async fn len(&self, kind: ListKind) -> usize {
        let state = self.inner.read().await;
        state.list(kind).len()
    }

    pub async fn set_selected(&self, record: Option<ServerRecord>) {
        let mut state = self.inner.write().await;
        state.selected = record;
    }

    pub async fn selected(&self) -> Option<ServerRecord> {
        let state = self.inner.read().await;
        state.selected.clone()
    }

    /// Atomic read-modify-write for the query engine: apply a field-level
    /// update to the record with `addr` in `kind`, under one lock, so two
    /// in-flight responses can never clobber each other's fields. The
    /// selected slot is refreshed whenever its address matches.
    ///
    /// If the address has left the target list mid-flight, only a
    /// still-matching selected slot is updated — a late response must not
    /// resurrect a removed entry.
    pub async fn merge_with<F>(&self, kind: ListKind, addr: &ServerAddr, apply: F)
    where
        F: FnOnce(&mut ServerRecord),
    {
        let mut state = self.inner.write().await;

        match state.list_mut(kind).iter_mut().position(|r| r.addr == *addr) {
            Some(index) => {
                let record = &mut state.list_mut(kind)[index];
                apply(record);
                let snapshot = record.clone();
                state.sync_selected(&snapshot);
            }
            None => {
                if let Some(selected) = state.selected.as_mut().filter(|r| r.addr == *addr) {
                    apply(selected);
                }
            }
        }
    }

    /// Append-on-connect: re-joining an already-listed server moves it to
    /// the end of recently-joined instead of duplicating it.
    pub async fn touch_recently_joined(&self, record: ServerRecord) {
        let mut state = self.inner.write().await;
        state
            .recently_joined
            .retain(|r| r.addr != record.addr);
        state.sync_selected(&record);
        state.recently_joined.push(record);
    }

    /// Store a user-supplied password on every copy of the record so a
    /// reconnect can reuse it.
    pub async fn set_password(&self, addr: &ServerAddr, password: &str) {
        let mut state = self.inner.write().await;

        for kind in [
            ListKind::Internet,
            ListKind::Favorites,
            ListKind::RecentlyJoined,
        ] {
            if let Some(record) = state.list_mut(kind).iter_mut().find(|r| r.addr == *addr) {
                record.password = password.to_string();
            }
        }

        if let Some(selected) = &mut state.selected {
            if selected.addr == *addr {
                selected.password = password.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host: &str, port: u16) -> ServerRecord {
        ServerRecord::new(ServerAddr::new(host, port))
    }

    #[tokio::test]
    async fn upsert_inserts_then_replaces_in_place() {
        let registry = ServerRegistry::new();

        registry.upsert(ListKind::Internet, record("a", 1)).await;
        registry.upsert(ListKind::Internet, record("b", 2)).await;
        registry.upsert(ListKind::Internet, record("c", 3)).await;

        let mut updated = record("b", 2);
        updated.hostname = "renamed".to_string();
        registry.upsert(ListKind::Internet, updated).await;

        let list = registry.list(ListKind::Internet).await;
        assert_eq!(list.len(), 3);
        // Replacement keeps the original position.
        assert_eq!(list[1].addr, ServerAddr::new("b", 2));
        assert_eq!(list[1].hostname, "renamed");
    }

    #[tokio::test]
    async fn favorites_upsert_syncs_selected() {
        let registry = ServerRegistry::new();
        registry.upsert(ListKind::Favorites, record("a", 1)).await;
        registry.set_selected(Some(record("a", 1))).await;

        let mut updated = record("a", 1);
        updated.ping = 42;
        registry.upsert(ListKind::Favorites, updated).await;

        assert_eq!(registry.selected().await.unwrap().ping, 42);
    }

    #[tokio::test]
    async fn internet_upsert_leaves_selected_alone() {
        let registry = ServerRegistry::new();
        registry.upsert(ListKind::Internet, record("a", 1)).await;
        registry.set_selected(Some(record("a", 1))).await;

        let mut updated = record("a", 1);
        updated.ping = 42;
        registry.upsert(ListKind::Internet, updated).await;

        assert_eq!(registry.selected().await.unwrap().ping, 0);
    }

    #[tokio::test]
    async fn selected_sync_ignores_other_addresses() {
        let registry = ServerRegistry::new();
        registry.set_selected(Some(record("a", 1))).await;

        let mut other = record("b", 2);
        other.ping = 99;
        registry.upsert(ListKind::Favorites, other).await;

        assert_eq!(registry.selected().await.unwrap().addr.host, "a");
        assert_eq!(registry.selected().await.unwrap().ping, 0);
    }

    #[tokio::test]
    async fn merge_with_updates_record_and_selected_in_step() {
        let registry = ServerRegistry::new();
        registry.upsert(ListKind::Internet, record("a", 1)).await;
        registry.set_selected(Some(record("a", 1))).await;

        registry
            .merge_with(ListKind::Internet, &ServerAddr::new("a", 1), |rec| {
                rec.ping = 37;
            })
            .await;

        let addr = ServerAddr::new("a", 1);
        assert_eq!(registry.get(ListKind::Internet, &addr).await.unwrap().ping, 37);
        assert_eq!(registry.selected().await.unwrap().ping, 37);
    }

    #[tokio::test]
    async fn merge_with_does_not_resurrect_but_keeps_selected_fresh() {
        let registry = ServerRegistry::new();
        registry.set_selected(Some(record("a", 1))).await;

        registry
            .merge_with(ListKind::Internet, &ServerAddr::new("a", 1), |rec| {
                rec.ping = 37;
            })
            .await;

        assert_eq!(registry.len(ListKind::Internet).await, 0);
        assert_eq!(registry.selected().await.unwrap().ping, 37);
    }

    #[tokio::test]
    async fn remove_and_replace_all() {
        let registry = ServerRegistry::new();
        registry.upsert(ListKind::Favorites, record("a", 1)).await;
        registry.upsert(ListKind::Favorites, record("b", 2)).await;

        assert!(registry.remove(ListKind::Favorites, &ServerAddr::new("a", 1)).await);
        assert!(!registry.remove(ListKind::Favorites, &ServerAddr::new("a", 1)).await);
        assert_eq!(registry.len(ListKind::Favorites).await, 1);

        registry
            .replace_all(ListKind::Internet, vec![record("x", 1), record("y", 2)])
            .await;
        assert_eq!(registry.len(ListKind::Internet).await, 2);
    }

    #[tokio::test]
    async fn recently_joined_moves_to_end() {
        let registry = ServerRegistry::new();
        registry.touch_recently_joined(record("a", 1)).await;
        registry.touch_recently_joined(record("b", 2)).await;
        registry.touch_recently_joined(record("a", 1)).await;

        let list = registry.list(ListKind::RecentlyJoined).await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].addr, ServerAddr::new("b", 2));
        assert_eq!(list[1].addr, ServerAddr::new("a", 1));
    }

    #[tokio::test]
    async fn password_propagates_to_every_copy() {
        let registry = ServerRegistry::new();
        registry.upsert(ListKind::Internet, record("a", 1)).await;
        registry.upsert(ListKind::Favorites, record("a", 1)).await;
        registry.set_selected(Some(record("a", 1))).await;

        registry
            .set_password(&ServerAddr::new("a", 1), "hunter2")
            .await;

        let addr = ServerAddr::new("a", 1);
        assert_eq!(
            registry.get(ListKind::Internet, &addr).await.unwrap().password,
            "hunter2"
        );
        assert_eq!(
            registry.get(ListKind::Favorites, &addr).await.unwrap().password,
            "hunter2"
        );
        assert_eq!(registry.selected().await.unwrap().password, "hunter2");
    }
}
