mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockTransport;
use sbl::core::{ListKind, Player, QueryEngine, QueryMode, RuleSet, ServerAddr, ServerRecord, ServerRegistry};

const INFO_BODY: &str = r#"{"password":false,"players":24,"max_players":100,
    "hostname":"Sunrise Freeroam","gamemode":"freeroam","language":"English"}"#;

fn setup() -> (Arc<MockTransport>, ServerRegistry, QueryEngine) {
    let transport = Arc::new(MockTransport::new());
    let registry = ServerRegistry::new();
    let engine = QueryEngine::new(transport.clone(), registry.clone());
    (transport, registry, engine)
}

fn record(host: &str, port: u16) -> ServerRecord {
    ServerRecord::new(ServerAddr::new(host, port))
}

#[tokio::test]
async fn full_round_merges_every_response() {
    let (transport, registry, engine) = setup();
    transport.respond("request_server_info", INFO_BODY);
    transport.respond("ping_server", "47");
    transport.respond("request_server_rules", r#"[["version","omp 1.2"],["mapname","LS"]]"#);
    transport.respond(
        "request_server_players",
        r#"[{"name":"alice","score":12},{"name":"bob","score":3}]"#,
    );
    transport.respond(
        "request_server_omp_extra_info",
        r#"{"discord_link":"https://discord.gg/x","light_banner_url":"https://x/light.png",
            "dark_banner_url":"https://x/dark.png","logo_url":"https://x/logo.png"}"#,
    );

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Favorites, rec.clone()).await;
    engine
        .query_once(&rec.addr, ListKind::Favorites, QueryMode::Full)
        .await;

    let merged = registry.get(ListKind::Favorites, &rec.addr).await.unwrap();
    assert_eq!(merged.hostname, "Sunrise Freeroam");
    assert_eq!(merged.player_count, 24);
    assert_eq!(merged.ping, 47);
    assert_eq!(merged.rules.version(), Some("omp 1.2"));
    assert_eq!(merged.players.len(), 2);
    assert!(merged.using_omp);
    let extra = merged.extra.as_ref().unwrap();
    assert_eq!(extra.discord_invite.as_deref(), Some("https://discord.gg/x"));
    assert_eq!(extra.banner_light.as_deref(), Some("https://x/light.png"));
    assert_eq!(extra.logo.as_deref(), Some("https://x/logo.png"));
}

#[tokio::test]
async fn ping_only_update_preserves_roster() {
    let (transport, registry, engine) = setup();
    transport.respond("ping_server", "31");
    // Everything else answers "no_data".

    let mut rec = record("51.68.1.2", 7777);
    rec.players = vec![Player {
        name: "alice".to_string(),
        score: 12,
    }];
    rec.rules = RuleSet::from_pairs([("version".to_string(), "1.0".to_string())]);
    registry.upsert(ListKind::Favorites, rec.clone()).await;

    engine
        .query_once(&rec.addr, ListKind::Favorites, QueryMode::Full)
        .await;

    let merged = registry.get(ListKind::Favorites, &rec.addr).await.unwrap();
    assert_eq!(merged.ping, 31);
    assert_eq!(merged.players.len(), 1, "roster must survive a ping update");
    assert_eq!(merged.rules.version(), Some("1.0"));
}

#[tokio::test]
async fn no_data_rules_leaves_record_untouched() {
    let (_transport, registry, engine) = setup();
    // Every method answers "no_data" by default.

    let mut rec = record("51.68.1.2", 7777);
    rec.rules = RuleSet::from_pairs([("weburl".to_string(), "example.com".to_string())]);
    rec.using_omp = true;
    registry.upsert(ListKind::Internet, rec.clone()).await;

    engine
        .query_once(&rec.addr, ListKind::Internet, QueryMode::Full)
        .await;

    let after = registry.get(ListKind::Internet, &rec.addr).await.unwrap();
    assert_eq!(after.rules, rec.rules);
    assert!(after.using_omp);
}

#[tokio::test]
async fn merge_reaches_selected_slot_for_watched_internet_server() {
    let (transport, registry, engine) = setup();
    transport.respond("ping_server", "52");

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Internet, rec.clone()).await;
    registry.set_selected(Some(rec.clone())).await;

    engine
        .query_once(&rec.addr, ListKind::Internet, QueryMode::Basic)
        .await;

    assert_eq!(registry.selected().await.unwrap().ping, 52);
}

#[tokio::test]
async fn merge_does_not_resurrect_removed_server() {
    let (transport, registry, engine) = setup();
    transport.respond("ping_server", "52");

    let rec = record("51.68.1.2", 7777);
    registry.set_selected(Some(rec.clone())).await;
    // The record is not in any list (e.g. removed mid-flight).

    engine
        .query_once(&rec.addr, ListKind::Internet, QueryMode::Basic)
        .await;

    assert_eq!(registry.len(ListKind::Internet).await, 0);
    assert_eq!(registry.selected().await.unwrap().ping, 52);
}

#[tokio::test(start_paused = true)]
async fn watch_polls_on_the_recurring_timer() {
    let (transport, registry, engine) = setup();
    transport.respond("ping_server", "40");

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Favorites, rec.clone()).await;

    engine.start(&rec, ListKind::Favorites).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;
    engine.stop().await;

    let polls = transport.count_for("ping_server", "51.68.1.2");
    assert!(polls >= 3, "expected several poll rounds, got {polls}");
}

#[tokio::test(start_paused = true)]
async fn starting_a_new_watch_stops_the_old_one() {
    let (transport, registry, engine) = setup();
    transport.respond("ping_server", "40");

    let a = record("10.0.0.1", 7777);
    let b = record("10.0.0.2", 7777);
    registry.upsert(ListKind::Favorites, a.clone()).await;
    registry.upsert(ListKind::Internet, b.clone()).await;

    engine.start(&a, ListKind::Favorites).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    engine.start(&b, ListKind::Internet).await;
    assert_eq!(engine.watching().await, Some(b.addr.clone()));

    // Let any already-spawned round for A drain, then snapshot.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls_a = transport.count_for("ping_server", "10.0.0.1");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        transport.count_for("ping_server", "10.0.0.1"),
        polls_a,
        "old watch kept polling after being replaced"
    );
    assert!(transport.count_for("ping_server", "10.0.0.2") >= 5);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_clears_selection() {
    let (_transport, registry, engine) = setup();

    let rec = record("10.0.0.1", 7777);
    registry.upsert(ListKind::Favorites, rec.clone()).await;
    engine.start(&rec, ListKind::Favorites).await;
    assert!(registry.selected().await.is_some());

    engine.stop().await;
    assert!(registry.selected().await.is_none());
    assert_eq!(engine.watching().await, None);

    // Second stop: no panic, same state. A selection made in between
    // stays, because no watch was active to tear down.
    registry.set_selected(Some(rec.clone())).await;
    engine.stop().await;
    assert!(registry.selected().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn extra_info_is_rate_limited_per_address() {
    let (transport, registry, engine) = setup();
    transport.respond(
        "request_server_omp_extra_info",
        r#"{"light_banner_url":"https://x/banner.png"}"#,
    );

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Favorites, rec.clone()).await;

    engine
        .query_once(&rec.addr, ListKind::Favorites, QueryMode::Full)
        .await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    engine
        .query_once(&rec.addr, ListKind::Favorites, QueryMode::Full)
        .await;

    assert_eq!(
        transport.count("request_server_omp_extra_info"),
        1,
        "second round within the window must skip the extra-info call"
    );

    tokio::time::sleep(Duration::from_millis(5000)).await;
    engine
        .query_once(&rec.addr, ListKind::Favorites, QueryMode::Full)
        .await;
    assert_eq!(transport.count("request_server_omp_extra_info"), 2);
}

#[tokio::test(start_paused = true)]
async fn extra_info_window_survives_watch_restarts() {
    let (transport, registry, engine) = setup();
    transport.respond(
        "request_server_omp_extra_info",
        r#"{"light_banner_url":"https://x/banner.png"}"#,
    );

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Favorites, rec.clone()).await;

    engine.start(&rec, ListKind::Favorites).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop().await;

    // Re-selecting the same server right away must not re-fetch.
    engine.start(&rec, ListKind::Favorites).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop().await;

    assert_eq!(transport.count("request_server_omp_extra_info"), 1);
}

#[tokio::test]
async fn basic_mode_skips_roster_and_extra_info() {
    let (transport, registry, engine) = setup();

    let rec = record("51.68.1.2", 7777);
    registry.upsert(ListKind::Internet, rec.clone()).await;

    engine
        .query_once(&rec.addr, ListKind::Internet, QueryMode::Basic)
        .await;

    assert_eq!(transport.count("request_server_info"), 1);
    assert_eq!(transport.count("ping_server"), 1);
    assert_eq!(transport.count("request_server_rules"), 1);
    assert_eq!(transport.count("request_server_players"), 0);
    assert_eq!(transport.count("request_server_omp_extra_info"), 0);
}
