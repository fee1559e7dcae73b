use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sbl::config::AppConfig;
use sbl::context::AppContext;
use sbl::core::{
    ListKind, QueryEngine, SearchData, ServerAddr, ServerRecord, SortOrder, language_catalog,
    project, refresh,
};
use sbl::launcher::{LaunchError, Launcher};
use sbl::logging::{self, LogConfig};
use sbl::masterlist::MasterList;
use sbl::rpc::HttpTransport;
use sbl::storage::ListStore;

#[derive(Parser)]
#[command(name = "sbl")]
#[command(about = "Multiplayer server browser and launcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the internet list, filter and sort it, print it
    Servers(ServersArgs),
    /// Poll one server and stream live snapshots until Ctrl-C
    Watch(WatchArgs),
    /// Launch the game against a server
    Launch(LaunchArgs),
    /// Manage the favorites list
    Favorites(FavoritesArgs),
}

#[derive(Args)]
struct FavoritesArgs {
    #[command(subcommand)]
    action: FavoritesAction,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Add a server by host:port
    Add { address: String },
    /// Remove a server by host:port
    Remove { address: String },
    /// Print the list
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortOrder::Ascending,
            SortArg::Desc => SortOrder::Descending,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    Internet,
    Favorites,
    Recent,
}

impl From<ListArg> for ListKind {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Internet => ListKind::Internet,
            ListArg::Favorites => ListKind::Favorites,
            ListArg::Recent => ListKind::RecentlyJoined,
        }
    }
}

#[derive(Args)]
struct ServersArgs {
    /// Substring match against hostname or game mode
    #[arg(long, default_value = "")]
    query: String,

    #[arg(long)]
    omp_only: bool,

    #[arg(long)]
    non_empty: bool,

    #[arg(long)]
    unpassworded: bool,

    /// Language filters by catalog label (repeatable)
    #[arg(long = "language")]
    languages: Vec<String>,

    #[arg(long)]
    sort_ping: Option<SortArg>,

    #[arg(long)]
    sort_player: Option<SortArg>,

    #[arg(long)]
    sort_name: Option<SortArg>,

    #[arg(long)]
    sort_mode: Option<SortArg>,

    /// Run a background refresh pass before printing, to get live pings
    #[arg(long)]
    refresh: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// host:port
    address: String,

    #[arg(long, value_enum, default_value_t = ListArg::Internet)]
    list: ListArg,
}

#[derive(Args, Serialize)]
struct LaunchArgs {
    /// host:port
    #[serde(skip)]
    address: String,

    #[serde(skip)]
    #[arg(long, default_value = "")]
    password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    nickname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    game_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogConfig {
        json: cli.json_logs,
        verbose: cli.verbose,
    });

    let config = match &cli.command {
        Commands::Launch(args) => AppConfig::load(cli.config.as_deref(), Some(args))?,
        _ => AppConfig::load(cli.config.as_deref(), None::<&()>)?,
    };
    let ctx = AppContext::new(config);

    match cli.command {
        Commands::Servers(args) => run_servers(ctx, args).await,
        Commands::Watch(args) => run_watch(ctx, args).await,
        Commands::Launch(args) => run_launch(ctx, args).await,
        Commands::Favorites(args) => run_favorites(ctx, args).await,
    }
}

async fn run_servers(ctx: AppContext, args: ServersArgs) -> Result<()> {
    let master = MasterList::new(&ctx.config.master_url)?;
    let servers = master
        .fetch_servers()
        .await
        .context("could not fetch the server directory")?;
    ctx.registry.replace_all(ListKind::Internet, servers).await;

    let store = ListStore::new(&ctx.config.data_dir);
    let favorites = store.load_favorites()?;
    ctx.registry
        .replace_all(ListKind::Favorites, favorites)
        .await;

    if args.refresh {
        let transport = Arc::new(HttpTransport::new(&ctx.config.rpc_endpoint)?);
        let engine = QueryEngine::new(transport, ctx.registry.clone());

        let favorites = ctx.registry.list(ListKind::Favorites).await;
        let internet = ctx.registry.list(ListKind::Internet).await;
        refresh::refresh_all(&engine, &favorites, &internet);

        // The scheduler is fire-and-forget; wait until the longest list's
        // final batch has had a moment to land before printing.
        let batches = favorites
            .chunks(refresh::REFRESH_BATCH_SIZE)
            .len()
            .max(internet.chunks(refresh::REFRESH_BATCH_SIZE).len());
        if batches > 0 {
            let wait = refresh::REFRESH_STARTUP_DELAY
                + refresh::REFRESH_BATCH_SPACING * (batches as u32 - 1)
                + Duration::from_millis(1500);
            println!(">> Refreshing {batches} batches, ~{}s...", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    let search = build_search(&args)?;
    let list = project(&ctx.registry.list(ListKind::Internet).await, &search);

    println!(
        "{:<5} {:>7} {:<40} {:<20} {}",
        "PING", "PLAYERS", "HOSTNAME", "MODE", "LANGUAGE"
    );
    for server in &list {
        println!(
            "{:<5} {:>3}/{:<3} {:<40} {:<20} {}",
            server.ping,
            server.player_count,
            server.max_players,
            truncate(&server.hostname, 40),
            truncate(&server.game_mode, 20),
            server.language,
        );
    }
    println!(">> {} servers", list.len());

    Ok(())
}

fn build_search(args: &ServersArgs) -> Result<SearchData> {
    let catalog = language_catalog();
    let mut languages = Vec::new();
    for label in &args.languages {
        let filter = catalog
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(label))
            .with_context(|| format!("unknown language filter: {label}"))?;
        languages.push(filter.clone());
    }

    Ok(SearchData {
        query: args.query.clone(),
        omp_only: args.omp_only,
        non_empty: args.non_empty,
        unpassworded: args.unpassworded,
        languages,
        sort_ping: args.sort_ping.map_or(SortOrder::None, Into::into),
        sort_player: args.sort_player.map_or(SortOrder::None, Into::into),
        sort_name: args.sort_name.map_or(SortOrder::None, Into::into),
        sort_mode: args.sort_mode.map_or(SortOrder::None, Into::into),
    })
}

async fn run_watch(ctx: AppContext, args: WatchArgs) -> Result<()> {
    let addr: ServerAddr = args.address.parse()?;
    let list: ListKind = args.list.into();

    let record = ServerRecord::new(addr.clone());
    ctx.registry.upsert(list, record.clone()).await;

    let transport = Arc::new(HttpTransport::new(&ctx.config.rpc_endpoint)?);
    let engine = QueryEngine::new(transport, ctx.registry.clone());
    engine.start(&record, list).await;

    println!(">> Watching {addr}, Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if let Some(server) = ctx.registry.selected().await {
                    println!(
                        "{} | ping {} | {}/{} players | {} | rules {} | roster {}",
                        server.hostname,
                        server.ping,
                        server.player_count,
                        server.max_players,
                        server.game_mode,
                        server.rules.len(),
                        server.players.len(),
                    );
                }
            }
        }
    }

    engine.stop().await;
    Ok(())
}

async fn run_launch(ctx: AppContext, args: LaunchArgs) -> Result<()> {
    let addr: ServerAddr = args.address.parse()?;

    let store = ListStore::new(&ctx.config.data_dir);
    ctx.registry
        .replace_all(ListKind::Favorites, store.load_favorites()?)
        .await;

    // Prefer the favorite copy: it may carry a remembered password.
    let record = ctx
        .registry
        .get(ListKind::Favorites, &addr)
        .await
        .unwrap_or_else(|| ServerRecord::new(addr.clone()));

    let password = if args.password.is_empty() {
        record.password.clone()
    } else {
        args.password.clone()
    };

    let transport = Arc::new(HttpTransport::new(&ctx.config.rpc_endpoint)?);
    let launcher = Launcher::new(
        transport,
        ctx.registry.clone(),
        ListStore::new(&ctx.config.data_dir),
        ctx.config.clone(),
    );

    match launcher.launch(&record, &password).await {
        Ok(()) => {
            println!(">> Launched {addr}");
            Ok(())
        }
        Err(LaunchError::NeedsElevation) => {
            println!(">> The backend needs elevated privileges; rerun it as administrator.");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_favorites(ctx: AppContext, args: FavoritesArgs) -> Result<()> {
    let store = ListStore::new(&ctx.config.data_dir);
    ctx.registry
        .replace_all(ListKind::Favorites, store.load_favorites()?)
        .await;

    match args.action {
        FavoritesAction::Add { address } => {
            let addr: ServerAddr = address.parse()?;
            if ctx.registry.get(ListKind::Favorites, &addr).await.is_some() {
                println!(">> {addr} is already a favorite");
                return Ok(());
            }
            ctx.registry
                .upsert(ListKind::Favorites, ServerRecord::new(addr.clone()))
                .await;
            store.save_favorites(&ctx.registry.list(ListKind::Favorites).await)?;
            println!(">> Added {addr}");
        }
        FavoritesAction::Remove { address } => {
            let addr: ServerAddr = address.parse()?;
            if ctx.registry.remove(ListKind::Favorites, &addr).await {
                store.save_favorites(&ctx.registry.list(ListKind::Favorites).await)?;
                println!(">> Removed {addr}");
            } else {
                println!(">> {addr} is not a favorite");
            }
        }
        FavoritesAction::List => {
            let favorites = ctx.registry.list(ListKind::Favorites).await;
            for server in &favorites {
                let name = if server.hostname.is_empty() {
                    "(not queried yet)"
                } else {
                    &server.hostname
                };
                println!("{:<21} {}", server.addr.to_string(), name);
            }
            println!(">> {} favorites", favorites.len());
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
