use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use isoladb::Db;

mod account;
mod error;
mod gm;
mod inventories;
mod registry;
mod tick;
mod wiki;
mod ws;

use registry::Registry;

/// Everything a handler needs, injected; no ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub registry: Arc<Registry>,
    /// Names that become GMs when their record is first created.
    pub gm_names: Arc<Vec<String>>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "isola_server\n\n\
USAGE:\n  isola_server [--bind HOST:PORT] [--data-dir PATH] [--tick-interval-s SECONDS]\n\n\
ENV:\n  BIND             default 127.0.0.1:8080\n  DATA_DIR         default data\n  TICK_INTERVAL_S  default 86400\n  GM_NAMES         comma-separated bootstrap GM names\n"
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    data_dir: PathBuf,
    tick_interval: Duration,
    gm_names: Vec<String>,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("BIND")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut data_dir: PathBuf = std::env::var("DATA_DIR")
        .unwrap_or_else(|_| "data".to_string())
        .into();

    let mut tick_s: u64 = std::env::var("TICK_INTERVAL_S")
        .unwrap_or_else(|_| "86400".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let gm_names = std::env::var("GM_NAMES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--data-dir" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                data_dir = v.into();
            }
            "--tick-interval-s" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                tick_s = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        data_dir,
        tick_interval: Duration::from_secs(tick_s.max(1)),
        gm_names,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,isola_server=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();
    let db = Db::open(&cfg.data_dir)?;

    let state = AppState {
        db: Arc::new(db),
        registry: Arc::new(Registry::new()),
        gm_names: Arc::new(cfg.gm_names.clone()),
    };

    tokio::spawn(tick::run(state.clone(), cfg.tick_interval));

    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/login", post(account::login))
        .route("/player", get(account::player_state))
        .route("/gm/state", get(gm::state_view))
        .route("/gm/command", post(gm::command))
        .route("/gm/transfer", post(gm::transfer))
        .route("/inventories", get(inventories::list))
        .route("/inventories/move", post(inventories::move_item))
        .route("/equip", post(inventories::equip))
        .route("/unequip", post(inventories::unequip))
        .route("/dinosaurs", get(wiki::dinosaurs))
        .route("/plants", get(wiki::plants))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    info!(
        bind = %cfg.bind,
        data_dir = %cfg.data_dir.display(),
        tick_interval_s = cfg.tick_interval.as_secs(),
        "isola server listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
        info!("shutdown signal received");
    });

    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await?;
    Ok(())
}

async fn wait_for_shutdown(mut rx: tokio::sync::watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
