// Snake draft server entry point.
//
// Startup sequence:
// 1. Parse arguments, load config
// 2. Initialize tracing
// 3. Load the player catalog
// 4. Open the pick ledger (memory or sqlite)
// 5. Spawn the autopick scheduler
// 6. Serve HTTP until Ctrl+C

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use snakedraft_core::config::{self, Config, StorageMode};
use snakedraft_core::ledger::{MemoryLedger, PickLedger, SqliteLedger};
use snakedraft_core::valuation::catalog::PlayerPool;
use snakedraft_core::{DraftEngine, EngineSettings};
use snakedraft_server::{build_router, scheduler, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "snakedraft", version, about = "Snake draft turn engine")]
struct Args {
    /// Directory holding config/, defaults/ and data/.
    #[arg(long, env = "SNAKEDRAFT_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Override the configured listen port.
    #[arg(long, env = "SNAKEDRAFT_PORT")]
    port: Option<u16>,

    /// Force in-memory storage regardless of config.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Arguments and config
    let args = Args::parse();
    let mut config = config::load_config(&args.base_dir).context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.ephemeral {
        config.storage.mode = StorageMode::Memory;
    }

    // 2. Tracing
    init_tracing(&config)?;
    info!("snakedraft v{} starting up", env!("CARGO_PKG_VERSION"));

    // 3. Player catalog
    let catalog = PlayerPool::from_csv(&config.players_path())
        .context("failed to load player catalog")?;
    info!("catalog ready with {} players", catalog.len());

    // 4. Pick ledger
    let ledger = open_ledger(&config)?;
    let engine = Arc::new(DraftEngine::new(
        ledger,
        Arc::new(catalog),
        EngineSettings::from_config(&config),
    ));

    // 5. Scheduler
    let scheduler_handle = if config.server.scheduler_enabled {
        let period = Duration::from_millis(config.engine.scheduler_interval_ms);
        Some(tokio::spawn(scheduler::run(Arc::clone(&engine), period)))
    } else {
        info!("autopick scheduler disabled");
        None
    };

    // 6. HTTP
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, build_router(AppState::new(engine)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = scheduler_handle {
        handle.abort();
    }
    info!("snakedraft shut down cleanly");
    Ok(())
}

fn open_ledger(config: &Config) -> anyhow::Result<Arc<dyn PickLedger>> {
    match config.storage.mode {
        StorageMode::Memory => {
            info!("using in-memory ledger; drafts are lost on restart");
            Ok(Arc::new(MemoryLedger::new()))
        }
        StorageMode::Sqlite => {
            let path = config.storage.resolved_path(&config.base_dir)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let path_str = path
                .to_str()
                .with_context(|| format!("ledger path is not valid UTF-8: {}", path.display()))?;
            let ledger = SqliteLedger::open(path_str)?;
            info!("sqlite ledger opened at {}", path.display());
            Ok(Arc::new(ledger))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Initialize tracing to stderr, or to `logs/snakedraft.log` under the base
/// directory when `server.log_to_file` is set.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("snakedraft=info,snakedraft_core=info,snakedraft_server=info,warn")
    });
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    if config.server.log_to_file {
        let log_file = create_log_file(&config.base_dir)?;
        let subscriber = builder
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .with_thread_ids(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    } else {
        let subscriber = builder.with_writer(std::io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    }
    Ok(())
}

fn create_log_file(base_dir: &Path) -> anyhow::Result<std::fs::File> {
    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    Ok(std::fs::File::create(log_dir.join("snakedraft.log"))?)
}
