use anyhow::Context;
use clap::Parser;
use medex_config::{AppConfig, ConfigSource};
use medex_core::{
    CatalogStore, CatalogSynchronizer, DeadLetterLog, IngestPipeline, InitialScanner, PathWatcher,
    PipelineConfig, SyncConfig,
};
use medex_server::{routes, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "medex-server",
    version,
    about = "Patient-record file catalog: ingestion pipeline and read API"
)]
struct Cli {
    /// Configuration file (TOML or JSON). Skips the MEDEX_CONFIG_* lookup
    /// chain.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the SQLite database file.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Override the HTTP bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Add a share root to watch (repeatable). Replaces configured roots.
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Force the startup scan on.
    #[arg(long, conflicts_with = "no_scan")]
    scan: bool,

    /// Skip the startup scan.
    #[arg(long)]
    no_scan: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (mut config, source) = match &cli.config {
        Some(path) => (
            AppConfig::load_from_file(path)?,
            ConfigSource::File(path.clone()),
        ),
        None => AppConfig::load_from_env()?,
    };
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(bind) = cli.bind {
        config.http.bind = bind;
    }
    if !cli.roots.is_empty() {
        config.roots = cli.roots;
    }
    if cli.scan {
        config.scan_on_start = true;
    }
    if cli.no_scan {
        config.scan_on_start = false;
    }
    info!(?source, roots = config.roots.len(), "configuration loaded");

    if config.roots.is_empty() {
        anyhow::bail!("no share roots configured");
    }

    prepare_directories(&config).await?;

    let store = CatalogStore::open(&config.database_path).await?;

    let synchronizer = Arc::new(CatalogSynchronizer::new(
        store.clone(),
        DeadLetterLog::new(config.dead_letter_path()),
        SyncConfig {
            max_write_attempts: config.ingest.write_retry_attempts,
            retry_backoff: Duration::from_millis(config.ingest.write_retry_backoff_ms),
        },
    ));
    let pipeline = IngestPipeline::spawn(
        synchronizer,
        &PipelineConfig {
            queue_capacity: config.ingest.queue_capacity,
            workers: config.ingest.sync_workers,
            shutdown_grace: Duration::from_millis(config.ingest.shutdown_grace_ms),
        },
    );

    // Root by root: finish the startup walk before live watching begins,
    // so the walk and the live stream cannot reorder a path's events.
    let mut watcher = PathWatcher::new(pipeline.sender());
    let scanner = InitialScanner::new(pipeline.sender());
    for root in &config.roots {
        if !root.is_dir() {
            warn!(root = %root.display(), "root does not exist, skipping");
            continue;
        }
        if config.scan_on_start {
            if let Err(err) = scanner.scan_root(root).await {
                error!(root = %root.display(), error = %err, "initial scan failed");
            }
        }
        if let Err(err) = watcher.watch_root(root) {
            error!(root = %root.display(), error = %err, "cannot watch root, skipping");
        }
    }
    drop(scanner);

    if watcher.watched_roots() == 0 {
        anyhow::bail!("none of the configured roots can be watched");
    }
    let watcher_task = tokio::spawn(watcher.run(pipeline.cancel_token()));

    let state = AppState {
        store: store.clone(),
        thumbnail_dir: config.thumbnail_dir(),
        cache_dir: config.cache_dir(),
    };
    let router = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind))?;
    info!(bind = %config.http.bind, "serving catalog API");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pipeline.shutdown().await;
    let _ = watcher_task.await;
    store.close().await;
    info!("medex stopped");
    Ok(())
}

/// Create the working directories the service and its collaborators
/// expect: thumbnail cache, conversion cache, and the data dir that backs
/// the database and dead-letter log.
async fn prepare_directories(config: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::create_dir_all(config.thumbnail_dir()).await?;
    tokio::fs::create_dir_all(config.cache_dir().join("converted")).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
