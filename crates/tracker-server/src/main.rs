//! payload-tracker binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `TRACKER_*`
//! environment overrides, opens the SQLite store, and then either consumes
//! status messages, serves the query API, or just applies the schema.
//!
//! ```text
//! payload-tracker consume --input events.jsonl
//! payload-tracker serve
//! payload-tracker run --input events.jsonl
//! payload-tracker migrate
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::{
  io::{AsyncBufRead, BufReader},
  net::TcpListener,
};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;
use tracker_api::AppState;
use tracker_ingest::{Pipeline, RetryPolicy, consume_lines};
use tracker_server::ServerConfig;
use tracker_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Payload status tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest newline-delimited status messages until EOF or Ctrl-C.
  Consume {
    /// Read from this file instead of stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,
  },
  /// Serve the read-only query API.
  Serve,
  /// Consume and serve in one process; `/metrics` then includes the
  /// consumer's counters.
  Run {
    /// Read from this file instead of stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,
  },
  /// Apply the schema to the configured store and exit.
  Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TRACKER").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Consume { input } => {
      let pipeline = pipeline(store, &server_cfg);
      consume(&pipeline, input).await
    }
    Command::Serve => serve(AppState::new(store, server_cfg.api_config()), &server_cfg).await,
    Command::Run { input } => {
      let pipeline = pipeline(Arc::clone(&store), &server_cfg);
      let state = AppState::new(store, server_cfg.api_config())
        .with_ingest_stats(Arc::clone(pipeline.stats()));
      // The server keeps answering after the input is exhausted.
      let (consumed, served) = tokio::join!(consume(&pipeline, input), serve(state, &server_cfg));
      consumed.and(served)
    }
    Command::Migrate => {
      info!(path = ?store_path, "schema is up to date");
      Ok(())
    }
  }
}

fn pipeline(store: Arc<SqliteStore>, cfg: &ServerConfig) -> Pipeline<SqliteStore> {
  let pipeline = Pipeline::new(store, cfg.normalizer(), RetryPolicy::from(cfg.retry));
  info!(
    request_id_length = ?pipeline.normalizer().expected_id_len(),
    max_attempts = cfg.retry.max_attempts,
    "consumer starting"
  );
  pipeline
}

async fn consume(pipeline: &Pipeline<SqliteStore>, input: Option<PathBuf>) -> anyhow::Result<()> {
  match input {
    Some(path) => {
      let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?;
      run_consumer(pipeline, BufReader::new(file)).await
    }
    None => run_consumer(pipeline, BufReader::new(tokio::io::stdin())).await,
  }
}

async fn run_consumer<R>(pipeline: &Pipeline<SqliteStore>, reader: R) -> anyhow::Result<()>
where
  R: AsyncBufRead + Unpin,
{
  consume_lines(pipeline, reader, shutdown_signal())
    .await
    .context("failed to read input")?;
  Ok(())
}

async fn serve(state: AppState<SqliteStore>, cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = Router::new().nest("/api/v1", tracker_api::api_router(state));
  let address = cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
