//! Account Manager bridge entry point
//!
//! Hosts the account store behind a JSON-lines protocol on stdio, playing
//! the role of the framework's method channel. See [`protocol`] for the
//! message shapes.
//!
//! # Environment
//!
//! - `ACCOUNT_MANAGER_DATA_DIR` overrides where accounts are stored
//! - `ACCOUNT_MANAGER_CONFIG` points at a `StoreConfig` JSON file
//! - `ACCOUNT_MANAGER_BACKEND=keyring` selects the system keychain
//!   (requires the `keyring-store` feature)
//! - `RUST_LOG` filters the stderr log

mod host;
mod protocol;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use account_manager_app::adapters::JsonFileBackend;
use account_manager_app::{load_config, AppStateBuilder};
use account_manager_core::traits::PersistenceBackend;

use protocol::Outbound;
use session::Session;

const APP_DIR_NAME: &str = "account-manager";
const ACCOUNTS_FILE: &str = "accounts.json";
const CONFIG_FILE: &str = "config.json";

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Bridge failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let data_dir = data_dir();
    tracing::info!("Starting Account Manager bridge (data dir {})", data_dir.display());

    let config_path = std::env::var_os("ACCOUNT_MANAGER_CONFIG")
        .map_or_else(|| data_dir.join(CONFIG_FILE), PathBuf::from);
    let config = load_config(&config_path)
        .await
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let state = AppStateBuilder::new()
        .backend(backend(&data_dir)?)
        .config(config)
        .build()
        .context("building app state")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = rx.recv().await {
            let line = match message.to_line() {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to encode outbound message: {e}");
                    continue;
                }
            };
            if let Err(e) = write_line(&mut stdout, &line).await {
                tracing::error!("stdout closed: {e}");
                break;
            }
        }
    });

    let session = Session::start(state, tx).await;
    tracing::info!("Bridge ready on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        session.handle_line(&line).await;
    }

    tracing::info!("stdin closed, shutting down");
    session.detach().await;
    drop(session);
    // Outstanding request tasks hold the sender; the writer drains until they finish.
    writer.await.context("joining stdout writer")?;
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("ACCOUNT_MANAGER_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn backend(data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn PersistenceBackend>> {
    let kind = std::env::var("ACCOUNT_MANAGER_BACKEND").unwrap_or_default();
    match kind.as_str() {
        "" | "file" => {
            let path = data_dir.join(ACCOUNTS_FILE);
            tracing::info!("Using JSON file backend at {}", path.display());
            Ok(Arc::new(JsonFileBackend::open(path)))
        }
        #[cfg(feature = "keyring-store")]
        "keyring" => {
            tracing::info!("Using system keychain backend");
            Ok(Arc::new(account_manager_app::adapters::KeyringBackend::new()))
        }
        other => anyhow::bail!("unsupported backend {other:?}"),
    }
}
