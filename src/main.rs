// SPDX-License-Identifier: MIT

//! whoopsync CLI
//!
//! Connects a WHOOP account over OAuth and fetches the data snapshot used
//! for daily planning. Authorization and fetch failures print a one-line
//! diagnostic and a nonzero exit; they never print a stack trace.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use whoopsync::config::Settings;
use whoopsync::services::whoop::SNAPSHOT_WORKOUT_LIMIT;
use whoopsync::services::{OAuthFlow, WhoopClient};
use whoopsync::store::{CredentialStore, FileStore};

#[derive(Parser)]
#[command(name = "whoopsync", version, about = "Connect a WHOOP account and pull recovery data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect a WHOOP account via the browser OAuth flow.
    Connect {
        /// Override the requested OAuth scope.
        #[arg(long)]
        scope: Option<String>,
        /// Seconds to wait for the browser redirect.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
        /// Replace an existing connection without asking.
        #[arg(long)]
        force: bool,
    },
    /// Show connection status.
    Status,
    /// Fetch the latest WHOOP snapshot and print it as JSON.
    Snapshot {
        /// Number of recent workouts to include.
        #[arg(long, default_value_t = SNAPSHOT_WORKOUT_LIMIT)]
        workouts: u32,
    },
    /// Remove the stored WHOOP credentials.
    Disconnect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let store = Arc::new(FileStore::new(FileStore::default_path()?));

    match cli.command {
        Command::Connect {
            scope,
            timeout,
            force,
        } => connect(&settings, store, scope.as_deref(), timeout, force).await,
        Command::Status => status(store.as_ref()).await,
        Command::Snapshot { workouts } => snapshot(&settings, store, workouts).await,
        Command::Disconnect => disconnect(store.as_ref()).await,
    }
}

async fn connect(
    settings: &Settings,
    store: Arc<FileStore>,
    scope: Option<&str>,
    timeout_secs: u64,
    force: bool,
) -> anyhow::Result<()> {
    let (client_id, client_secret) = settings
        .client_credentials()
        .context("WHOOP credentials missing. Set WHOOP_CLIENT_ID and WHOOP_CLIENT_SECRET in your environment or .env")?;

    if store.load().await?.is_some() && !force {
        println!("WHOOP is already connected. Re-run with --force to reconnect.");
        return Ok(());
    }

    let flow = OAuthFlow::new(client_id, client_secret).with_redirect(
        &settings.redirect_host,
        settings.redirect_port,
        &settings.redirect_path,
    );

    println!(
        "Opening WHOOP authorization in your browser. Make sure your registered redirect URL is {}.",
        flow.redirect_uri()
    );

    let credentials = flow
        .connect(scope, Duration::from_secs(timeout_secs))
        .await?;
    store.save(&credentials).await?;

    println!("WHOOP connected successfully.");
    Ok(())
}

async fn status(store: &FileStore) -> anyhow::Result<()> {
    let Some(credentials) = store.load().await? else {
        println!("WHOOP is not connected.");
        return Ok(());
    };

    let state = if credentials.is_expired() { "expired" } else { "active" };
    let expires_at = credentials
        .expires_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    let last_sync = credentials
        .last_sync_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "not yet".to_string());

    println!("WHOOP connection: {state}");
    println!("Connected at: {}", credentials.connected_at.to_rfc3339());
    println!("Access token expires at: {expires_at}");
    println!("Last sync: {last_sync}");
    Ok(())
}

async fn snapshot(settings: &Settings, store: Arc<FileStore>, workouts: u32) -> anyhow::Result<()> {
    let credentials = store
        .load()
        .await?
        .ok_or_else(|| anyhow!("WHOOP is not connected. Run `whoopsync connect` first."))?;

    let mut client = WhoopClient::new(
        credentials,
        settings.whoop_client_id.clone(),
        settings.whoop_client_secret.clone(),
        store,
    );

    let snapshot = client.snapshot(workouts).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn disconnect(store: &FileStore) -> anyhow::Result<()> {
    if store.load().await?.is_none() {
        println!("WHOOP is not connected.");
        return Ok(());
    }

    store.clear().await?;
    println!("WHOOP disconnected.");
    Ok(())
}

/// Initialize logging with an env-filter (RUST_LOG overrides).
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whoopsync=info".into()),
        )
        .with_target(false)
        .init();
}
