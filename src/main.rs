// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audio Vault host process.
//!
//! Restores the session, keeps the library in sync, and accepts sign-in
//! redirect URLs on stdin until interrupted.

use anyhow::Context;
use audio_vault::{config::Config, models::SyncStatus, AppContext};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SIGN_IN_PROVIDER: &str = "github";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        url = %config.supabase_url,
        bucket = %config.bucket,
        "Starting Audio Vault"
    );

    let app = AppContext::from_config(config).context("Failed to build gateways")?;

    let identity = app.start().await;
    if identity.is_anonymous() {
        match app.session.sign_in(SIGN_IN_PROVIDER).await {
            Ok(redirect) => tracing::info!(
                url = %redirect.url,
                "Open this URL to sign in, then paste the redirect URL here"
            ),
            Err(e) => tracing::error!(error = %e, "Sign-in unavailable"),
        }
    }

    // Log library changes
    let mut snapshots = app.library.watch();
    let watcher = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            match snapshot.status {
                SyncStatus::Ready => tracing::info!(
                    user_id = snapshot.identity.user_id().unwrap_or("<none>"),
                    objects = ?snapshot.names(),
                    "Library ready"
                ),
                SyncStatus::Error => tracing::warn!(
                    error = snapshot.last_error.as_deref().unwrap_or("unknown"),
                    "Library out of date"
                ),
                status => tracing::debug!(?status, "Library status"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    if let Err(e) = app.session.complete_sign_in(line.trim()).await {
                        tracing::error!(error = %e, "Sign-in failed");
                    }
                }
                Ok(Some(_)) => {}
                // stdin closed: keep running until interrupted
                Ok(None) => {
                    tokio::signal::ctrl_c().await?;
                    break;
                }
                Err(e) => return Err(anyhow::Error::new(e).context("Failed to read stdin")),
            },
        }
    }

    tracing::info!("Shutting down");
    app.shutdown();
    watcher.abort();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("audio_vault=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
