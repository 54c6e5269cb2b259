//! sms2mail server binary.
//!
//! Startup order matters: configuration is resolved and the mail program
//! probed before the listener binds, so a broken deployment never accepts
//! a webhook it cannot deliver.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sms2mail::cli::{Cli, Command};
use sms2mail::config::{self, CONFIG_TEMPLATE, PROFILE_TEMPLATE};
use sms2mail::mail::MsmtpSender;
use sms2mail::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(command) = cli.command {
        return match command {
            Command::Config { path } => {
                write_template(path.as_deref(), CONFIG_TEMPLATE, "Configuration")
            }
            Command::ProfileConfig { path } => {
                write_template(path.as_deref(), PROFILE_TEMPLATE, "Profile configuration")
            }
        };
    }

    info!("sms2mail_starting");

    let resolved = config::resolve_global(cli.config.as_deref())
        .context("Error loading configuration")?;
    info!(
        config_dir = %resolved.config_dir.display(),
        single_tenant = resolved.global.email.is_some(),
        "config_loaded"
    );

    let sender = MsmtpSender::new(cli.msmtp.clone());
    sender.probe().await.with_context(|| {
        format!(
            "'{}' not found in PATH; install it or check your environment",
            cli.msmtp
        )
    })?;
    info!(program = %cli.msmtp, "mail_program_found");

    let state = AppState::new(
        resolved.global.clone(),
        resolved.config_dir,
        Arc::new(sender),
    );
    let app = web::router(state);

    let addr = resolved.global.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(address = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("shutdown_complete");

    Ok(())
}

/// Write a config template to `path`, or print it when no path is given.
fn write_template(path: Option<&Path>, template: &str, label: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, template)
                .with_context(|| format!("Error writing {} template", label.to_lowercase()))?;
            println!("{label} template written to {}", path.display());
        }
        None => print!("{template}"),
    }
    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("shutting_down");
}
