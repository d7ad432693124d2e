//! sweep-worker: periodic deadline notification sweep.
//!
//! Sleeps until the next cron fire in the configured time zone, sweeps all
//! users, and repeats. `--once` runs a single sweep and exits; `--at`
//! evaluates that sweep at a fixed instant.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use duewatch_core::config::{self, Config};
use duewatch_notify::{transport_from_config, Dispatcher, MessageTemplates, PresentationHints};
use duewatch_storage::open_store;
use duewatch_sweep::schedule::{delay_until, next_fire};
use duewatch_sweep::{on_order_created, SweepOrchestrator};

// ── CLI ─────────────────────────────────────────────────────────────

/// Deadline sweep worker. Sends change-deadline push notifications.
#[derive(Parser, Debug)]
#[command(name = "sweep-worker", version, about)]
struct Cli {
    /// Config profile; keys are read as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "DUEWATCH_PROFILE", default_value = "")]
    profile: String,

    /// Run one sweep and exit.
    #[arg(long)]
    once: bool,

    /// Evaluate the sweep at this RFC 3339 instant instead of now. Implies `--once`.
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Run the order-creation hook for `<user_id>/<order_id>` and exit.
    #[arg(long, value_name = "USER/ORDER")]
    order_created: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::for_profile(&cli.profile);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let store = open_store(&config.store)
        .await
        .context("failed to open store")?;

    if let Some(target) = cli.order_created.as_deref() {
        let (user_id, order_id) = target
            .split_once('/')
            .context("--order-created expects <user_id>/<order_id>")?;
        let outcome = on_order_created(store.as_ref(), user_id, order_id).await;
        info!(?outcome, "Order-created hook finished");
        return Ok(());
    }

    let transport = transport_from_config(&config.push)
        .await
        .context("failed to build push transport")?;
    let templates = match &config.push.templates_path {
        Some(path) => MessageTemplates::from_toml_file(path)?,
        None => MessageTemplates::default(),
    };
    let dispatcher = Dispatcher::new(
        transport,
        PresentationHints::from_config(&config.push),
        config.sweep.dispatch_timeout(),
    );

    let tz = config.sweep.tz()?;
    let orchestrator = SweepOrchestrator::new(store, Arc::new(dispatcher), Arc::new(templates), tz)
        .with_concurrency(config.sweep.concurrency);

    if let Some(at) = cli.at {
        orchestrator.run_sweep_at(at).await;
        return Ok(());
    }
    if cli.once {
        orchestrator.run_sweep().await;
        return Ok(());
    }

    let schedule = config.sweep.schedule()?;
    info!(cron = %config.sweep.cron, timezone = %tz, "sweep-worker started");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let now = Utc::now();
        let Some(next) = next_fire(&schedule, now, tz) else {
            warn!(cron = %config.sweep.cron, "Cron schedule has no upcoming fire time");
            break;
        };
        info!(next = %next, "Next sweep scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay_until(next, now)) => {}
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }

        tokio::select! {
            _ = orchestrator.run_sweep() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested mid-sweep; unprocessed orders are picked up next run");
                break;
            }
        }
    }

    info!("sweep-worker exited cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
