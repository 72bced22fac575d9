//! postwatch: binary entrypoint.
//! Loads config, wires the Reddit client, dispatcher and supervisor, then runs
//! the poll loop until interrupted.

use std::sync::Arc;

use anyhow::Context;
use postwatch::config::{load_config_default, ConfigError, PathsConfig};
use postwatch::ingest::providers::reddit::RedditProvider;
use postwatch::journal::Journal;
use postwatch::{build_dispatcher, Supervisor};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact human-readable logs by default; JSON lines with
/// `POSTWATCH_LOG_FORMAT=json`. `RUST_LOG` overrides the filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postwatch=info,warn"));
    let json = std::env::var("POSTWATCH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Startup failures go to the default error log too (the config that would
/// name another path is what failed to load).
async fn report_startup_error(err: &ConfigError) {
    tracing::error!(error = %err, "cannot start: configuration error");
    if cfg!(feature = "dry-run") {
        return;
    }
    let paths = PathsConfig::default();
    let journal = Journal::new(paths.results_log, paths.errors_log);
    if let Err(e) = journal.append_error(&format!("Error: {err}"), &format!("{err:?}")).await {
        tracing::warn!(error = ?e, "could not write error log");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let (path, cfg) = match load_config_default() {
        Ok(v) => v,
        Err(e) => {
            report_startup_error(&e).await;
            return Err(e.into());
        }
    };
    tracing::info!(
        config = %path.display(),
        sources = cfg.sources.len(),
        channels = ?cfg.notification.channel,
        dry_run = cfg.is_dry_run(),
        "config loaded"
    );

    if let Some(addr) = cfg.metrics_addr {
        postwatch::metrics::init(addr)?;
    }

    let client = Arc::new(RedditProvider::new(&cfg.reddit)?);
    let dispatcher = build_dispatcher(&cfg).context("wiring dispatcher")?;
    let supervisor = Supervisor::new(&cfg, client, dispatcher);

    tokio::select! {
        res = supervisor.run_forever() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted; shutting down");
            Ok(())
        }
    }
}
