// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod config;
pub mod decision;
pub mod history;
pub mod ingest;
pub mod journal;
pub mod metrics;
pub mod notify;
pub mod supervisor;
pub mod watermark;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Aggregator, Filter};
pub use crate::config::AppConfig;
pub use crate::decision::{Decision, Verdict};
pub use crate::ingest::types::{ContentSource, Item};
pub use crate::notify::{Dispatcher, Transport};
pub use crate::supervisor::Supervisor;
pub use crate::watermark::WatermarkStore;

use std::sync::Arc;

use crate::history::{HistoryStore, MemoryHistory, SqliteHistory};
use crate::journal::Journal;

/// Wire the dispatcher from config: transports per channel, SQLite history
/// and the result log. In dry-run nothing durable is opened.
pub fn build_dispatcher(cfg: &AppConfig) -> anyhow::Result<Dispatcher> {
    let dry_run = cfg.is_dry_run();
    let journal = Journal::new(&cfg.paths.results_log, &cfg.paths.errors_log);
    let transports: Vec<Arc<dyn Transport>> = if dry_run {
        Vec::new()
    } else {
        notify::transports_from_config(&cfg.notification)?
    };
    let history: Arc<dyn HistoryStore> = if dry_run {
        Arc::new(MemoryHistory::new())
    } else {
        Arc::new(SqliteHistory::open(&cfg.paths.history_db)?)
    };
    Ok(Dispatcher::new(
        dry_run,
        cfg.reddit.domain.clone(),
        transports,
        history,
        journal,
    ))
}
