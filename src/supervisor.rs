//! Drives poll → evaluate → notify for every source, forever.
//!
//! Sources are handled one after another and items of a batch one after
//! another; only the filters of a single item run concurrently. Any error
//! escaping a cycle is logged and the loop is restarted after a fixed delay.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analyze::{Aggregator, Filter};
use crate::config::{AppConfig, SupervisorConfig};
use crate::ingest::{self, types::ContentSource};
use crate::journal::Journal;
use crate::notify::Dispatcher;
use crate::watermark::WatermarkStore;

/// One configured source with its filters, shared read-only with evaluators.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub id: String,
    pub filters: Vec<Arc<Filter>>,
}

/// Running average of per-item evaluation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    count: u32,
    total: Duration,
}

impl TimingStats {
    /// Record one sample and return the new average.
    pub fn record(&mut self, sample: Duration) -> Duration {
        self.count = self.count.saturating_add(1);
        self.total += sample;
        self.average()
    }

    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub fresh: usize,
    pub notified: usize,
}

impl CycleReport {
    fn add(&mut self, other: CycleReport) {
        self.fetched += other.fetched;
        self.fresh += other.fresh;
        self.notified += other.notified;
    }
}

pub struct Supervisor {
    sources: Vec<SourcePlan>,
    client: Arc<dyn ContentSource>,
    aggregator: Aggregator,
    dispatcher: Dispatcher,
    journal: Journal,
    cfg: SupervisorConfig,
    page_size: usize,
    timing: TimingStats,
}

impl Supervisor {
    pub fn new(cfg: &AppConfig, client: Arc<dyn ContentSource>, dispatcher: Dispatcher) -> Self {
        let sources = cfg
            .sources
            .iter()
            .map(|(id, s)| SourcePlan {
                id: id.clone(),
                filters: s.filters.iter().cloned().map(Arc::new).collect(),
            })
            .collect();
        Self {
            sources,
            client,
            aggregator: Aggregator::new(cfg.supervisor.evaluation_timeout()),
            dispatcher,
            journal: Journal::new(&cfg.paths.results_log, &cfg.paths.errors_log),
            cfg: cfg.supervisor.clone(),
            page_size: cfg.reddit.page_size,
            timing: TimingStats::default(),
        }
    }

    pub fn sources(&self) -> &[SourcePlan] {
        &self.sources
    }

    pub fn timing(&self) -> TimingStats {
        self.timing
    }

    /// A watermark store with every source starting now.
    pub fn fresh_watermarks(&self) -> WatermarkStore {
        WatermarkStore::new(self.sources.iter().map(|s| s.id.clone()), Utc::now())
    }

    /// Poll one source, evaluate and dispatch its fresh items oldest first,
    /// then advance its watermark to the newest item of the page.
    ///
    /// The watermark also follows each dispatched item, so a fault mid-batch
    /// leaves it at the last item that went out. It is held back while the
    /// next item shares the same timestamp, otherwise that item would be
    /// skipped after a restart.
    pub async fn run_source(
        &mut self,
        idx: usize,
        marks: &mut WatermarkStore,
    ) -> Result<CycleReport> {
        let Some(plan) = self.sources.get(idx).cloned() else {
            bail!("no source at index {idx}");
        };
        let mark = marks.get(&plan.id);
        let batch = ingest::poll(self.client.as_ref(), &plan.id, self.page_size, mark).await?;

        let mut report = CycleReport {
            fetched: batch.fetched,
            fresh: batch.fresh.len(),
            notified: 0,
        };

        let mut fresh = batch.fresh;
        fresh.sort_by_key(|it| it.created);
        let mut queue = fresh.into_iter().peekable();

        while let Some(item) = queue.next() {
            let start = Instant::now();
            tracing::info!(
                source = %plan.id,
                item = %item.id,
                filters = plan.filters.len(),
                "post found"
            );

            let item = Arc::new(item);
            let decision = self.aggregator.aggregate(&item, &plan.filters).await;
            if self
                .dispatcher
                .dispatch(&plan.id, &item, &decision)
                .await?
                .is_some()
            {
                report.notified += 1;
            }
            if queue.peek().map_or(true, |next| next.created > item.created) {
                marks.advance(&plan.id, item.created);
            }

            let took = start.elapsed();
            let avg = self.timing.record(took);
            tracing::info!(
                source = %plan.id,
                secs = took.as_secs_f64(),
                avg_secs = avg.as_secs_f64(),
                "applied all filters to the post"
            );
        }

        if let Some(newest) = batch.newest {
            marks.advance(&plan.id, newest);
        }
        Ok(report)
    }

    /// One pass over every source in configuration order, pausing after each.
    pub async fn run_cycle(&mut self, marks: &mut WatermarkStore) -> Result<CycleReport> {
        let mut total = CycleReport::default();
        for idx in 0..self.sources.len() {
            total.add(self.run_source(idx, marks).await?);
            tokio::time::sleep(self.cfg.poll_delay()).await;
        }
        Ok(total)
    }

    /// Cycle until something fails; hands back the failure.
    async fn run_until_fault(&mut self, marks: &mut WatermarkStore) -> anyhow::Error {
        loop {
            if let Err(e) = self.run_cycle(marks).await {
                return e;
            }
        }
    }

    /// Never returns under normal operation. Returns an error only when
    /// `max_restarts` is configured and exhausted.
    pub async fn run_forever(mut self) -> Result<()> {
        let mut marks = self.fresh_watermarks();
        let mut restarts: u32 = 0;
        loop {
            let err = self.run_until_fault(&mut marks).await;
            counter!("postwatch_restarts_total").increment(1);
            tracing::error!(error = ?err, restarts, "run loop failed; restarting");
            if !self.dispatcher.is_dry_run() {
                if let Err(log_err) = self.journal.append_error(" ", &format!("{err:#}")).await {
                    tracing::warn!(error = ?log_err, "could not write error log");
                }
            }

            restarts = restarts.saturating_add(1);
            if let Some(max) = self.cfg.max_restarts {
                if restarts > max {
                    return Err(err.context(format!("giving up after {max} restarts")));
                }
            }

            tokio::time::sleep(self.cfg.restart_delay()).await;
            self.apply_restart_policy(&mut marks, Utc::now());
        }
    }

    /// Watermarks after a supervised restart: reset to `now`, or kept as they
    /// were with `preserve_watermarks_on_restart`.
    pub fn apply_restart_policy(&self, marks: &mut WatermarkStore, now: DateTime<Utc>) {
        if self.cfg.preserve_watermarks_on_restart {
            tracing::info!("keeping watermarks across restart");
        } else {
            marks.reset(now);
        }
    }
}
