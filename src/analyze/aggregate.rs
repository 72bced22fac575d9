//! Fan-out one item to every filter of its source, wait for all of them and
//! fold the verdicts into one [`Decision`].
//!
//! Each evaluation runs on its own blocking-pool task. A panicking evaluator
//! only loses its own verdict (counted as no match); siblings are unaffected.
//! With a timeout configured, evaluators that have not reported by the
//! deadline are counted as no match as well. Aborting them cannot stop a
//! closure that is already running: a hung evaluator keeps its blocking-pool
//! thread until it returns, only its verdict is discarded.

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::analyze::rules::{self, Filter};
use crate::decision::{Decision, Verdict};
use crate::ingest::types::Item;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        metrics::describe_counter!(
            "postwatch_items_evaluated_total",
            "Items fanned out to their source's filters."
        );
        metrics::describe_counter!(
            "postwatch_evaluator_faults_total",
            "Filter evaluations that panicked or missed the deadline."
        );
        metrics::describe_histogram!(
            "postwatch_eval_ms",
            "Wall time to evaluate all filters for one item, in milliseconds."
        );
    });
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    timeout: Option<Duration>,
}

impl Aggregator {
    /// `timeout = None` waits for every evaluator indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub async fn aggregate(&self, item: &Arc<Item>, filters: &[Arc<Filter>]) -> Decision {
        self.aggregate_with(item, filters, |item, f| rules::evaluate(f, &item.title))
            .await
    }

    /// Same as [`Aggregator::aggregate`] with a caller-supplied evaluator.
    pub async fn aggregate_with<E>(
        &self,
        item: &Arc<Item>,
        filters: &[Arc<Filter>],
        eval: E,
    ) -> Decision
    where
        E: Fn(&Item, &Filter) -> Verdict + Send + Sync + 'static,
    {
        ensure_metrics_described();
        let t0 = Instant::now();
        let eval = Arc::new(eval);

        let mut set = JoinSet::new();
        for f in filters {
            let item = Arc::clone(item);
            let f = Arc::clone(f);
            let eval = Arc::clone(&eval);
            set.spawn_blocking(move || {
                let v = (*eval)(&item, &f);
                tracing::debug!(
                    item = %item.id,
                    filter = f.name.as_deref().unwrap_or("-"),
                    matched = v.matched,
                    "filter evaluated"
                );
                v
            });
        }

        let deadline = self.timeout.map(|d| t0 + d);
        let mut decision = Decision::default();
        let mut faults = 0usize;

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let late = set.len();
                        tracing::warn!(
                            item = %item.id,
                            late,
                            "filter evaluation deadline passed; treating late filters as no match"
                        );
                        faults += late;
                        set.abort_all();
                        break;
                    }
                },
                None => set.join_next().await,
            };
            let Some(joined) = next else { break };
            match joined {
                Ok(verdict) => decision = decision.merge(verdict),
                Err(e) => {
                    faults += 1;
                    tracing::warn!(item = %item.id, error = %e, "filter evaluation failed; treating as no match");
                }
            }
        }

        counter!("postwatch_items_evaluated_total").increment(1);
        if faults > 0 {
            counter!("postwatch_evaluator_faults_total").increment(faults as u64);
        }
        histogram!("postwatch_eval_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        decision
    }
}
