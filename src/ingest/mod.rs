// src/ingest/mod.rs
pub mod providers;
pub mod types;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ingest::types::{ContentSource, Item};

/// Result of polling one source once.
#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    /// Items strictly newer than the watermark, in fetch order.
    pub fresh: Vec<Item>,
    /// Newest creation time among *all* fetched items; `None` if the page was empty.
    pub newest: Option<DateTime<Utc>>,
    /// How many items the page contained.
    pub fetched: usize,
}

/// Split a fetched page against the current watermark.
pub fn select_fresh(items: Vec<Item>, watermark: DateTime<Utc>) -> PollBatch {
    let fetched = items.len();
    let mut newest: Option<DateTime<Utc>> = None;
    let mut fresh = Vec::new();
    for it in items {
        if newest.map_or(true, |n| it.created > n) {
            newest = Some(it.created);
        }
        if it.created > watermark {
            fresh.push(it);
        }
    }
    PollBatch {
        fresh,
        newest,
        fetched,
    }
}

/// Fetch the most recent page for `source` and keep what the watermark has not seen.
pub async fn poll(
    client: &dyn ContentSource,
    source: &str,
    page_size: usize,
    watermark: DateTime<Utc>,
) -> Result<PollBatch> {
    let items = client
        .fetch_recent(source, page_size)
        .await
        .with_context(|| format!("polling {source} via {}", client.name()))?;
    let batch = select_fresh(items, watermark);
    counter!("postwatch_items_fresh_total").increment(batch.fresh.len() as u64);
    tracing::debug!(
        source,
        fetched = batch.fetched,
        fresh = batch.fresh.len(),
        "poll"
    );
    Ok(batch)
}
