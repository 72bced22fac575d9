// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use postwatch::config::{load_config_from, AppConfig};
use postwatch::history::MemoryHistory;
use postwatch::ingest::types::{ContentSource, Item};
use postwatch::journal::Journal;
use postwatch::notify::{Delivery, Dispatcher, Transport};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Reddit listing JSON with `(id, title, created)` posts in the given order.
pub fn listing(posts: &[(&str, &str, DateTime<Utc>)]) -> String {
    let children: Vec<serde_json::Value> = posts
        .iter()
        .map(|(id, title, at)| {
            serde_json::json!({
                "kind": "t3",
                "data": {
                    "id": id,
                    "title": title,
                    "created_utc": at.timestamp() as f64,
                    "permalink": format!("/r/test/comments/{id}/"),
                }
            })
        })
        .collect();
    serde_json::json!({ "kind": "Listing", "data": { "children": children } }).to_string()
}

pub fn item(id: &str, title: &str) -> Item {
    Item {
        id: id.into(),
        title: title.into(),
        created: t0(),
        permalink: format!("/r/test/comments/{id}/"),
    }
}

/// Write `toml` to `<dir>/postwatch.toml` and load it.
pub fn config_in(dir: &Path, toml: &str) -> AppConfig {
    let p = dir.join("postwatch.toml");
    std::fs::write(&p, toml).unwrap();
    load_config_from(&p).unwrap()
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Delivery>>,
}

impl RecordingTransport {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, d: &Delivery) -> Result<()> {
        self.sent.lock().unwrap().push(d.clone());
        Ok(())
    }
    fn channel_name(&self) -> &'static str {
        "recording"
    }
}

pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _d: &Delivery) -> Result<()> {
        Err(anyhow!("transport down"))
    }
    fn channel_name(&self) -> &'static str {
        "failing"
    }
}

/// Fails the `fail_on`-th send (1-based) and records every other one.
pub struct FlakyTransport {
    calls: AtomicUsize,
    fail_on: usize,
    pub sent: Mutex<Vec<Delivery>>,
}

impl FlakyTransport {
    pub fn failing_on(fail_on: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.title.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn send(&self, d: &Delivery) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(anyhow!("transient send failure"));
        }
        self.sent.lock().unwrap().push(d.clone());
        Ok(())
    }
    fn channel_name(&self) -> &'static str {
        "flaky"
    }
}

pub struct FailingSource;

#[async_trait]
impl ContentSource for FailingSource {
    async fn fetch_recent(&self, source: &str, _limit: usize) -> Result<Vec<Item>> {
        Err(anyhow!("upstream unavailable for {source}"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub history: Arc<MemoryHistory>,
    pub journal: Journal,
}

pub fn dispatcher(dir: &Path, dry_run: bool) -> (Dispatcher, Harness) {
    let transport = Arc::new(RecordingTransport::default());
    let history = Arc::new(MemoryHistory::new());
    let journal = Journal::new(dir.join("results.log"), dir.join("errors.log"));
    let d = Dispatcher::new(
        dry_run,
        "https://reddit.com",
        vec![transport.clone() as Arc<dyn Transport>],
        history.clone(),
        journal.clone(),
    );
    (
        d,
        Harness {
            transport,
            history,
            journal,
        },
    )
}
