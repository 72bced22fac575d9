//! Turns a positive [`Decision`] into side effects: console line, transport
//! delivery, history row and result-log line. In dry-run only the console
//! line happens.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use metrics::counter;
use std::sync::Arc;

use super::{Delivery, Transport};
use crate::decision::Decision;
use crate::history::{HistoryStore, NotificationRecord};
use crate::ingest::types::Item;
use crate::journal::{self, Journal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The human-readable result line that was printed.
    pub line: String,
    /// False in dry-run.
    pub delivered: bool,
}

pub struct Dispatcher {
    dry_run: bool,
    domain: String,
    transports: Vec<Arc<dyn Transport>>,
    history: Arc<dyn HistoryStore>,
    journal: Journal,
}

impl Dispatcher {
    pub fn new(
        dry_run: bool,
        domain: impl Into<String>,
        transports: Vec<Arc<dyn Transport>>,
        history: Arc<dyn HistoryStore>,
        journal: Journal,
    ) -> Self {
        Self {
            dry_run,
            domain: domain.into(),
            transports,
            history,
            journal,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// No-op for a negative decision. Any transport/storage failure is returned
    /// to the caller as-is.
    pub async fn dispatch(
        &self,
        source: &str,
        item: &Item,
        decision: &Decision,
    ) -> Result<Option<DispatchOutcome>> {
        if !decision.notify {
            return Ok(None);
        }

        let line = journal::result_line(Local::now(), source, &item.title);
        println!("{line}");

        if self.dry_run {
            tracing::debug!(source, item = %item.id, "dry-run: delivery suppressed");
            return Ok(Some(DispatchOutcome {
                line,
                delivered: false,
            }));
        }

        let delivery = Delivery {
            source: source.to_string(),
            title: item.title.clone(),
            link: item.link(&self.domain),
            recipients: decision.recipients.iter().cloned().collect(),
        };
        for t in &self.transports {
            t.send(&delivery)
                .await
                .with_context(|| format!("delivering via {}", t.channel_name()))?;
            counter!("postwatch_notifications_total", "channel" => t.channel_name())
                .increment(1);
        }

        self.history
            .append(&NotificationRecord {
                ts: Utc::now(),
                source: source.to_string(),
                title: item.title.clone(),
                permalink: item.permalink.clone(),
            })
            .await
            .context("recording notification history")?;

        self.journal
            .append_result(&line, &item.permalink)
            .await
            .context("writing result log")?;

        Ok(Some(DispatchOutcome {
            line,
            delivered: true,
        }))
    }
}
