// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One post fetched from a content source. Immutable once fetched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub created: DateTime<Utc>,
    /// Relative permalink, e.g. `/r/rust/comments/abc/title/`.
    pub permalink: String,
}

impl Item {
    /// Absolute link: canonical domain of the source + relative permalink.
    pub fn link(&self, domain: &str) -> String {
        format!("{}{}", domain.trim_end_matches('/'), self.permalink)
    }
}

#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Most recent items of `source`, newest first, at most `limit` of them.
    async fn fetch_recent(&self, source: &str, limit: usize) -> Result<Vec<Item>>;
    fn name(&self) -> &'static str;
}
