// src/ingest/providers/fixture.rs
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::reddit::parse_listing;
use crate::ingest::types::{ContentSource, Item};

/// Serves canned Reddit listings per source. No network.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    listings: HashMap<String, String>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(source: &str, content: &str) -> Self {
        Self::new().with_listing(source, content)
    }

    pub fn with_listing(mut self, source: &str, content: &str) -> Self {
        self.listings.insert(source.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl ContentSource for FixtureProvider {
    async fn fetch_recent(&self, source: &str, limit: usize) -> Result<Vec<Item>> {
        let Some(body) = self.listings.get(source) else {
            return Ok(Vec::new());
        };
        let mut items = parse_listing(body)?;
        items.truncate(limit);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
