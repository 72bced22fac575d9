// src/ingest/providers/reddit.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::RedditConfig;
use crate::ingest::types::{ContentSource, Item};

const PUBLIC_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    created_utc: f64,
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Parse a Reddit listing (`/r/<sub>/new`) into items, preserving order.
/// Posts with an unrepresentable `created_utc` are skipped.
pub fn parse_listing(body: &str) -> Result<Vec<Item>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        let p = child.data;
        let Some(created) = created_from_secs(p.created_utc) else {
            tracing::warn!(id = %p.id, created_utc = p.created_utc, "skipping post with bad timestamp");
            continue;
        };
        out.push(Item {
            id: p.id,
            title: p.title,
            created,
            permalink: p.permalink,
        });
    }
    Ok(out)
}

fn created_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1_000.0).round() as i64)
}

/// Reddit client. Uses application-only OAuth when client credentials are
/// configured, otherwise the public JSON listing.
pub struct RedditProvider {
    client: Client,
    credentials: Option<(String, String)>,
    public_base: String,
    oauth_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditProvider {
    pub fn new(cfg: &RedditConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reddit http client")?;
        let credentials = match (&cfg.client_id, &cfg.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() => Some((id.clone(), secret.clone())),
            _ => None,
        };
        Ok(Self {
            client,
            credentials,
            public_base: PUBLIC_BASE.to_string(),
            oauth_base: OAUTH_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point both endpoints elsewhere (tests, proxies).
    pub fn with_base_urls(mut self, public_base: &str, oauth_base: &str) -> Self {
        self.public_base = public_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self, id: &str, secret: &str) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if tok.expires_at > Utc::now() {
                return Ok(tok.value.clone());
            }
        }

        let rsp: TokenResponse = self
            .client
            .post(format!("{}/api/v1/access_token", self.public_base))
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("reddit token request")?
            .error_for_status()
            .context("reddit token non-2xx")?
            .json()
            .await
            .context("reddit token body")?;

        // Refresh a minute early.
        let ttl = (rsp.expires_in - 60).max(0);
        let value = rsp.access_token;
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Utc::now() + ChronoDuration::seconds(ttl),
        });
        Ok(value)
    }
}

#[async_trait]
impl ContentSource for RedditProvider {
    async fn fetch_recent(&self, source: &str, limit: usize) -> Result<Vec<Item>> {
        let t0 = std::time::Instant::now();

        let req = match &self.credentials {
            Some((id, secret)) => {
                let token = self.bearer(id, secret).await?;
                self.client
                    .get(format!("{}/r/{}/new", self.oauth_base, source))
                    .bearer_auth(token)
            }
            None => self
                .client
                .get(format!("{}/r/{}/new.json", self.public_base, source)),
        };

        let rsp = req
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .with_context(|| format!("fetching r/{source}"))?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(anyhow!("reddit returned {status} for r/{source}"));
        }
        let body = rsp.text().await.context("reading reddit listing body")?;
        let mut items = parse_listing(&body)?;
        items.truncate(limit);

        histogram!("postwatch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("postwatch_items_polled_total").increment(items.len() as u64);

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
