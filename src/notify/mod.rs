// src/notify/mod.rs
pub mod dispatch;
pub mod slack;
pub mod telegram;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{ChannelKind, NotificationConfig};

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

/// What a transport needs to announce one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub source: String,
    pub title: String,
    /// Absolute link to the post.
    pub link: String,
    /// Sorted, no duplicates.
    pub recipients: Vec<String>,
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, delivery: &Delivery) -> Result<()>;
    fn channel_name(&self) -> &'static str;
}

/// Build one transport per configured channel. Credentials are expected to be
/// validated already (see `AppConfig::validate`).
pub fn transports_from_config(cfg: &NotificationConfig) -> Result<Vec<Arc<dyn Transport>>> {
    let mut out: Vec<Arc<dyn Transport>> = Vec::with_capacity(cfg.channel.len());
    for ch in &cfg.channel {
        match ch {
            ChannelKind::Slack => {
                let s = cfg
                    .slack
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("slack channel without slack config"))?;
                out.push(Arc::new(SlackNotifier::new(s.webhook_url.clone())));
            }
            ChannelKind::Telegram => {
                let t = cfg
                    .telegram
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("telegram channel without telegram config"))?;
                out.push(Arc::new(
                    TelegramNotifier::new(t.token.clone()).with_api_base(&t.api_base),
                ));
            }
        }
    }
    Ok(out)
}
