use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{Delivery, Transport};

/// Incoming-webhook notifier. One POST per post, mentioning every recipient.
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Slack mrkdwn needs `&`, `<` and `>` escaped inside link labels.
pub fn build_payload(d: &Delivery) -> serde_json::Value {
    let mentions: String = d.recipients.iter().map(|u| format!("<@{u}> ")).collect();
    let text = format!("{mentions}<{}|{}>", d.link, html_escape::encode_text(&d.title));
    json!({
        "text": d.title,
        "blocks": [
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": text }
            }
        ]
    })
}

#[async_trait::async_trait]
impl Transport for SlackNotifier {
    async fn send(&self, d: &Delivery) -> Result<()> {
        let body = build_payload(d);
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        tracing::debug!(source = %d.source, recipients = d.recipients.len(), "slack message sent");
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "slack"
    }
}
