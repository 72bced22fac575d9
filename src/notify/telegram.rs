//! Telegram Bot API notifier: one `sendMessage` per recipient chat, HTML
//! parse mode, the post title as the link text.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{Delivery, Transport};

pub struct TelegramNotifier {
    token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: "https://api.telegram.org".to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

/// `<a href="link">title</a>` with the title escaped for HTML parse mode.
pub fn html_message(d: &Delivery) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(&d.link),
        html_escape::encode_text(&d.title)
    )
}

#[async_trait::async_trait]
impl Transport for TelegramNotifier {
    async fn send(&self, d: &Delivery) -> Result<()> {
        let text = html_message(d);
        let url = self.endpoint();
        for chat_id in &d.recipients {
            let body = json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            });
            self.client
                .post(&url)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("telegram sendMessage to {chat_id}"))?
                .error_for_status()
                .with_context(|| format!("telegram non-2xx for {chat_id}"))?;
            tracing::debug!(chat_id = %chat_id, "telegram message sent");
        }
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "telegram"
    }
}
