//! Webhook notifier: announces a published article to a social channel.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationEvent, Notifier};

#[derive(Clone)]
pub struct WebhookNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    async fn post_announcement(&self, event: &NotificationEvent) -> Result<()> {
        let title = format!("New on the journal: {}", event.title);
        let description = format!(
            "**Category:** {}\n**Read:** /articles/{}\n**Published (UTC):** {}\n\n{}",
            event.category.display_name(),
            event.slug,
            event.published_at_iso,
            event.excerpt,
        );
        let payload = WebhookPayload::embed(&title, &description);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("webhook HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("webhook request failed: {e}"));
                }
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, event: &NotificationEvent) -> Result<()> {
        self.post_announcement(event).await
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[derive(Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct WebhookPayload {
    content: Option<String>,
    embeds: Vec<WebhookEmbed>,
}

impl WebhookPayload {
    fn embed(title: &str, description: &str) -> Self {
        Self {
            content: None,
            embeds: vec![WebhookEmbed {
                title: title.to_string(),
                description: description.to_string(),
            }],
        }
    }
}
