//! Sweep notifications to a Discord-compatible webhook.

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::sweep::SweepStats;

const USERNAME: &str = "gridsweep";

#[derive(Serialize, Debug)]
struct WebhookEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

#[derive(Serialize, Debug)]
struct WebhookPayload {
    username: String,
    embeds: Vec<WebhookEmbed>,
}

pub struct Webhook {
    url: String,
    client: reqwest::Client,
}

impl Webhook {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send_notification(
        &self,
        title: &str,
        description: &str,
        success: bool,
    ) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&payload(title, description, success))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Failed to send webhook notification: {}", error_text);
            anyhow::bail!("webhook notification failed: {}", error_text);
        }

        info!("Sent webhook notification: {}", title);
        Ok(())
    }
}

fn payload(title: &str, description: &str, success: bool) -> WebhookPayload {
    let color = if success { 0x00FF00 } else { 0xFF0000 };
    WebhookPayload {
        username: USERNAME.to_string(),
        embeds: vec![WebhookEmbed {
            title: title.to_string(),
            description: description.to_string(),
            color,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }],
    }
}

/// Markdown summary of a finished sweep
pub fn summarize(stats: &SweepStats, records: usize, output: &str) -> String {
    format!(
        "Collected **{}** places from **{}/{}** cells into **{}**.\n\
         Duplicates skipped: **{}**, failed cells: **{}**, requests: **{}**, cooldowns: **{}**.",
        records,
        stats.cells_processed,
        stats.cells_total,
        output,
        stats.duplicates,
        stats.cells_failed,
        stats.requests,
        stats.throttles
    )
}
