//! Telegram Bot API channel.
//!
//! Posts a photo of the configured vehicle with the message as its caption
//! and a button linking to the order page (`POST /bot<token>/sendPhoto`).

use crate::channels::message;
use crate::channels::{NotificationChannel, Notice};
use crate::core::models::InventoryItem;
use crate::core::settings::TelegramSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `sendPhoto` caption limit (characters).
const CAPTION_LIMIT: usize = 1024;

const COMPOSITOR_URL: &str = "https://static-assets.tesla.com/configurator/compositor?context=design_studio_2&bkba_opt=1&view=STUD_3QTR&size=600&model=my&crop=1150,647,390,180";

pub struct TelegramChannel {
    settings: TelegramSettings,
    order_url_prefix: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(settings: TelegramSettings, order_url_prefix: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            settings,
            order_url_prefix,
            client,
        })
    }

    fn build_payload(&self, item: &InventoryItem, notice: Notice) -> Value {
        json!({
            "chat_id": self.settings.chat_id,
            "photo": image_url(&item.option_codes),
            "caption": truncate_caption(&message::render(item, notice), CAPTION_LIMIT),
            "reply_markup": {
                "inline_keyboard": [[{
                    "text": "Vehicle details",
                    "url": format!("{}{}", self.order_url_prefix, item.vin),
                }]]
            }
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn channel_type(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, item: &InventoryItem, notice: Notice) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendPhoto", self.settings.bot_token);
        let payload = self.build_payload(item, notice);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            // The request URL embeds the bot token; keep it out of the logs.
            .map_err(|e| anyhow::anyhow!("Telegram request failed: {}", e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendPhoto failed: {} - {}", status, body);
        }

        tracing::debug!(vin = %item.vin, "Telegram photo message accepted");
        Ok(())
    }
}

fn image_url(option_codes: &str) -> String {
    format!("{COMPOSITOR_URL}&options={option_codes}")
}

fn truncate_caption(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "…";
    let truncated: String = text.chars().take(limit - 1).collect();
    format!("{truncated}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ItemFeatures;

    fn channel() -> TelegramChannel {
        TelegramChannel::new(
            TelegramSettings {
                bot_token: "123:abc".to_string(),
                chat_id: "-100200".to_string(),
            },
            "https://www.tesla.com/tr_TR/my/order/".to_string(),
        )
        .unwrap()
    }

    fn item() -> InventoryItem {
        InventoryItem {
            vin: "LRW123".to_string(),
            trim_name: "Model Y".to_string(),
            price: "2499000".to_string(),
            option_codes: "APBS,PPSW".to_string(),
            features: ItemFeatures::default(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = channel().build_payload(&item(), Notice::first());
        assert_eq!(payload["chat_id"], "-100200");
        assert!(payload["photo"]
            .as_str()
            .unwrap()
            .ends_with("&options=APBS,PPSW"));
        assert!(payload["caption"].as_str().unwrap().contains("VIN: LRW123"));
        assert_eq!(
            payload["reply_markup"]["inline_keyboard"][0][0]["url"],
            "https://www.tesla.com/tr_TR/my/order/LRW123"
        );
    }

    #[test]
    fn test_truncate_caption() {
        assert_eq!(truncate_caption("short", 10), "short");
        let long = "ş".repeat(20);
        let truncated = truncate_caption(&long, 10);
        assert_eq!(truncated.chars().count(), 10);
        assert!(truncated.ends_with('…'));
    }
}
