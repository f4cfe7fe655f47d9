use crate::channels::message;
use crate::channels::{NotificationChannel, Notice};
use crate::core::models::InventoryItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use notify_rust::Notification;

const APP_NAME: &str = "stock-tracker";
const TIMEOUT_MS: u32 = 10_000;

/// Local desktop notification over the freedesktop notification service.
#[derive(Debug, Default)]
pub struct DesktopChannel;

impl DesktopChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for DesktopChannel {
    fn channel_type(&self) -> &'static str {
        "desktop"
    }

    async fn send(&self, item: &InventoryItem, notice: Notice) -> Result<()> {
        let summary = format!("{} · {}", message::title(notice), item.trim_name);
        let body = message::render(item, notice);

        tokio::task::spawn_blocking(move || {
            Notification::new()
                .summary(&summary)
                .body(&body)
                .appname(APP_NAME)
                .timeout(notify_rust::Timeout::Milliseconds(TIMEOUT_MS))
                .show()
                .map(|_| ())
        })
        .await
        .context("Desktop notification task panicked")?
        .context("Failed to show desktop notification")?;

        Ok(())
    }
}
