//! Outbound notification delivery.
//!
//! A [`NotificationChannel`] makes a single delivery attempt and reports the
//! error. [`Notifier`] wraps a channel with a bounded retry loop and collapses
//! the outcome to a boolean, so nothing past it ever sees a delivery error.

mod desktop;
pub mod message;
mod telegram;

pub use desktop::DesktopChannel;
pub use telegram::TelegramChannel;

use crate::core::models::InventoryItem;
use crate::core::retry::RetryPolicy;
use crate::core::settings::{ChannelKind, Settings};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Context for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub is_repeat: bool,
    /// 1-based ordinal of this notification for the item.
    pub ordinal: u32,
}

impl Notice {
    pub fn first() -> Self {
        Self {
            is_repeat: false,
            ordinal: 1,
        }
    }

    pub fn repeat(previous_notifications: u32) -> Self {
        Self {
            is_repeat: true,
            ordinal: previous_notifications.saturating_add(1),
        }
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn channel_type(&self) -> &'static str;
    async fn send(&self, item: &InventoryItem, notice: Notice) -> Result<()>;
}

pub struct Notifier {
    channel: Arc<dyn NotificationChannel>,
    retry: RetryPolicy,
}

impl Notifier {
    pub fn new(channel: Arc<dyn NotificationChannel>, retry: RetryPolicy) -> Self {
        Self { channel, retry }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let channel: Arc<dyn NotificationChannel> = match settings.notifications.channel {
            ChannelKind::Telegram => Arc::new(TelegramChannel::new(
                settings.telegram.clone(),
                settings.inventory.order_url_prefix.clone(),
            )?),
            ChannelKind::Desktop => Arc::new(DesktopChannel::new()),
        };
        Ok(Self::new(channel, settings.retry_policy()))
    }

    pub fn channel_type(&self) -> &'static str {
        self.channel.channel_type()
    }

    /// Returns whether the notification was delivered.
    pub async fn notify(&self, item: &InventoryItem, notice: Notice) -> bool {
        let max_attempts = self.retry.max_attempts();
        let mut failures = 0;

        loop {
            match self.channel.send(item, notice).await {
                Ok(()) => {
                    tracing::info!(
                        vin = %item.vin,
                        channel = self.channel.channel_type(),
                        repeat = notice.is_repeat,
                        "Notification sent"
                    );
                    return true;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        vin = %item.vin,
                        channel = self.channel.channel_type(),
                        attempt = failures,
                        max_attempts,
                        error = %e,
                        "Notification attempt failed"
                    );

                    let Some(delay) = self.retry.delay_after(failures) else {
                        tracing::error!(
                            vin = %item.vin,
                            attempts = failures,
                            "Giving up on notification"
                        );
                        return false;
                    };
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
