use crate::core::retry::RetryPolicy;
use crate::core::tracker::TrackerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_INVENTORY_URL: &str = "https://www.tesla.com/inventory/api/v4/inventory-results?query=%7B%22query%22%3A%7B%22model%22%3A%22my%22%2C%22condition%22%3A%22new%22%2C%22options%22%3A%7B%7D%2C%22arrangeby%22%3A%22Price%22%2C%22order%22%3A%22asc%22%2C%22market%22%3A%22TR%22%2C%22language%22%3A%22tr%22%2C%22super_region%22%3A%22north%20america%22%2C%22lng%22%3A32.8262%2C%22lat%22%3A39.9786%2C%22zip%22%3A%2206010%22%2C%22range%22%3A0%2C%22region%22%3A%22TR%22%7D%2C%22offset%22%3A0%2C%22count%22%3A24%2C%22outsideOffset%22%3A0%2C%22outsideSearch%22%3Afalse%2C%22isFalconDeliverySelectionEnabled%22%3Atrue%2C%22version%22%3A%22v2%22%7D";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notification_cooldown_hours: f64,
    pub max_notifications_per_vin: u32,
    pub vin_cleanup_days: f64,
    pub check_interval_seconds: f64,
    pub cleanup_every_cycles: u64,
    pub state_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub inventory: InventorySettings,
    pub notifications: NotificationSettings,
    pub telegram: TelegramSettings,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification_cooldown_hours: 24.0,
            max_notifications_per_vin: 3,
            vin_cleanup_days: 7.0,
            check_interval_seconds: 30.0,
            cleanup_every_cycles: 100,
            state_file: None,
            log_file: None,
            inventory: InventorySettings::default(),
            notifications: NotificationSettings::default(),
            telegram: TelegramSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub url: String,
    pub timeout_seconds: f64,
    pub proxy: Option<String>,
    pub order_url_prefix: String,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_INVENTORY_URL.to_string(),
            timeout_seconds: 30.0,
            proxy: None,
            order_url_prefix: "https://www.tesla.com/tr_TR/my/order/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[default]
    Telegram,
    Desktop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub channel: ChannelKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_seconds: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_seconds: 1.0,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stock-tracker").join("config.toml"))
    }

    /// Loads and validates the config. Unlike most settings, a missing file is
    /// an error: the notifier has no usable defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = Self::read(explicit)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`] but skips the notification channel checks, for
    /// commands that never send anything.
    pub fn load_read_only(explicit: Option<&Path>) -> Result<Self> {
        let settings = Self::read(explicit)?;
        settings.validate_tracking()?;
        Ok(settings)
    }

    fn read(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path().context("Could not determine config directory")?,
        };

        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}. Create it with at least a [telegram] section \
                 (bot_token, chat_id) or set notifications.channel = \"desktop\".",
                path.display()
            );
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("Failed to parse config")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_tracking()?;

        if self.notifications.channel == ChannelKind::Telegram {
            if self.telegram.bot_token.trim().is_empty() {
                anyhow::bail!("telegram.bot_token is required for the telegram channel");
            }
            if self.telegram.chat_id.trim().is_empty() {
                anyhow::bail!("telegram.chat_id is required for the telegram channel");
            }
        }
        Ok(())
    }

    /// Everything except the notification channel credentials.
    pub fn validate_tracking(&self) -> Result<()> {
        if self.max_notifications_per_vin < 1 {
            anyhow::bail!("max_notifications_per_vin must be at least 1");
        }
        ensure_in_range(
            "notification_cooldown_hours",
            self.notification_cooldown_hours,
            0.0,
            MAX_SPAN_DAYS * 24.0,
        )?;
        ensure_in_range("vin_cleanup_days", self.vin_cleanup_days, 0.0, MAX_SPAN_DAYS)?;
        ensure_positive("check_interval_seconds", self.check_interval_seconds)?;
        ensure_positive("inventory.timeout_seconds", self.inventory.timeout_seconds)?;
        ensure_in_range(
            "retry.base_delay_seconds",
            self.retry.base_delay_seconds,
            0.0,
            MAX_WAIT_SECONDS,
        )?;

        if self.cleanup_every_cycles < 1 {
            anyhow::bail!("cleanup_every_cycles must be at least 1");
        }
        if self.retry.max_attempts < 1 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if self.inventory.url.trim().is_empty() {
            anyhow::bail!("inventory.url must not be empty");
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            cooldown: chrono_from_secs(self.notification_cooldown_hours * 3600.0),
            max_notifications: self.max_notifications_per_vin,
            retention: chrono_from_secs(self.vin_cleanup_days * 86_400.0),
        }
    }

    pub fn check_interval(&self) -> Duration {
        std_from_secs(self.check_interval_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            std_from_secs(self.retry.base_delay_seconds),
        )
    }
}

impl InventorySettings {
    pub fn timeout(&self) -> Duration {
        std_from_secs(self.timeout_seconds)
    }
}

/// Upper bound for cooldown and retention spans (about a century).
const MAX_SPAN_DAYS: f64 = 36_500.0;

/// Upper bound for intervals, timeouts and retry delays.
const MAX_WAIT_SECONDS: f64 = u32::MAX as f64;

// Validation keeps values in range; the fallbacks only guard unvalidated
// settings built in code.
fn chrono_from_secs(secs: f64) -> chrono::Duration {
    chrono::Duration::try_milliseconds((secs * 1000.0).round() as i64)
        .unwrap_or(chrono::Duration::MAX)
}

fn std_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(u32::MAX as u64))
}

fn ensure_in_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        anyhow::bail!("{name} must be between {min} and {max}, got {value}");
    }
    Ok(())
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > MAX_WAIT_SECONDS {
        anyhow::bail!(
            "{name} must be greater than zero and at most {MAX_WAIT_SECONDS}, got {value}"
        );
    }
    Ok(())
}
