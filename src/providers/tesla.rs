use crate::core::models::InventoryResponse;
use crate::core::settings::InventorySettings;
use crate::providers::InventorySource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

const USER_AGENT: &str = concat!("stock-tracker/", env!("CARGO_PKG_VERSION"));

pub struct TeslaInventory {
    client: reqwest::Client,
    url: String,
}

impl TeslaInventory {
    pub fn new(settings: &InventorySettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(settings.timeout());

        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .with_context(|| format!("Invalid inventory proxy: {proxy}"))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }
}

#[async_trait]
impl InventorySource for TeslaInventory {
    fn name(&self) -> &'static str {
        "Tesla inventory"
    }

    async fn fetch(&self) -> Result<InventoryResponse> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch inventory")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Inventory API error: {} - {}", status, truncate(&body, 200));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to decode inventory response")?;

        Ok(InventoryResponse::from_value(body))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
