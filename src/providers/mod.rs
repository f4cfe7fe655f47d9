mod tesla;

use crate::core::models::InventoryResponse;
use anyhow::Result;
use async_trait::async_trait;

pub use tesla::TeslaInventory;

/// Where poll results come from. Implementations enforce their own request
/// timeouts.
#[async_trait]
pub trait InventorySource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self) -> Result<InventoryResponse>;
}
