//! Marketplace Contracts
//!
//! Data exchanged between the reconciliation engine and the marketplace
//! connectors, plus the traits each connector implements: one catalog
//! listing call, one stock batch upload, one price batch upload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Marketplace-assigned offer identifier.
pub type CatalogOfferId = String;

/// Marketplaces with a connector in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketplaceKind {
    /// Single-store catalog.
    Ozon,
    /// Multi-campaign catalog (FBS/DBS campaigns with their own warehouses).
    YandexMarket,
}

impl fmt::Display for MarketplaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketplaceKind::Ozon => write!(f, "ozon"),
            MarketplaceKind::YandexMarket => write!(f, "yandex_market"),
        }
    }
}

/// One row of the supplier stock/price feed.
///
/// Field names on the wire are the supplier's own column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRecord {
    #[serde(rename = "Код")]
    pub offer_code: String,
    #[serde(rename = "Количество")]
    pub quantity_text: String,
    #[serde(rename = "Цена")]
    pub price_text: String,
}

impl SupplierRecord {
    pub fn new(
        offer_code: impl Into<String>,
        quantity_text: impl Into<String>,
        price_text: impl Into<String>,
    ) -> Self {
        Self {
            offer_code: offer_code.into(),
            quantity_text: quantity_text.into(),
            price_text: price_text.into(),
        }
    }
}

/// Stock type reported to warehouse-aware marketplaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockKind {
    /// Sellable stock.
    Fit,
}

impl StockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockKind::Fit => "FIT",
        }
    }
}

/// Warehouse fields attached to a stock update for the multi-campaign schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseStamp {
    pub warehouse_id: String,
    pub kind: StockKind,
    pub observed_at: DateTime<Utc>,
}

/// Authoritative stock count for one catalog offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub offer_id: CatalogOfferId,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<WarehouseStamp>,
}

/// Price for one catalog offer in whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub offer_id: CatalogOfferId,
    pub value: u64,
    pub currency_code: String,
}

/// Pagination scheme of a catalog listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationPolicy {
    /// Keep going while the response carries a non-empty next-page token.
    Cursor,
    /// Keep going until the accumulated item count reaches the reported total.
    TotalCount,
}

/// One page of a catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub offer_ids: Vec<CatalogOfferId>,
    /// Token to pass to the next call; `None` or empty when the listing ends
    /// (cursor policy) or when the endpoint does not use one.
    pub next_page_token: Option<String>,
    /// Total number of items in the listing (total-count policy).
    pub total: Option<u64>,
}

/// Identifies the marketplace campaign a call is made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContext {
    pub campaign_id: String,
    pub warehouse_id: Option<String>,
}

impl CampaignContext {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            warehouse_id: None,
        }
    }

    pub fn with_warehouse(mut self, warehouse_id: impl Into<String>) -> Self {
        self.warehouse_id = Some(warehouse_id.into());
        self
    }
}

/// Offer the marketplace refused inside an otherwise accepted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedOffer {
    pub offer_id: CatalogOfferId,
    pub reason: String,
}

/// Marketplace acknowledgement of one uploaded batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub accepted: usize,
    pub rejected: Vec<RejectedOffer>,
}

impl UploadReceipt {
    /// Receipt for a batch the marketplace accepted wholesale.
    pub fn accepted_all(count: usize) -> Self {
        Self {
            accepted: count,
            rejected: Vec::new(),
        }
    }
}

/// Catalog listing endpoint of one marketplace.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::marketplace::{CampaignContext, CatalogSource};
///
/// async fn first_page(source: &dyn CatalogSource) -> Result<usize> {
///     let page = source
///         .fetch_catalog_page("", &CampaignContext::new("21000"))
///         .await?;
///     Ok(page.offer_ids.len())
/// }
/// ```
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// How successive pages are requested and when the listing ends.
    fn pagination_policy(&self) -> PaginationPolicy;

    /// Fetch one page. An empty `page_token` requests the first page.
    async fn fetch_catalog_page(
        &self,
        page_token: &str,
        campaign: &CampaignContext,
    ) -> Result<CatalogPage>;
}

/// Stock bulk-update endpoint of one marketplace.
#[async_trait]
pub trait StockUploader: Send + Sync {
    async fn upload_stock_batch(
        &self,
        batch: &[StockUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt>;
}

/// Price bulk-update endpoint of one marketplace.
#[async_trait]
pub trait PriceUploader: Send + Sync {
    async fn upload_price_batch(
        &self,
        batch: &[PriceUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt>;
}

/// Everything a marketplace connector provides.
pub trait MarketplaceConnector: CatalogSource + StockUploader + PriceUploader {
    fn marketplace(&self) -> MarketplaceKind;
}
