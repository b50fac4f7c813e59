//! Ozon Seller API connector implementation
//!
//! Implements the marketplace connector traits for a single Ozon store.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::marketplace::{
    CampaignContext, CatalogPage, CatalogSource, MarketplaceConnector, MarketplaceKind,
    PaginationPolicy, PriceUpdate, PriceUploader, RejectedOffer, StockUpdate, StockUploader,
    UploadReceipt,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::OzonError;
use crate::types::{
    ImportResponse, PriceEntry, PricesRequest, ProductListFilter, ProductListRequest,
    ProductListResponse, StockEntry, StocksRequest,
};

/// Ozon Seller API base URL
pub const OZON_API_BASE: &str = "https://api-seller.ozon.ru";

/// Maximum products per listing page
const PRODUCT_LIST_LIMIT: u32 = 1000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ozon Seller API connector
///
/// The store is identified by the credentials alone, so the campaign context
/// passed by the engine is only used for logging.
///
/// # Example
///
/// ```ignore
/// use provider_ozon::OzonConnector;
///
/// let connector = OzonConnector::new(http_client, client_id, api_key);
/// let page = connector.fetch_catalog_page("", &campaign).await?;
/// ```
pub struct OzonConnector {
    http_client: Arc<dyn HttpClient>,
    client_id: String,
    api_key: String,
    base_url: String,
}

impl OzonConnector {
    /// Create a new Ozon connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `client_id` - Seller `Client-Id`
    /// * `api_key` - Seller `Api-Key`
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            client_id: client_id.into(),
            api_key: api_key.into(),
            base_url: OZON_API_BASE.to_string(),
        }
    }

    /// Point the connector at a different API host (sandbox, local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// POST a JSON body and decode the JSON answer.
    #[instrument(skip(self, body))]
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = HttpRequest::new(HttpMethod::Post, format!("{}{}", self.base_url, path))
            .header("Client-Id", self.client_id.as_str())
            .header("Api-Key", self.api_key.as_str())
            .timeout(REQUEST_TIMEOUT)
            .json(body)?;

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            warn!(status = response.status, "Ozon API request failed");
            return Err(OzonError::ApiError {
                status_code: response.status,
                message,
            }
            .into());
        }

        debug!(status = response.status, "Ozon API request succeeded");

        serde_json::from_slice(&response.body)
            .map_err(|e| OzonError::ParseError(e.to_string()).into())
    }

    /// Build the receipt for a batch of `batch_len` items.
    ///
    /// Items reported with `updated: false` are rejected; the rest of the
    /// batch counts as accepted, including items the response omits.
    fn receipt(batch_len: usize, response: ImportResponse) -> UploadReceipt {
        let rejected: Vec<RejectedOffer> = response
            .result
            .into_iter()
            .filter(|item| !item.updated)
            .map(|item| {
                let reason = if item.errors.is_empty() {
                    "not updated".to_string()
                } else {
                    item.errors
                        .iter()
                        .map(|e| {
                            if e.message.is_empty() {
                                e.code.clone()
                            } else {
                                format!("{}: {}", e.code, e.message)
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                RejectedOffer {
                    offer_id: item.offer_id,
                    reason,
                }
            })
            .collect();

        UploadReceipt {
            accepted: batch_len.saturating_sub(rejected.len()),
            rejected,
        }
    }
}

#[async_trait]
impl CatalogSource for OzonConnector {
    fn pagination_policy(&self) -> PaginationPolicy {
        PaginationPolicy::TotalCount
    }

    #[instrument(skip(self, campaign), fields(campaign_id = %campaign.campaign_id))]
    async fn fetch_catalog_page(
        &self,
        page_token: &str,
        campaign: &CampaignContext,
    ) -> Result<CatalogPage> {
        let body = ProductListRequest {
            filter: ProductListFilter { visibility: "ALL" },
            last_id: page_token,
            limit: PRODUCT_LIST_LIMIT,
        };

        let response: ProductListResponse = self.post("/v2/product/list", &body).await?;
        let result = response.result;

        info!(
            items = result.items.len(),
            total = result.total,
            "Fetched Ozon product list page"
        );

        Ok(CatalogPage {
            offer_ids: result.items.into_iter().map(|item| item.offer_id).collect(),
            next_page_token: Some(result.last_id).filter(|id| !id.is_empty()),
            total: Some(result.total),
        })
    }
}

#[async_trait]
impl StockUploader for OzonConnector {
    #[instrument(skip(self, batch, campaign), fields(size = batch.len()))]
    async fn upload_stock_batch(
        &self,
        batch: &[StockUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt> {
        let body = StocksRequest {
            stocks: batch
                .iter()
                .map(|update| StockEntry {
                    offer_id: &update.offer_id,
                    stock: update.count,
                })
                .collect(),
        };

        let response: ImportResponse = self.post("/v1/product/import/stocks", &body).await?;
        let receipt = Self::receipt(batch.len(), response);

        info!(
            campaign_id = %campaign.campaign_id,
            accepted = receipt.accepted,
            rejected = receipt.rejected.len(),
            "Uploaded Ozon stock batch"
        );
        Ok(receipt)
    }
}

#[async_trait]
impl PriceUploader for OzonConnector {
    #[instrument(skip(self, batch, campaign), fields(size = batch.len()))]
    async fn upload_price_batch(
        &self,
        batch: &[PriceUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt> {
        let body = PricesRequest {
            prices: batch
                .iter()
                .map(|update| PriceEntry {
                    auto_action_enabled: "UNKNOWN",
                    currency_code: &update.currency_code,
                    offer_id: &update.offer_id,
                    old_price: "0",
                    price: update.value.to_string(),
                })
                .collect(),
        };

        let response: ImportResponse = self.post("/v1/product/import/prices", &body).await?;
        let receipt = Self::receipt(batch.len(), response);

        info!(
            campaign_id = %campaign.campaign_id,
            accepted = receipt.accepted,
            rejected = receipt.rejected.len(),
            "Uploaded Ozon price batch"
        );
        Ok(receipt)
    }
}

impl MarketplaceConnector for OzonConnector {
    fn marketplace(&self) -> MarketplaceKind {
        MarketplaceKind::Ozon
    }
}
