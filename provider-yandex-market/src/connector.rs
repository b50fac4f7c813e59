//! Yandex Market Partner API connector implementation

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::marketplace::{
    CampaignContext, CatalogPage, CatalogSource, MarketplaceConnector, MarketplaceKind,
    PaginationPolicy, PriceUpdate, PriceUploader, StockUpdate, StockUploader, UploadReceipt,
};
use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::YandexMarketError;
use crate::types::{
    OfferMappingEntriesResponse, OfferPrice, Price, PricesRequest, SkuStock, StatusResponse,
    StockItem, StocksRequest,
};

/// Yandex Market Partner API base URL
pub const YANDEX_MARKET_API_BASE: &str = "https://api.partner.market.yandex.ru";

/// Offers per catalog listing page
const OFFER_MAPPING_LIMIT: u32 = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Yandex Market Partner API connector
///
/// # Example
///
/// ```ignore
/// use provider_yandex_market::YandexMarketConnector;
///
/// let connector = YandexMarketConnector::new(http_client, token);
/// let campaign = CampaignContext::new("21000").with_warehouse("wh-1");
/// let receipt = connector.upload_stock_batch(&batch, &campaign).await?;
/// ```
pub struct YandexMarketConnector {
    http_client: Arc<dyn HttpClient>,
    token: String,
    base_url: String,
}

impl YandexMarketConnector {
    /// Create a new Yandex Market connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `token` - Partner API OAuth token shared by every campaign
    pub fn new(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: token.into(),
            base_url: YANDEX_MARKET_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn campaign_url(&self, campaign: &CampaignContext, path: &str) -> String {
        format!(
            "{}/campaigns/{}/{}",
            self.base_url,
            urlencoding::encode(&campaign.campaign_id),
            path
        )
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(self.token.as_str())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response)?;

        serde_json::from_slice(&response.body)
            .map_err(|e| YandexMarketError::ParseError(e.to_string()).into())
    }

    fn check_status(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            debug!(status = response.status, "Yandex Market API request succeeded");
            return Ok(response);
        }

        warn!(status = response.status, "Yandex Market API request failed");
        Err(YandexMarketError::ApiError {
            status_code: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
        }
        .into())
    }

    /// Update endpoints answer `{"status": "OK"}`; an `ERROR` envelope with
    /// a 2xx status still fails the whole batch.
    fn receipt(batch_len: usize, response: StatusResponse) -> Result<UploadReceipt> {
        match response.status.as_deref() {
            Some("ERROR") => {
                let message = response
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(YandexMarketError::ApiError {
                    status_code: 200,
                    message,
                }
                .into())
            }
            _ => Ok(UploadReceipt::accepted_all(batch_len)),
        }
    }
}

#[async_trait]
impl CatalogSource for YandexMarketConnector {
    fn pagination_policy(&self) -> PaginationPolicy {
        PaginationPolicy::Cursor
    }

    #[instrument(skip(self, campaign), fields(campaign_id = %campaign.campaign_id))]
    async fn fetch_catalog_page(
        &self,
        page_token: &str,
        campaign: &CampaignContext,
    ) -> Result<CatalogPage> {
        let url = format!(
            "{}?page_token={}&limit={}",
            self.campaign_url(campaign, "offer-mapping-entries"),
            urlencoding::encode(page_token),
            OFFER_MAPPING_LIMIT
        );

        let response: OfferMappingEntriesResponse =
            self.send(self.request(HttpMethod::Get, url)).await?;
        let result = response.result;

        info!(
            offers = result.offer_mapping_entries.len(),
            has_next = result.paging.next_page_token.is_some(),
            "Fetched Yandex Market offer mapping page"
        );

        Ok(CatalogPage {
            offer_ids: result
                .offer_mapping_entries
                .into_iter()
                .map(|entry| entry.offer.shop_sku)
                .collect(),
            next_page_token: result.paging.next_page_token,
            total: None,
        })
    }
}

#[async_trait]
impl StockUploader for YandexMarketConnector {
    #[instrument(skip(self, batch, campaign), fields(campaign_id = %campaign.campaign_id, size = batch.len()))]
    async fn upload_stock_batch(
        &self,
        batch: &[StockUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt> {
        let mut skus = Vec::with_capacity(batch.len());
        for update in batch {
            let stamp =
                update
                    .warehouse
                    .as_ref()
                    .ok_or_else(|| YandexMarketError::MissingWarehouse {
                        offer_id: update.offer_id.clone(),
                    })?;

            skus.push(SkuStock {
                sku: &update.offer_id,
                warehouse_id: &stamp.warehouse_id,
                items: vec![StockItem {
                    count: update.count,
                    kind: stamp.kind.as_str(),
                    updated_at: stamp.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                }],
            });
        }

        let request = self
            .request(HttpMethod::Put, self.campaign_url(campaign, "offers/stocks"))
            .json(&StocksRequest { skus })?;
        let response: StatusResponse = self.send(request).await?;
        let receipt = Self::receipt(batch.len(), response)?;

        info!(accepted = receipt.accepted, "Uploaded Yandex Market stock batch");
        Ok(receipt)
    }
}

#[async_trait]
impl PriceUploader for YandexMarketConnector {
    #[instrument(skip(self, batch, campaign), fields(campaign_id = %campaign.campaign_id, size = batch.len()))]
    async fn upload_price_batch(
        &self,
        batch: &[PriceUpdate],
        campaign: &CampaignContext,
    ) -> Result<UploadReceipt> {
        let body = PricesRequest {
            offers: batch
                .iter()
                .map(|update| OfferPrice {
                    id: &update.offer_id,
                    price: Price {
                        value: update.value,
                        currency_id: &update.currency_code,
                    },
                })
                .collect(),
        };

        let request = self
            .request(
                HttpMethod::Post,
                self.campaign_url(campaign, "offer-prices/updates"),
            )
            .json(&body)?;
        let response: StatusResponse = self.send(request).await?;
        let receipt = Self::receipt(batch.len(), response)?;

        info!(accepted = receipt.accepted, "Uploaded Yandex Market price batch");
        Ok(receipt)
    }
}

impl MarketplaceConnector for YandexMarketConnector {
    fn marketplace(&self) -> MarketplaceKind {
        MarketplaceKind::YandexMarket
    }
}
