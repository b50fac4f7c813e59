//! Yandex Market Partner API request and response types

use serde::{Deserialize, Serialize};

/// `offer-mapping-entries` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMappingEntriesResponse {
    pub result: OfferMappingEntriesResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMappingEntriesResult {
    #[serde(default)]
    pub offer_mapping_entries: Vec<OfferMappingEntry>,

    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMappingEntry {
    pub offer: MappedOffer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedOffer {
    pub shop_sku: String,

    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `offers/stocks` request body
#[derive(Debug, Serialize)]
pub struct StocksRequest<'a> {
    pub skus: Vec<SkuStock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuStock<'a> {
    pub sku: &'a str,
    pub warehouse_id: &'a str,
    pub items: Vec<StockItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub count: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// RFC 3339, UTC, second precision
    pub updated_at: String,
}

/// `offer-prices/updates` request body
#[derive(Debug, Serialize)]
pub struct PricesRequest<'a> {
    pub offers: Vec<OfferPrice<'a>>,
}

#[derive(Debug, Serialize)]
pub struct OfferPrice<'a> {
    pub id: &'a str,
    pub price: Price<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Price<'a> {
    pub value: u64,
    pub currency_id: &'a str,
}

/// Envelope returned by the update endpoints
#[derive(Debug, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}
