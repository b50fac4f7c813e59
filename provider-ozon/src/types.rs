//! Ozon Seller API request and response types

use serde::{Deserialize, Serialize};

/// `/v2/product/list` request body
#[derive(Debug, Serialize)]
pub struct ProductListRequest<'a> {
    pub filter: ProductListFilter,
    /// Empty for the first page, then the previous response's `last_id`
    pub last_id: &'a str,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct ProductListFilter {
    pub visibility: &'static str,
}

/// `/v2/product/list` response
#[derive(Debug, Deserialize)]
pub struct ProductListResponse {
    pub result: ProductListResult,
}

#[derive(Debug, Deserialize)]
pub struct ProductListResult {
    #[serde(default)]
    pub items: Vec<ProductItem>,

    /// Number of products in the whole listing
    pub total: u64,

    #[serde(default)]
    pub last_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductItem {
    pub offer_id: String,

    #[serde(default)]
    pub product_id: Option<u64>,
}

/// `/v1/product/import/stocks` request body
#[derive(Debug, Serialize)]
pub struct StocksRequest<'a> {
    pub stocks: Vec<StockEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct StockEntry<'a> {
    pub offer_id: &'a str,
    pub stock: u64,
}

/// `/v1/product/import/prices` request body
#[derive(Debug, Serialize)]
pub struct PricesRequest<'a> {
    pub prices: Vec<PriceEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PriceEntry<'a> {
    pub auto_action_enabled: &'static str,
    pub currency_code: &'a str,
    pub offer_id: &'a str,
    pub old_price: &'static str,
    /// Whole currency units, sent as a string
    pub price: String,
}

/// Response of both import endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub result: Vec<ImportResult>,
}

#[derive(Debug, Deserialize)]
pub struct ImportResult {
    pub offer_id: String,

    #[serde(default)]
    pub updated: bool,

    #[serde(default)]
    pub errors: Vec<ImportError>,
}

#[derive(Debug, Deserialize)]
pub struct ImportError {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}
