//! # Yandex Market Provider
//!
//! Implements the marketplace connector traits for the Yandex Market Partner
//! API. One connector serves every campaign of the seller account; the
//! campaign and its warehouse come from the `CampaignContext` of each call.
//!
//! ## Endpoints
//!
//! - `GET /campaigns/{id}/offer-mapping-entries` - catalog listing, cursor
//!   pagination via `paging.nextPageToken`
//! - `PUT /campaigns/{id}/offers/stocks` - stock bulk update, warehouse-aware
//! - `POST /campaigns/{id}/offer-prices/updates` - price bulk update

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{YandexMarketConnector, YANDEX_MARKET_API_BASE};
pub use error::{Result, YandexMarketError};
