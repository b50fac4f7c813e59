//! # Host Bridge Traits
//!
//! Contracts between the reconciliation core and everything it talks to.
//!
//! ## Overview
//!
//! The core never performs I/O itself. Catalog listings, batch uploads, the
//! supplier feed and the HTTP transport are all injected through the traits
//! defined here, which keeps the engine testable with in-memory fakes.
//!
//! ## Traits
//!
//! ### Marketplaces
//! - [`CatalogSource`](marketplace::CatalogSource) - One page of a catalog listing
//! - [`StockUploader`](marketplace::StockUploader) - One stock bulk-update call
//! - [`PriceUploader`](marketplace::PriceUploader) - One price bulk-update call
//!
//! ### Inputs & Transport
//! - [`SupplierFeedSource`](feed::SupplierFeedSource) - Supplier stock/price rows
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should report timeouts and connection failures with their dedicated
//! variants and non-2xx responses as `BridgeError::Http`, so callers can
//! decide on retry policy via `BridgeError::is_transient`.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so batches can be dispatched from
//! concurrent tasks.

pub mod error;
pub mod feed;
pub mod http;
pub mod marketplace;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use feed::{StaticSupplierFeed, SupplierFeedSource};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use marketplace::{
    CampaignContext, CatalogOfferId, CatalogPage, CatalogSource, MarketplaceConnector,
    MarketplaceKind, PaginationPolicy, PriceUpdate, PriceUploader, RejectedOffer, StockKind,
    StockUpdate, StockUploader, SupplierRecord, UploadReceipt, WarehouseStamp,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
