//! # Marketplace Sync Engine
//!
//! Reconciles a supplier stock/price feed against marketplace catalogs and
//! pushes the result through the marketplaces' bulk-update endpoints.
//!
//! ## Components
//!
//! - **Parsing** (`parse`): supplier price text and the stock-count heuristic
//! - **Batching** (`batch`): order-preserving, size-bounded batches
//! - **Catalog** (`catalog`): distinct offer ids of one campaign
//! - **Paginator** (`paginator`): lazy, sequential catalog listing
//! - **Reconcilers** (`reconciler`): one stock update per catalog id, prices
//!   for ids present in the feed
//! - **Orchestrator** (`orchestrator`): runs one campaign and reports batch
//!   outcomes
//!
//! Marketplace I/O goes through the connector traits in `bridge_traits`;
//! this crate performs no HTTP itself.

pub mod batch;
pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod paginator;
pub mod parse;
pub mod reconciler;

pub use batch::{chunk, BatchKind, Batches, FailedBatch};
pub use catalog::CatalogOfferSet;
pub use error::{Result, SyncError};
pub use orchestrator::{BatchOutcome, RunReport, SyncConfig, SyncOrchestrator};
pub use paginator::{next_cursor, CatalogPaginator, FetchedPage, PageCursor};
pub use parse::{normalize_stock_count, parse_price_text};
pub use reconciler::{PriceReconciler, StockReconciler, StockReconciliation};
