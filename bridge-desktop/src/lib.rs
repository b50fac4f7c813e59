//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for hosts with a full network
//! stack (servers, cron jobs, desktop tools).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry on throttling and server errors
//! - `SupplierFeedSource` that downloads the supplier's zip archive and reads
//!   the stock workbook (or CSV export) inside it
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ArchiveSupplierFeed, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = Arc::new(ReqwestHttpClient::new()?);
//!     let feed = ArchiveSupplierFeed::new(http_client.clone(), feed_url);
//!     let rows = feed.load_supplier_feed().await?;
//!     Ok(())
//! }
//! ```

mod feed;
mod http;

pub use feed::{parse_feed_archive, ArchiveSupplierFeed};
pub use http::ReqwestHttpClient;
