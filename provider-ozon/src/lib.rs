//! # Ozon Provider
//!
//! Implements the marketplace connector traits for the Ozon Seller API.
//!
//! ## Overview
//!
//! This module provides:
//! - Catalog listing over `/v2/product/list` (total-count pagination keyed
//!   by `last_id`)
//! - Stock bulk updates over `/v1/product/import/stocks`
//! - Price bulk updates over `/v1/product/import/prices`
//!
//! Authentication uses the seller's `Client-Id` and `Api-Key` headers.
//! Requests go through the injected `HttpClient`; the connector itself never
//! retries.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{OzonConnector, OZON_API_BASE};
pub use error::{OzonError, Result};
