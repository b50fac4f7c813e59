//! # Reconcilers
//!
//! Turn supplier feed rows into one authoritative update per catalog offer.
//!
//! Matching is shared by both reconcilers: a feed row matches when its
//! (trimmed) offer code is in the catalog and no earlier row already matched
//! that id. Later rows for a consumed id are ignored, and so are rows whose
//! code the catalog does not know. The catalog itself is never mutated.
//!
//! - [`StockReconciler`] covers the whole catalog: ids without a feed row get
//!   a synthesized zero-stock update, appended after the matched ones in
//!   catalog order.
//! - [`PriceReconciler`] only emits prices for matched ids.

use bridge_traits::marketplace::{PriceUpdate, StockUpdate, SupplierRecord, WarehouseStamp};
use std::collections::HashSet;
use tracing::warn;

use crate::catalog::CatalogOfferSet;
use crate::error::Result;
use crate::parse::{normalize_stock_count, parse_price_text};

/// Feed rows that match the catalog, first occurrence only, in feed order.
fn first_matches<'r>(
    records: &'r [SupplierRecord],
    catalog: &'r CatalogOfferSet,
) -> impl Iterator<Item = (&'r str, &'r SupplierRecord)> + 'r {
    let mut consumed: HashSet<&'r str> = HashSet::new();
    records.iter().filter_map(move |record| {
        let offer_id = record.offer_code.trim();
        (catalog.contains(offer_id) && consumed.insert(offer_id)).then_some((offer_id, record))
    })
}

/// Result of a stock reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReconciliation {
    /// One update per catalog id: matched first, then synthesized zeros.
    pub updates: Vec<StockUpdate>,
    /// Number of leading updates that came from the feed.
    pub matched: usize,
}

impl StockReconciliation {
    pub fn synthesized(&self) -> usize {
        self.updates.len() - self.matched
    }

    /// Updates with a non-zero count, in update order.
    pub fn non_zero(&self) -> Vec<StockUpdate> {
        self.updates
            .iter()
            .filter(|update| update.count != 0)
            .cloned()
            .collect()
    }
}

/// Builds stock updates covering the full catalog.
#[derive(Debug, Clone, Default)]
pub struct StockReconciler {
    warehouse: Option<WarehouseStamp>,
}

impl StockReconciler {
    /// Reconciler for the plain `{offer_id, stock}` schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `stamp` to every update. The same stamp (and therefore the same
    /// observation time) is used for matched and synthesized updates.
    pub fn with_warehouse(mut self, stamp: WarehouseStamp) -> Self {
        self.warehouse = Some(stamp);
        self
    }

    fn update(&self, offer_id: &str, count: u64) -> StockUpdate {
        StockUpdate {
            offer_id: offer_id.to_string(),
            count,
            warehouse: self.warehouse.clone(),
        }
    }

    /// # Errors
    ///
    /// [`SyncError::InvalidQuantityFormat`](crate::SyncError::InvalidQuantityFormat)
    /// if a matched row's quantity cannot be interpreted. Rows that match
    /// nothing are never parsed.
    pub fn reconcile(
        &self,
        records: &[SupplierRecord],
        catalog: &CatalogOfferSet,
    ) -> Result<StockReconciliation> {
        let mut updates = Vec::with_capacity(catalog.len());
        let mut matched_ids = HashSet::new();

        for (offer_id, record) in first_matches(records, catalog) {
            let count = normalize_stock_count(&record.quantity_text).map_err(|err| {
                warn!(offer_id, quantity = %record.quantity_text, "Unreadable stock quantity");
                err
            })?;
            updates.push(self.update(offer_id, count));
            matched_ids.insert(offer_id);
        }

        let matched = updates.len();
        for offer_id in catalog.iter() {
            if !matched_ids.contains(offer_id.as_str()) {
                updates.push(self.update(offer_id, 0));
            }
        }

        Ok(StockReconciliation { updates, matched })
    }
}

/// Builds price updates for catalog ids present in the feed.
#[derive(Debug, Clone)]
pub struct PriceReconciler {
    currency_code: String,
}

impl PriceReconciler {
    pub fn new(currency_code: impl Into<String>) -> Self {
        Self {
            currency_code: currency_code.into(),
        }
    }

    /// # Errors
    ///
    /// [`SyncError::InvalidPriceFormat`](crate::SyncError::InvalidPriceFormat)
    /// if a matched row's price cannot be parsed.
    pub fn reconcile(
        &self,
        records: &[SupplierRecord],
        catalog: &CatalogOfferSet,
    ) -> Result<Vec<PriceUpdate>> {
        first_matches(records, catalog)
            .map(|(offer_id, record)| {
                let value = parse_price_text(&record.price_text).map_err(|err| {
                    warn!(offer_id, price = %record.price_text, "Unreadable price");
                    err
                })?;
                Ok(PriceUpdate {
                    offer_id: offer_id.to_string(),
                    value,
                    currency_code: self.currency_code.clone(),
                })
            })
            .collect()
    }
}
