//! Supplier Feed Abstraction
//!
//! The supplier publishes its stock and prices as a downloadable table. How it
//! is fetched and decoded is up to the implementation; the engine only needs
//! the rows.

use async_trait::async_trait;

use crate::error::Result;
use crate::marketplace::SupplierRecord;

/// Source of supplier feed rows, in feed order.
#[async_trait]
pub trait SupplierFeedSource: Send + Sync {
    async fn load_supplier_feed(&self) -> Result<Vec<SupplierRecord>>;
}

/// Feed backed by rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSupplierFeed {
    records: Vec<SupplierRecord>,
}

impl StaticSupplierFeed {
    pub fn new(records: Vec<SupplierRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SupplierFeedSource for StaticSupplierFeed {
    async fn load_supplier_feed(&self) -> Result<Vec<SupplierRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_feed_preserves_order() {
        let feed = StaticSupplierFeed::new(vec![
            SupplierRecord::new("B", "3", "10"),
            SupplierRecord::new("A", "5", "20"),
        ]);

        let records = feed.load_supplier_feed().await.unwrap();
        let codes: Vec<_> = records.iter().map(|r| r.offer_code.as_str()).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }
}
