//! Integration tests for the sync orchestrator
//!
//! These tests drive complete campaign runs against an in-memory marketplace:
//! - Reconciliation completeness and the price subset rule
//! - First-row-wins handling of duplicate feed rows
//! - Abort before dispatch on catalog and parse failures
//! - Per-batch failure isolation and outcome ordering
//! - Upload concurrency bound and stock-before-price dispatch
//! - Warehouse schema stamping with an injected clock

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::marketplace::{
    CampaignContext, CatalogPage, CatalogSource, MarketplaceConnector, MarketplaceKind,
    PaginationPolicy, PriceUpdate, PriceUploader, RejectedOffer, StockKind, StockUpdate,
    StockUploader, SupplierRecord, UploadReceipt,
};
use bridge_traits::time::{FixedClock, SystemClock};
use chrono::{TimeZone, Utc};
use core_runtime::config::{CampaignSettings, MarketplaceProfile};
use core_runtime::events::{CoreEvent, EventBus, EventStream, SyncEvent};
use core_sync::{BatchKind, FailedBatch, SyncConfig, SyncError, SyncOrchestrator};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Mock Implementations
// ============================================================================

/// In-memory marketplace that serves scripted catalog pages and records uploads
struct MockMarketplace {
    kind: MarketplaceKind,
    policy: PaginationPolicy,
    pages: AsyncMutex<VecDeque<BridgeResult<CatalogPage>>>,
    failing_offers: HashSet<String>,
    rejected_offers: HashSet<String>,
    stock_batches: AsyncMutex<Vec<Vec<StockUpdate>>>,
    price_batches: AsyncMutex<Vec<Vec<PriceUpdate>>>,
    calls: AsyncMutex<Vec<BatchKind>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockMarketplace {
    fn new(
        kind: MarketplaceKind,
        policy: PaginationPolicy,
        pages: Vec<BridgeResult<CatalogPage>>,
    ) -> Self {
        Self {
            kind,
            policy,
            pages: AsyncMutex::new(pages.into()),
            failing_offers: HashSet::new(),
            rejected_offers: HashSet::new(),
            stock_batches: AsyncMutex::new(Vec::new()),
            price_batches: AsyncMutex::new(Vec::new()),
            calls: AsyncMutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Single-store catalog served as one total-count page.
    fn ozon(catalog: &[&str]) -> Self {
        Self::new(
            MarketplaceKind::Ozon,
            PaginationPolicy::TotalCount,
            vec![Ok(CatalogPage {
                offer_ids: ids(catalog),
                next_page_token: catalog.last().map(|id| id.to_string()),
                total: Some(catalog.len() as u64),
            })],
        )
    }

    /// Multi-campaign catalog served as cursor pages.
    fn yandex(pages: &[&[&str]]) -> Self {
        let count = pages.len();
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                Ok(CatalogPage {
                    offer_ids: ids(page),
                    next_page_token: (i + 1 < count).then(|| format!("page-{}", i + 2)),
                    total: None,
                })
            })
            .collect();
        Self::new(MarketplaceKind::YandexMarket, PaginationPolicy::Cursor, pages)
    }

    /// Any batch containing one of `offers` fails with HTTP 500.
    fn failing_on(mut self, offers: &[&str]) -> Self {
        self.failing_offers = offers.iter().map(|id| id.to_string()).collect();
        self
    }

    /// `offers` are rejected inside otherwise accepted batches.
    fn rejecting(mut self, offers: &[&str]) -> Self {
        self.rejected_offers = offers.iter().map(|id| id.to_string()).collect();
        self
    }

    async fn upload(&self, kind: BatchKind, offer_ids: Vec<String>) -> BridgeResult<UploadReceipt> {
        self.calls.lock().await.push(kind);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if offer_ids.iter().any(|id| self.failing_offers.contains(id)) {
            return Err(BridgeError::Http {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        let rejected: Vec<RejectedOffer> = offer_ids
            .iter()
            .filter(|id| self.rejected_offers.contains(*id))
            .map(|id| RejectedOffer {
                offer_id: id.clone(),
                reason: "NOT_FOUND".to_string(),
            })
            .collect();
        Ok(UploadReceipt {
            accepted: offer_ids.len() - rejected.len(),
            rejected,
        })
    }

    async fn uploaded_stock(&self) -> Vec<StockUpdate> {
        self.stock_batches.lock().await.iter().flatten().cloned().collect()
    }

    async fn upload_calls(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl CatalogSource for MockMarketplace {
    fn pagination_policy(&self) -> PaginationPolicy {
        self.policy
    }

    async fn fetch_catalog_page(
        &self,
        _page_token: &str,
        _campaign: &CampaignContext,
    ) -> BridgeResult<CatalogPage> {
        self.pages
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::OperationFailed("unexpected page".into())))
    }
}

#[async_trait]
impl StockUploader for MockMarketplace {
    async fn upload_stock_batch(
        &self,
        batch: &[StockUpdate],
        _campaign: &CampaignContext,
    ) -> BridgeResult<UploadReceipt> {
        self.stock_batches.lock().await.push(batch.to_vec());
        let offer_ids = batch.iter().map(|u| u.offer_id.clone()).collect();
        self.upload(BatchKind::Stock, offer_ids).await
    }
}

#[async_trait]
impl PriceUploader for MockMarketplace {
    async fn upload_price_batch(
        &self,
        batch: &[PriceUpdate],
        _campaign: &CampaignContext,
    ) -> BridgeResult<UploadReceipt> {
        self.price_batches.lock().await.push(batch.to_vec());
        let offer_ids = batch.iter().map(|u| u.offer_id.clone()).collect();
        self.upload(BatchKind::Price, offer_ids).await
    }
}

impl MarketplaceConnector for MockMarketplace {
    fn marketplace(&self) -> MarketplaceKind {
        self.kind
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|id| id.to_string()).collect()
}

fn record(code: &str, quantity: &str, price: &str) -> SupplierRecord {
    SupplierRecord::new(code, quantity, price)
}

fn orchestrator(connector: Arc<MockMarketplace>, event_bus: &EventBus) -> SyncOrchestrator {
    SyncOrchestrator::new(
        SyncConfig::default(),
        connector,
        event_bus.clone(),
        Arc::new(SystemClock),
    )
}

fn stock_counts(updates: &[StockUpdate]) -> HashMap<&str, u64> {
    updates.iter().map(|u| (u.offer_id.as_str(), u.count)).collect()
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_run_reconciles_feed_against_catalog() {
    let connector = Arc::new(MockMarketplace::ozon(&["A", "B", "C"]));
    let bus = EventBus::default();
    let records = vec![record("A", ">10", "100.00"), record("B", "1", "50.00")];

    let report = orchestrator(connector.clone(), &bus)
        .run(&records, &CampaignSettings::ozon("client-1"))
        .await
        .unwrap();

    assert_eq!(
        stock_counts(&report.all_stock_updates),
        HashMap::from([("A", 100), ("B", 0), ("C", 0)])
    );
    assert_eq!(stock_counts(&report.non_zero_stock_updates), HashMap::from([("A", 100)]));

    let prices: HashMap<&str, u64> = report
        .price_updates
        .iter()
        .map(|p| (p.offer_id.as_str(), p.value))
        .collect();
    assert_eq!(prices, HashMap::from([("A", 100), ("B", 50)]));
    assert!(report.price_updates.iter().all(|p| p.currency_code == "RUB"));

    assert!(report.is_fully_applied());
    assert_eq!(report.batch_outcomes.len(), 2);
    assert_eq!(report.campaign_label, "ozon");
    assert_eq!(connector.uploaded_stock().await.len(), 3);
}

#[tokio::test]
async fn test_duplicate_feed_rows_use_first_occurrence() {
    let connector = Arc::new(MockMarketplace::ozon(&["A"]));
    let bus = EventBus::default();
    let records = vec![record("A", "4", "40.00"), record("A", ">10", "999.00")];

    let report = orchestrator(connector, &bus)
        .run(&records, &CampaignSettings::ozon("client-1"))
        .await
        .unwrap();

    assert_eq!(report.all_stock_updates.len(), 1);
    assert_eq!(report.all_stock_updates[0].count, 4);
    assert_eq!(report.price_updates.len(), 1);
    assert_eq!(report.price_updates[0].value, 40);
}

#[tokio::test]
async fn test_stock_covers_catalog_exactly_and_prices_stay_within_feed() {
    for (catalog_size, feed_size, stride) in [(0, 5, 1), (7, 0, 1), (10, 10, 2), (25, 40, 3)] {
        let catalog: Vec<String> = (0..catalog_size).map(|i| format!("SKU-{}", i)).collect();
        let catalog_refs: Vec<&str> = catalog.iter().map(String::as_str).collect();
        let records: Vec<SupplierRecord> = (0..feed_size)
            .map(|i| record(&format!("SKU-{}", i * stride), "3", "10.00"))
            .collect();

        let connector = Arc::new(MockMarketplace::ozon(&catalog_refs));
        let bus = EventBus::default();
        let report = orchestrator(connector, &bus)
            .run(&records, &CampaignSettings::ozon("client-1"))
            .await
            .unwrap();

        let stock_ids: Vec<&str> = report
            .all_stock_updates
            .iter()
            .map(|u| u.offer_id.as_str())
            .collect();
        let unique: HashSet<&str> = stock_ids.iter().copied().collect();
        assert_eq!(stock_ids.len(), unique.len(), "duplicate stock update");
        assert_eq!(unique, catalog_refs.iter().copied().collect::<HashSet<_>>());

        let feed_codes: HashSet<&str> = records.iter().map(|r| r.offer_code.as_str()).collect();
        for price in &report.price_updates {
            assert!(unique.contains(price.offer_id.as_str()));
            assert!(feed_codes.contains(price.offer_id.as_str()));
        }
    }
}

// ============================================================================
// Abort before dispatch
// ============================================================================

#[tokio::test]
async fn test_catalog_failure_aborts_without_uploads() {
    let connector = Arc::new(MockMarketplace::new(
        MarketplaceKind::YandexMarket,
        PaginationPolicy::Cursor,
        vec![
            Ok(CatalogPage {
                offer_ids: ids(&["A", "B"]),
                next_page_token: Some("page-2".to_string()),
                total: None,
            }),
            Err(BridgeError::Connection("connection reset".to_string())),
        ],
    ));
    let bus = EventBus::default();
    let mut events = EventStream::new(bus.subscribe());
    let campaign = CampaignSettings::yandex_market("fbs", "21000", "555");

    let err = orchestrator(connector.clone(), &bus)
        .run(&[record("A", "5", "1.00")], &campaign)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::CatalogFetchFailed { page: 2, .. }));
    assert!(err.is_transient());
    assert_eq!(connector.upload_calls().await, 0);

    let aborted = events.drain().into_iter().find_map(|event| match event {
        CoreEvent::Sync(SyncEvent::RunAborted {
            stage, recoverable, ..
        }) => Some((stage, recoverable)),
        _ => None,
    });
    assert_eq!(aborted, Some(("catalog".to_string(), true)));
}

#[tokio::test]
async fn test_unreadable_price_aborts_without_uploads() {
    let connector = Arc::new(MockMarketplace::ozon(&["A", "B"]));
    let bus = EventBus::default();
    let records = vec![record("A", "5", "10.00"), record("B", "2", "по запросу")];

    let err = orchestrator(connector.clone(), &bus)
        .run(&records, &CampaignSettings::ozon("client-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidPriceFormat { .. }));
    assert_eq!(connector.upload_calls().await, 0);
}

#[tokio::test]
async fn test_unreadable_quantity_aborts_without_uploads() {
    let connector = Arc::new(MockMarketplace::ozon(&["A"]));
    let bus = EventBus::default();

    let err = orchestrator(connector.clone(), &bus)
        .run(&[record("A", "many", "10.00")], &CampaignSettings::ozon("client-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidQuantityFormat { .. }));
    assert_eq!(connector.upload_calls().await, 0);
}

#[tokio::test]
async fn test_zero_batch_size_aborts_without_uploads() {
    let connector = Arc::new(MockMarketplace::ozon(&["A"]));
    let bus = EventBus::default();
    let mut events = EventStream::new(bus.subscribe());
    let campaign = CampaignSettings::ozon("client-1")
        .with_profile(MarketplaceProfile::new(0, 1000, false, "RUB"));

    let err = orchestrator(connector.clone(), &bus)
        .run(&[record("A", "2", "10.00")], &campaign)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidChunkSize(0)));
    assert_eq!(connector.upload_calls().await, 0);

    let stage = events.drain().into_iter().find_map(|event| match event {
        CoreEvent::Sync(SyncEvent::RunAborted { stage, .. }) => Some(stage),
        _ => None,
    });
    assert_eq!(stage.as_deref(), Some("batching"));
}

#[tokio::test]
async fn test_campaign_for_other_marketplace_is_rejected() {
    let connector = Arc::new(MockMarketplace::ozon(&["A"]));
    let bus = EventBus::default();
    let campaign = CampaignSettings::yandex_market("fbs", "21000", "555");

    let err = orchestrator(connector.clone(), &bus)
        .run(&[], &campaign)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Config(_)));
    assert_eq!(connector.upload_calls().await, 0);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_failed_batch_does_not_stop_siblings() {
    let catalog = ["A", "B", "C", "D", "E"];
    let connector = Arc::new(MockMarketplace::ozon(&catalog).failing_on(&["C"]));
    let bus = EventBus::default();
    let campaign = CampaignSettings::ozon("client-1")
        .with_profile(MarketplaceProfile::new(2, 2, false, "RUB"));
    let records: Vec<SupplierRecord> = catalog.iter().map(|id| record(id, "5", "10.00")).collect();

    let report = orchestrator(connector.clone(), &bus)
        .run(&records, &campaign)
        .await
        .unwrap();

    // 3 stock + 3 price batches, the second of each kind holds "C"
    assert_eq!(report.batch_outcomes.len(), 6);
    assert_eq!(report.failure_count(), 2);
    assert!(!report.is_fully_applied());
    assert_eq!(connector.upload_calls().await, 6);

    let order: Vec<(BatchKind, usize)> = report
        .batch_outcomes
        .iter()
        .map(|outcome| (outcome.kind, outcome.index))
        .collect();
    assert_eq!(
        order,
        vec![
            (BatchKind::Stock, 0),
            (BatchKind::Stock, 1),
            (BatchKind::Stock, 2),
            (BatchKind::Price, 0),
            (BatchKind::Price, 1),
            (BatchKind::Price, 2),
        ]
    );

    let failed = report.failed_batches().next().unwrap();
    match failed.error() {
        Some(SyncError::BatchUploadFailed {
            index,
            batch: FailedBatch::Stock(updates),
            source,
        }) => {
            assert_eq!(*index, 1);
            assert_eq!(
                updates.iter().map(|u| u.offer_id.as_str()).collect::<Vec<_>>(),
                vec!["C", "D"]
            );
            assert!(source.is_transient());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_batches_respect_profile_sizes() {
    let catalog: Vec<String> = (0..7).map(|i| format!("SKU-{}", i)).collect();
    let catalog_refs: Vec<&str> = catalog.iter().map(String::as_str).collect();
    let connector = Arc::new(MockMarketplace::ozon(&catalog_refs));
    let bus = EventBus::default();
    let campaign = CampaignSettings::ozon("client-1")
        .with_profile(MarketplaceProfile::new(3, 5, false, "RUB"));
    let records: Vec<SupplierRecord> = catalog_refs
        .iter()
        .map(|id| record(id, "2", "10.00"))
        .collect();

    orchestrator(connector.clone(), &bus)
        .run(&records, &campaign)
        .await
        .unwrap();

    let mut stock_sizes: Vec<usize> = connector
        .stock_batches
        .lock()
        .await
        .iter()
        .map(Vec::len)
        .collect();
    stock_sizes.sort_unstable();
    assert_eq!(stock_sizes, vec![1, 3, 3]);

    let mut price_sizes: Vec<usize> = connector
        .price_batches
        .lock()
        .await
        .iter()
        .map(Vec::len)
        .collect();
    price_sizes.sort_unstable();
    assert_eq!(price_sizes, vec![2, 5]);
}

#[tokio::test]
async fn test_uploads_are_bounded_and_stock_goes_first() {
    let catalog: Vec<String> = (0..12).map(|i| format!("SKU-{}", i)).collect();
    let catalog_refs: Vec<&str> = catalog.iter().map(String::as_str).collect();
    let connector = Arc::new(MockMarketplace::ozon(&catalog_refs));
    let bus = EventBus::default();
    let campaign = CampaignSettings::ozon("client-1")
        .with_profile(MarketplaceProfile::new(2, 2, false, "RUB"));
    let records: Vec<SupplierRecord> = catalog_refs
        .iter()
        .map(|id| record(id, "2", "10.00"))
        .collect();

    let orchestrator = SyncOrchestrator::new(
        SyncConfig {
            max_concurrent_uploads: 2,
        },
        connector.clone(),
        bus,
        Arc::new(SystemClock),
    );
    let report = orchestrator.run(&records, &campaign).await.unwrap();

    assert_eq!(report.batch_outcomes.len(), 12);
    let peak = connector.peak_in_flight.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in flight was {}", peak);

    let calls = connector.calls.lock().await.clone();
    let first_price = calls.iter().position(|kind| *kind == BatchKind::Price).unwrap();
    assert!(calls[..first_price].iter().all(|kind| *kind == BatchKind::Stock));
    assert!(calls[first_price..].iter().all(|kind| *kind == BatchKind::Price));
}

#[tokio::test]
async fn test_rejected_offers_are_reported_without_failing_batch() {
    let connector = Arc::new(MockMarketplace::ozon(&["A", "B"]).rejecting(&["B"]));
    let bus = EventBus::default();
    let records = vec![record("A", "3", "10.00"), record("B", "3", "10.00")];

    let report = orchestrator(connector, &bus)
        .run(&records, &CampaignSettings::ozon("client-1"))
        .await
        .unwrap();

    assert_eq!(report.failure_count(), 0);
    assert!(!report.is_fully_applied());
    let rejected: Vec<&str> = report
        .rejected_offers()
        .map(|offer| offer.offer_id.as_str())
        .collect();
    assert_eq!(rejected, vec!["B", "B"]);
}

// ============================================================================
// Multi-campaign schema and events
// ============================================================================

#[tokio::test]
async fn test_warehouse_schema_uses_one_observation_time() {
    let observed_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let connector = Arc::new(MockMarketplace::yandex(&[&["A", "B"], &["C"]]));
    let bus = EventBus::default();
    let campaign = CampaignSettings::yandex_market("dbs", "22000", "666");

    let orchestrator = SyncOrchestrator::new(
        SyncConfig::default(),
        connector.clone(),
        bus,
        Arc::new(FixedClock(observed_at)),
    );
    let report = orchestrator
        .run(&[record("B", ">10", "1'500.00 руб.")], &campaign)
        .await
        .unwrap();

    assert_eq!(report.all_stock_updates.len(), 3);
    for update in connector.uploaded_stock().await {
        let stamp = update.warehouse.expect("warehouse stamp");
        assert_eq!(stamp.warehouse_id, "666");
        assert_eq!(stamp.kind, StockKind::Fit);
        assert_eq!(stamp.observed_at, observed_at);
    }
    assert_eq!(report.price_updates[0].value, 1500);
    assert_eq!(report.price_updates[0].currency_code, "RUR");
}

#[tokio::test]
async fn test_run_emits_lifecycle_events() {
    let connector = Arc::new(MockMarketplace::yandex(&[&["A"], &["B"]]).failing_on(&["B"]));
    let bus = EventBus::default();
    let mut events = EventStream::new(bus.subscribe());
    let campaign = CampaignSettings::yandex_market("fbs", "21000", "555")
        .with_profile(MarketplaceProfile::new(1, 1, true, "RUR"));

    let report = orchestrator(connector, &bus)
        .run(&[record("A", "2", "5.00"), record("B", "2", "5.00")], &campaign)
        .await
        .unwrap();

    let received = events.drain();
    let names: Vec<&str> = received.iter().map(CoreEvent::description).collect();
    assert_eq!(names.first(), Some(&"Sync run started"));
    assert_eq!(names.last(), Some(&"Sync run completed"));
    assert_eq!(names.iter().filter(|n| **n == "Catalog page fetched").count(), 2);
    assert_eq!(names.iter().filter(|n| **n == "Batch dispatched").count(), 4);

    match received.last() {
        Some(CoreEvent::Sync(SyncEvent::RunCompleted {
            run_id,
            batches,
            failed_batches,
            ..
        })) => {
            assert_eq!(run_id, &report.run_id);
            assert_eq!(*batches, 4);
            assert_eq!(*failed_batches, 2);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
