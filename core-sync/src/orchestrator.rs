//! # Sync Orchestrator
//!
//! Runs one marketplace campaign end to end.
//!
//! ## Workflow
//!
//! 1. Check the campaign against the connector (marketplace, warehouse, limits)
//! 2. Walk the catalog listing to completion
//! 3. Reconcile stock (whole catalog) and prices (matched ids)
//! 4. Split both update lists into endpoint-sized batches
//! 5. Upload every stock batch, then every price batch
//! 6. Report per-batch outcomes
//!
//! Steps 1 to 4 either succeed completely or abort the run with nothing
//! uploaded. From step 5 on, a failed batch is recorded and its siblings are
//! still attempted; the run only returns once every batch has an outcome.
//!
//! Batches of one kind are uploaded concurrently, at most
//! [`SyncConfig::max_concurrent_uploads`] at a time. The orchestrator never
//! retries; a failed batch is handed back inside its error for the caller to
//! retry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(
//!     SyncConfig::default(),
//!     connector,
//!     event_bus,
//!     Arc::new(SystemClock),
//! );
//! let report = orchestrator.run(&records, &campaign).await?;
//! println!("{} of {} batches failed", report.failure_count(), report.batch_outcomes.len());
//! ```

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::marketplace::{
    CampaignContext, MarketplaceConnector, MarketplaceKind, PriceUpdate, RejectedOffer,
    StockKind, StockUpdate, SupplierRecord, UploadReceipt, WarehouseStamp,
};
use bridge_traits::time::Clock;
use core_runtime::config::{CampaignSettings, DEFAULT_MAX_CONCURRENT_UPLOADS};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::batch::{chunk, BatchKind, Batches, FailedBatch};
use crate::catalog::CatalogOfferSet;
use crate::error::{Result, SyncError};
use crate::paginator::CatalogPaginator;
use crate::reconciler::{PriceReconciler, StockReconciler};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum batch uploads in flight at once
    pub max_concurrent_uploads: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }
}

/// Result of uploading one batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub kind: BatchKind,
    /// 0-based position among batches of the same kind.
    pub index: usize,
    /// Number of updates in the batch.
    pub size: usize,
    /// Marketplace receipt, or [`SyncError::BatchUploadFailed`].
    pub result: Result<UploadReceipt>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&SyncError> {
        self.result.as_ref().err()
    }

    /// Offers refused inside an accepted batch.
    pub fn rejected(&self) -> &[RejectedOffer] {
        match &self.result {
            Ok(receipt) => &receipt.rejected,
            Err(_) => &[],
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub campaign_label: String,
    pub marketplace: MarketplaceKind,
    /// Stock updates with a count other than zero.
    pub non_zero_stock_updates: Vec<StockUpdate>,
    /// One stock update per catalog offer.
    pub all_stock_updates: Vec<StockUpdate>,
    pub price_updates: Vec<PriceUpdate>,
    /// Stock outcomes first, then price outcomes, each by batch index.
    pub batch_outcomes: Vec<BatchOutcome>,
}

impl RunReport {
    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.batch_outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn failure_count(&self) -> usize {
        self.failed_batches().count()
    }

    pub fn rejected_offers(&self) -> impl Iterator<Item = &RejectedOffer> {
        self.batch_outcomes
            .iter()
            .flat_map(|outcome| outcome.rejected().iter())
    }

    /// Every batch uploaded and no offer was rejected.
    pub fn is_fully_applied(&self) -> bool {
        self.failure_count() == 0 && self.rejected_offers().next().is_none()
    }
}

/// Drives catalog listing, reconciliation and batch upload for one campaign.
pub struct SyncOrchestrator {
    config: SyncConfig,
    connector: Arc<dyn MarketplaceConnector>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - Upload concurrency
    /// * `connector` - Catalog, stock and price endpoints of one marketplace
    /// * `event_bus` - Receives run events; nobody has to listen
    /// * `clock` - Source of the stock observation time
    pub fn new(
        config: SyncConfig,
        connector: Arc<dyn MarketplaceConnector>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            connector,
            event_bus,
            clock,
        }
    }

    pub fn marketplace(&self) -> MarketplaceKind {
        self.connector.marketplace()
    }

    /// Sync `campaign` against the supplier `records`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the run aborts before dispatch: invalid
    /// campaign, catalog failure, unreadable quantity or price, invalid batch
    /// size. Upload failures are reported inside [`RunReport::batch_outcomes`].
    #[instrument(
        skip(self, records, campaign),
        fields(
            campaign = %campaign.label,
            marketplace = %campaign.marketplace,
            run_id = tracing::field::Empty,
        )
    )]
    pub async fn run(
        &self,
        records: &[SupplierRecord],
        campaign: &CampaignSettings,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        let started = Instant::now();

        info!(records = records.len(), "Starting sync run");
        self.emit(SyncEvent::RunStarted {
            run_id: run_id.clone(),
            marketplace: campaign.marketplace.to_string(),
            campaign_id: campaign.campaign_id.clone(),
        });

        let context = self
            .check_campaign(campaign)
            .map_err(|err| self.aborted(&run_id, "config", err))?;

        let catalog = self
            .fetch_catalog(&run_id, &context)
            .await
            .map_err(|err| self.aborted(&run_id, "catalog", err))?;

        let stock_reconciler = self
            .stock_reconciler(campaign, &context)
            .map_err(|err| self.aborted(&run_id, "config", err))?;
        let stock = stock_reconciler
            .reconcile(records, &catalog)
            .map_err(|err| self.aborted(&run_id, "reconcile", err))?;
        let prices = PriceReconciler::new(campaign.profile.currency_code.clone())
            .reconcile(records, &catalog)
            .map_err(|err| self.aborted(&run_id, "reconcile", err))?;

        let stock_batches = chunk(&stock.updates, campaign.profile.stock_batch_size)
            .map_err(|err| self.aborted(&run_id, "batching", err))?;
        let price_batches = chunk(&prices, campaign.profile.price_batch_size)
            .map_err(|err| self.aborted(&run_id, "batching", err))?;

        info!(
            catalog = catalog.len(),
            matched = stock.matched,
            synthesized = stock.synthesized(),
            prices = prices.len(),
            stock_batches = stock_batches.len(),
            price_batches = price_batches.len(),
            "Reconciled feed against catalog"
        );
        self.emit(SyncEvent::Reconciled {
            run_id: run_id.clone(),
            catalog_size: catalog.len() as u64,
            matched_stock: stock.matched as u64,
            synthesized_stock: stock.synthesized() as u64,
            price_updates: prices.len() as u64,
        });

        let mut batch_outcomes = self
            .dispatch(&run_id, BatchKind::Stock, stock_batches, FailedBatch::Stock, |batch| {
                self.connector.upload_stock_batch(batch, &context)
            })
            .await;
        batch_outcomes.extend(
            self.dispatch(&run_id, BatchKind::Price, price_batches, FailedBatch::Price, |batch| {
                self.connector.upload_price_batch(batch, &context)
            })
            .await,
        );
        batch_outcomes.sort_by_key(|outcome| (outcome.kind, outcome.index));

        let report = RunReport {
            run_id: run_id.clone(),
            campaign_label: campaign.label.clone(),
            marketplace: campaign.marketplace,
            non_zero_stock_updates: stock.non_zero(),
            all_stock_updates: stock.updates,
            price_updates: prices,
            batch_outcomes,
        };

        let failed = report.failure_count();
        if failed > 0 {
            warn!(
                failed,
                total = report.batch_outcomes.len(),
                "Sync run completed with failed batches"
            );
        } else {
            info!(
                batches = report.batch_outcomes.len(),
                non_zero_stock = report.non_zero_stock_updates.len(),
                "Sync run completed"
            );
        }

        self.emit(SyncEvent::RunCompleted {
            run_id,
            batches: report.batch_outcomes.len() as u64,
            failed_batches: failed as u64,
            non_zero_stock: report.non_zero_stock_updates.len() as u64,
            duration_ms: started.elapsed().as_millis() as u64,
        });

        Ok(report)
    }

    fn check_campaign(&self, campaign: &CampaignSettings) -> Result<CampaignContext> {
        let connector = self.connector.marketplace();
        if campaign.marketplace != connector {
            return Err(core_runtime::Error::Config(format!(
                "campaign '{}' targets {} but the connector serves {}",
                campaign.label, campaign.marketplace, connector
            ))
            .into());
        }

        let has_warehouse = campaign
            .warehouse_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if campaign.profile.include_warehouse_fields && !has_warehouse {
            return Err(core_runtime::Error::Config(format!(
                "campaign '{}' reports warehouse stock but has no warehouse id",
                campaign.label
            ))
            .into());
        }

        Ok(campaign.context())
    }

    fn stock_reconciler(
        &self,
        campaign: &CampaignSettings,
        context: &CampaignContext,
    ) -> Result<StockReconciler> {
        if !campaign.profile.include_warehouse_fields {
            return Ok(StockReconciler::new());
        }

        let warehouse_id = context.warehouse_id.clone().ok_or_else(|| {
            core_runtime::Error::Config(format!("campaign '{}' has no warehouse id", campaign.label))
        })?;

        Ok(StockReconciler::new().with_warehouse(WarehouseStamp {
            warehouse_id,
            kind: StockKind::Fit,
            observed_at: self.clock.now(),
        }))
    }

    async fn fetch_catalog(&self, run_id: &str, context: &CampaignContext) -> Result<CatalogOfferSet> {
        let paginator = CatalogPaginator::new(self.connector.as_ref(), context);
        let mut pages = std::pin::pin!(paginator.pages());
        let mut catalog = CatalogOfferSet::new();

        while let Some(page) = pages.try_next().await? {
            debug!(
                page = page.number,
                offers = page.offer_ids.len(),
                accumulated = page.accumulated,
                total = ?page.total,
                "Catalog page fetched"
            );
            self.emit(SyncEvent::CatalogPageFetched {
                run_id: run_id.to_string(),
                page: page.number,
                offers_so_far: page.accumulated,
                total: page.total,
            });
            catalog.extend(page.offer_ids);
        }

        info!(offers = catalog.len(), "Catalog fetched");
        Ok(catalog)
    }

    /// Upload every batch, at most `max_concurrent_uploads` at once, and
    /// collect one outcome per batch in completion order.
    async fn dispatch<'b, T, F, Fut>(
        &self,
        run_id: &str,
        kind: BatchKind,
        batches: Batches<'b, T>,
        wrap: fn(Vec<T>) -> FailedBatch,
        upload: F,
    ) -> Vec<BatchOutcome>
    where
        T: Clone,
        F: Fn(&'b [T]) -> Fut,
        Fut: Future<Output = BridgeResult<UploadReceipt>>,
    {
        let limit = self.config.max_concurrent_uploads.max(1);
        let upload = &upload;

        stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| async move {
                let result = upload(batch).await;
                let outcome = BatchOutcome {
                    kind,
                    index,
                    size: batch.len(),
                    result: result.map_err(|source| SyncError::BatchUploadFailed {
                        index,
                        batch: wrap(batch.to_vec()),
                        source,
                    }),
                };
                self.record_outcome(run_id, &outcome);
                outcome
            })
            .buffer_unordered(limit)
            .collect()
            .await
    }

    fn record_outcome(&self, run_id: &str, outcome: &BatchOutcome) {
        match &outcome.result {
            Ok(receipt) if receipt.rejected.is_empty() => {
                debug!(kind = %outcome.kind, index = outcome.index, size = outcome.size, "Batch uploaded");
            }
            Ok(receipt) => {
                warn!(
                    kind = %outcome.kind,
                    index = outcome.index,
                    rejected = receipt.rejected.len(),
                    "Batch uploaded with rejected offers"
                );
            }
            Err(err) => {
                warn!(
                    kind = %outcome.kind,
                    index = outcome.index,
                    transient = err.is_transient(),
                    error = %err,
                    "Batch upload failed"
                );
            }
        }

        self.emit(SyncEvent::BatchDispatched {
            run_id: run_id.to_string(),
            kind: outcome.kind.to_string(),
            index: outcome.index as u32,
            size: outcome.size as u64,
            succeeded: outcome.is_success(),
            rejected: outcome.rejected().len() as u64,
            error: outcome.error().map(ToString::to_string),
        });
    }

    fn aborted(&self, run_id: &str, stage: &str, err: SyncError) -> SyncError {
        warn!(stage, error = %err, "Sync run aborted before dispatch");
        self.emit(SyncEvent::RunAborted {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
            message: err.to_string(),
            recoverable: err.is_transient(),
        });
        err
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }
}
