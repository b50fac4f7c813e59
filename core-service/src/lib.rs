//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP transport,
//! supplier feed, clock) and the marketplace connectors into the sync engine.
//! Hosts with a regular network stack enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) and call [`bootstrap_desktop`].

pub mod error;

pub use error::{CoreError, Result};

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::{
    feed::SupplierFeedSource,
    http::HttpClient,
    marketplace::{MarketplaceConnector, MarketplaceKind, SupplierRecord},
    time::{Clock, SystemClock},
};
use core_runtime::config::{CampaignSettings, SyncSettings};
use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
use core_sync::{RunReport, SyncConfig, SyncError, SyncOrchestrator};
use provider_ozon::OzonConnector;
use provider_yandex_market::YandexMarketConnector;
use tracing::{error, info, instrument, warn};

#[cfg(feature = "desktop-shims")]
use bridge_desktop::{ArchiveSupplierFeed, ReqwestHttpClient};

/// Aggregated handle to the bridge dependencies the service requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub feed: Arc<dyn SupplierFeedSource>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle using the system clock.
    pub fn new(http_client: Arc<dyn HttpClient>, feed: Arc<dyn SupplierFeedSource>) -> Self {
        Self {
            http_client,
            feed,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// How one configured campaign ended.
#[derive(Debug)]
pub struct CampaignOutcome {
    pub label: String,
    pub marketplace: MarketplaceKind,
    /// Report of a completed run, or the error that aborted it.
    pub result: std::result::Result<RunReport, SyncError>,
}

impl CampaignOutcome {
    /// Run completed with every batch uploaded and nothing rejected.
    pub fn is_fully_applied(&self) -> bool {
        matches!(&self.result, Ok(report) if report.is_fully_applied())
    }
}

/// Primary façade exposed to host applications.
///
/// Loads the supplier feed once per [`run_all`](Self::run_all) and syncs
/// every configured campaign in order. A campaign that aborts does not stop
/// the ones after it.
pub struct MarketplaceSyncService {
    settings: SyncSettings,
    http_client: Arc<dyn HttpClient>,
    feed: Arc<dyn SupplierFeedSource>,
    clock: Arc<dyn Clock>,
    orchestrators: HashMap<MarketplaceKind, SyncOrchestrator>,
    event_bus: EventBus,
}

impl MarketplaceSyncService {
    /// Create a service with no marketplace connectors registered.
    ///
    /// Connectors are added with [`with_connector`](Self::with_connector);
    /// campaigns for a marketplace without one fail at run time.
    pub fn new(settings: SyncSettings, deps: CoreDependencies, event_bus: EventBus) -> Self {
        Self {
            settings,
            http_client: deps.http_client,
            feed: deps.feed,
            clock: deps.clock,
            orchestrators: HashMap::new(),
            event_bus,
        }
    }

    /// Register the connector for its marketplace, replacing any previous one.
    ///
    /// Stock observation times come from the clock in the service's
    /// [`CoreDependencies`].
    pub fn with_connector(mut self, connector: Arc<dyn MarketplaceConnector>) -> Self {
        let config = SyncConfig {
            max_concurrent_uploads: self.settings.max_concurrent_uploads,
        };
        let marketplace = connector.marketplace();
        let orchestrator = SyncOrchestrator::new(
            config,
            connector,
            self.event_bus.clone(),
            self.clock.clone(),
        );
        self.orchestrators.insert(marketplace, orchestrator);
        self
    }

    /// Build a service with the Ozon and Yandex Market connectors the
    /// configured campaigns need, using the credentials in `settings`.
    ///
    /// # Errors
    ///
    /// Fails if `settings` is invalid or a campaign's marketplace has no
    /// credentials.
    pub fn from_settings(
        settings: SyncSettings,
        deps: CoreDependencies,
        event_bus: EventBus,
    ) -> Result<Self> {
        settings.validate()?;

        let service = Self::new(settings, deps, event_bus);
        let settings = &service.settings;
        let http_client = &service.http_client;
        let needs = |kind: MarketplaceKind| settings.campaigns.iter().any(|c| c.marketplace == kind);

        let mut connectors: Vec<Arc<dyn MarketplaceConnector>> = Vec::new();

        if needs(MarketplaceKind::Ozon) {
            let credentials = settings.ozon.as_ref().ok_or_else(|| missing_credentials("ozon"))?;
            connectors.push(Arc::new(OzonConnector::new(
                http_client.clone(),
                credentials.client_id.clone(),
                credentials.api_key.clone(),
            )));
        }

        if needs(MarketplaceKind::YandexMarket) {
            let credentials = settings
                .yandex_market
                .as_ref()
                .ok_or_else(|| missing_credentials("yandex_market"))?;
            connectors.push(Arc::new(YandexMarketConnector::new(
                http_client.clone(),
                credentials.token.clone(),
            )));
        }

        let service = connectors
            .into_iter()
            .fold(service, |service, connector| service.with_connector(connector));

        info!(
            campaigns = service.settings.campaigns.len(),
            connectors = service.orchestrators.len(),
            "Marketplace sync service ready"
        );
        Ok(service)
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Bus the service and its orchestrators publish events on.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Load the supplier feed and sync every configured campaign.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FeedUnavailable`] (wrapped in [`CoreError::Sync`])
    /// when the feed cannot be loaded; no campaign is attempted then.
    /// Campaign failures are reported per campaign in the returned outcomes.
    #[instrument(skip(self), fields(campaigns = self.settings.campaigns.len()))]
    pub async fn run_all(&self) -> Result<Vec<CampaignOutcome>> {
        let records = match self.feed.load_supplier_feed().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Supplier feed unavailable");
                self.event_bus
                    .emit(CoreEvent::Feed(FeedEvent::Failed {
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(SyncError::FeedUnavailable(e).into());
            }
        };

        info!(records = records.len(), "Supplier feed loaded");
        self.event_bus
            .emit(CoreEvent::Feed(FeedEvent::Loaded {
                records: records.len() as u64,
            }))
            .ok();

        let mut outcomes = Vec::with_capacity(self.settings.campaigns.len());
        for campaign in &self.settings.campaigns {
            outcomes.push(self.run_campaign(&records, campaign).await);
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(failed, "Some campaigns aborted");
        }
        Ok(outcomes)
    }

    /// Sync one campaign against already loaded feed rows.
    pub async fn run_campaign(
        &self,
        records: &[SupplierRecord],
        campaign: &CampaignSettings,
    ) -> CampaignOutcome {
        let result = match self.orchestrators.get(&campaign.marketplace) {
            Some(orchestrator) => orchestrator.run(records, campaign).await,
            None => Err(SyncError::Config(core_runtime::Error::CapabilityMissing {
                capability: format!("{}_connector", campaign.marketplace),
                message: format!("no connector registered for campaign '{}'", campaign.label),
            })),
        };

        if let Err(e) = &result {
            warn!(campaign = %campaign.label, error = %e, "Campaign aborted");
        }

        CampaignOutcome {
            label: campaign.label.clone(),
            marketplace: campaign.marketplace,
            result,
        }
    }
}

fn missing_credentials(marketplace: &str) -> CoreError {
    CoreError::CapabilityMissing {
        capability: format!("{}_credentials", marketplace),
        message: "campaign configured without credentials".to_string(),
    }
}

/// Build a service backed by `reqwest` and the supplier archive feed.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_runtime::config::SyncSettings;
/// use core_runtime::events::EventBus;
///
/// let settings = SyncSettings::from_env()?;
/// let service = core_service::bootstrap_desktop(settings, EventBus::default())?;
/// for outcome in service.run_all().await? {
///     println!("{}: fully applied = {}", outcome.label, outcome.is_fully_applied());
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(settings: SyncSettings, event_bus: EventBus) -> Result<MarketplaceSyncService> {
    let http_client: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::new().map_err(|err| CoreError::InitializationFailed(err.to_string()))?,
    );
    let feed = ArchiveSupplierFeed::new(http_client.clone(), settings.feed_url.clone())
        .with_preamble_rows(settings.feed_preamble_rows);

    MarketplaceSyncService::from_settings(
        settings,
        CoreDependencies::new(http_client, Arc::new(feed)),
        event_bus,
    )
}
