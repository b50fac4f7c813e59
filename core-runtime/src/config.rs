//! # Sync Configuration Module
//!
//! Explicit configuration for a sync process: which marketplace campaigns to
//! reconcile, the batch limits of each endpoint, the supplier feed location
//! and the marketplace credentials.
//!
//! ## Overview
//!
//! [`SyncSettings`] is built with a builder and validated fail-fast, the same
//! way for hand-wired hosts and for [`SyncSettings::from_env`]. Nothing in the
//! sync engine reads process-wide state; everything it needs arrives through
//! these types.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{CampaignSettings, OzonCredentials, SyncSettings};
//!
//! let settings = SyncSettings::builder()
//!     .ozon_credentials(OzonCredentials::new("123456", "api-key"))
//!     .campaign(CampaignSettings::ozon("123456"))
//!     .max_concurrent_uploads(2)
//!     .build()
//!     .expect("valid settings");
//!
//! assert_eq!(settings.campaigns.len(), 1);
//! ```
//!
//! ## Error Handling
//!
//! A campaign without credentials for its marketplace, a multi-campaign
//! profile without a warehouse, or a zero batch size is rejected at build
//! time:
//!
//! ```should_panic
//! use core_runtime::config::{CampaignSettings, SyncSettings};
//!
//! SyncSettings::builder()
//!     .campaign(CampaignSettings::ozon("123456"))
//!     .build()
//!     .expect("Should fail - missing Ozon credentials");
//! ```

use crate::error::{Error, Result};
use crate::logging::mask_secret;
use bridge_traits::marketplace::{CampaignContext, MarketplaceKind};
use std::collections::HashSet;
use std::fmt;

/// Default number of batch uploads in flight per campaign run.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;

/// Where the supplier publishes its stock archive.
pub const DEFAULT_FEED_URL: &str = "https://timeworld.ru/upload/files/ostatki.zip";

/// Rows above the header row in the supplier's sheet export.
pub const DEFAULT_FEED_PREAMBLE_ROWS: usize = 17;

/// Upper bound for `max_concurrent_uploads`.
const MAX_CONCURRENT_UPLOADS_LIMIT: usize = 64;

// ============================================================================
// Marketplace profile
// ============================================================================

/// Endpoint limits and stock schema of one marketplace (or fulfillment model).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceProfile {
    /// Maximum stock updates per upload call.
    pub stock_batch_size: usize,
    /// Maximum price updates per upload call.
    pub price_batch_size: usize,
    /// Attach warehouse id, stock type and observation time to stock updates.
    pub include_warehouse_fields: bool,
    /// Currency code sent with every price update.
    pub currency_code: String,
}

impl MarketplaceProfile {
    pub fn new(
        stock_batch_size: usize,
        price_batch_size: usize,
        include_warehouse_fields: bool,
        currency_code: impl Into<String>,
    ) -> Self {
        Self {
            stock_batch_size,
            price_batch_size,
            include_warehouse_fields,
            currency_code: currency_code.into(),
        }
    }

    /// Limits of the Ozon seller API import endpoints.
    pub fn ozon() -> Self {
        Self::new(100, 1000, false, "RUB")
    }

    /// Limits of the Yandex Market partner API stock and price endpoints.
    pub fn yandex_market() -> Self {
        Self::new(2000, 500, true, "RUR")
    }

    pub fn validate(&self) -> Result<()> {
        if self.stock_batch_size == 0 {
            return Err(Error::Config(
                "stock_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.price_batch_size == 0 {
            return Err(Error::Config(
                "price_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.currency_code.trim().is_empty() {
            return Err(Error::Config("currency_code cannot be empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Campaigns
// ============================================================================

/// One marketplace catalog to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSettings {
    /// Name used in logs, events and the service result.
    pub label: String,
    pub marketplace: MarketplaceKind,
    /// Ozon client id or Yandex Market campaign id.
    pub campaign_id: String,
    /// Warehouse stock is reported for (multi-campaign schema only).
    pub warehouse_id: Option<String>,
    pub profile: MarketplaceProfile,
}

impl CampaignSettings {
    /// The single Ozon store of a seller account.
    pub fn ozon(client_id: impl Into<String>) -> Self {
        Self {
            label: "ozon".to_string(),
            marketplace: MarketplaceKind::Ozon,
            campaign_id: client_id.into(),
            warehouse_id: None,
            profile: MarketplaceProfile::ozon(),
        }
    }

    /// A Yandex Market campaign stocked from `warehouse_id`.
    pub fn yandex_market(
        label: impl Into<String>,
        campaign_id: impl Into<String>,
        warehouse_id: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            marketplace: MarketplaceKind::YandexMarket,
            campaign_id: campaign_id.into(),
            warehouse_id: Some(warehouse_id.into()),
            profile: MarketplaceProfile::yandex_market(),
        }
    }

    /// Replace the endpoint profile.
    pub fn with_profile(mut self, profile: MarketplaceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Context handed to connector calls for this campaign.
    pub fn context(&self) -> CampaignContext {
        let context = CampaignContext::new(self.campaign_id.clone());
        match &self.warehouse_id {
            Some(warehouse_id) => context.with_warehouse(warehouse_id.clone()),
            None => context,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::Config("campaign label cannot be empty".to_string()));
        }
        if self.campaign_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "campaign '{}' has an empty campaign id",
                self.label
            )));
        }
        let has_warehouse = self
            .warehouse_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if self.profile.include_warehouse_fields && !has_warehouse {
            return Err(Error::Config(format!(
                "campaign '{}' reports warehouse stock but has no warehouse id",
                self.label
            )));
        }
        self.profile.validate()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Ozon seller API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct OzonCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl OzonCredentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for OzonCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OzonCredentials")
            .field("client_id", &self.client_id)
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

/// Yandex Market partner API OAuth token.
#[derive(Clone, PartialEq, Eq)]
pub struct YandexCredentials {
    pub token: String,
}

impl YandexCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for YandexCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YandexCredentials")
            .field("token", &mask_secret(&self.token))
            .finish()
    }
}

// ============================================================================
// Sync settings
// ============================================================================

/// Everything a sync process needs to run every configured campaign.
///
/// Use [`SyncSettingsBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Campaigns in the order they are synced.
    pub campaigns: Vec<CampaignSettings>,
    /// Batch uploads in flight per campaign run.
    pub max_concurrent_uploads: usize,
    /// Location of the supplier stock archive.
    pub feed_url: String,
    /// Rows to skip before the feed's header row.
    pub feed_preamble_rows: usize,
    pub ozon: Option<OzonCredentials>,
    pub yandex_market: Option<YandexCredentials>,
}

impl SyncSettings {
    /// Creates a new builder for constructing `SyncSettings`.
    pub fn builder() -> SyncSettingsBuilder {
        SyncSettingsBuilder::default()
    }

    /// Reads settings from the process environment.
    ///
    /// See [`SyncSettings::from_lookup`] for the variables consulted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `SELLER_TOKEN`, `CLIENT_ID` | Ozon credentials and the Ozon campaign |
    /// | `MARKET_TOKEN` | Yandex Market credentials |
    /// | `FBS_ID`, `WAREHOUSE_FBS_ID` | Yandex Market FBS campaign |
    /// | `DBS_ID`, `WAREHOUSE_DBS_ID` | Yandex Market DBS campaign |
    /// | `SUPPLIER_FEED_URL` | Feed location (optional) |
    /// | `MAX_CONCURRENT_UPLOADS` | Upload concurrency (optional) |
    ///
    /// A marketplace whose variables are absent is not configured. Blank
    /// values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut builder = SyncSettings::builder();

        if let (Some(api_key), Some(client_id)) = (var("SELLER_TOKEN"), var("CLIENT_ID")) {
            builder = builder
                .campaign(CampaignSettings::ozon(client_id.clone()))
                .ozon_credentials(OzonCredentials::new(client_id, api_key));
        }

        if let Some(token) = var("MARKET_TOKEN") {
            builder = builder.yandex_credentials(YandexCredentials::new(token));
            for (label, campaign_key, warehouse_key) in [
                ("yandex_market_fbs", "FBS_ID", "WAREHOUSE_FBS_ID"),
                ("yandex_market_dbs", "DBS_ID", "WAREHOUSE_DBS_ID"),
            ] {
                match (var(campaign_key), var(warehouse_key)) {
                    (Some(campaign_id), Some(warehouse_id)) => {
                        builder = builder.campaign(CampaignSettings::yandex_market(
                            label,
                            campaign_id,
                            warehouse_id,
                        ));
                    }
                    (Some(_), None) => {
                        return Err(Error::Config(format!(
                            "{} is set but {} is missing",
                            campaign_key, warehouse_key
                        )));
                    }
                    _ => {}
                }
            }
        }

        if let Some(feed_url) = var("SUPPLIER_FEED_URL") {
            builder = builder.feed_url(feed_url);
        }

        if let Some(raw) = var("MAX_CONCURRENT_UPLOADS") {
            let value = raw.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("MAX_CONCURRENT_UPLOADS '{}' is invalid: {}", raw, e))
            })?;
            builder = builder.max_concurrent_uploads(value);
        }

        builder.build()
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.campaigns.is_empty() {
            return Err(Error::Config(
                "No marketplace campaign is configured. Set SELLER_TOKEN and CLIENT_ID \
                 for Ozon, or MARKET_TOKEN with FBS_ID/DBS_ID for Yandex Market."
                    .to_string(),
            ));
        }

        if self.max_concurrent_uploads == 0 {
            return Err(Error::Config(
                "max_concurrent_uploads must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_uploads > MAX_CONCURRENT_UPLOADS_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent_uploads cannot exceed {}",
                MAX_CONCURRENT_UPLOADS_LIMIT
            )));
        }

        if self.feed_url.trim().is_empty() {
            return Err(Error::Config("feed_url cannot be empty".to_string()));
        }

        let mut labels = HashSet::new();
        for campaign in &self.campaigns {
            campaign.validate()?;

            if !labels.insert(campaign.label.as_str()) {
                return Err(Error::Config(format!(
                    "campaign label '{}' is used more than once",
                    campaign.label
                )));
            }

            match campaign.marketplace {
                MarketplaceKind::Ozon if self.ozon.is_none() => {
                    return Err(credentials_missing_error(campaign));
                }
                MarketplaceKind::YandexMarket if self.yandex_market.is_none() => {
                    return Err(credentials_missing_error(campaign));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn credentials_missing_error(campaign: &CampaignSettings) -> Error {
    Error::CapabilityMissing {
        capability: format!("{} credentials", campaign.marketplace),
        message: format!(
            "Campaign '{}' targets {} but no credentials were provided.",
            campaign.label, campaign.marketplace
        ),
    }
}

/// Builder for [`SyncSettings`].
#[derive(Debug, Default)]
pub struct SyncSettingsBuilder {
    campaigns: Vec<CampaignSettings>,
    max_concurrent_uploads: Option<usize>,
    feed_url: Option<String>,
    feed_preamble_rows: Option<usize>,
    ozon: Option<OzonCredentials>,
    yandex_market: Option<YandexCredentials>,
}

impl SyncSettingsBuilder {
    /// Adds a campaign; campaigns run in insertion order.
    pub fn campaign(mut self, campaign: CampaignSettings) -> Self {
        self.campaigns.push(campaign);
        self
    }

    /// Sets the upload concurrency (default: 4).
    pub fn max_concurrent_uploads(mut self, limit: usize) -> Self {
        self.max_concurrent_uploads = Some(limit);
        self
    }

    pub fn feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    pub fn feed_preamble_rows(mut self, rows: usize) -> Self {
        self.feed_preamble_rows = Some(rows);
        self
    }

    pub fn ozon_credentials(mut self, credentials: OzonCredentials) -> Self {
        self.ozon = Some(credentials);
        self
    }

    pub fn yandex_credentials(mut self, credentials: YandexCredentials) -> Self {
        self.yandex_market = Some(credentials);
        self
    }

    /// Builds and validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid values and
    /// [`Error::CapabilityMissing`] when a campaign's credentials are absent.
    pub fn build(self) -> Result<SyncSettings> {
        let settings = SyncSettings {
            campaigns: self.campaigns,
            max_concurrent_uploads: self
                .max_concurrent_uploads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_UPLOADS),
            feed_url: self
                .feed_url
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_preamble_rows: self
                .feed_preamble_rows
                .unwrap_or(DEFAULT_FEED_PREAMBLE_ROWS),
            ozon: self.ozon,
            yandex_market: self.yandex_market,
        };

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_profile_presets() {
        let ozon = MarketplaceProfile::ozon();
        assert_eq!(ozon.stock_batch_size, 100);
        assert_eq!(ozon.price_batch_size, 1000);
        assert!(!ozon.include_warehouse_fields);
        assert_eq!(ozon.currency_code, "RUB");

        let market = MarketplaceProfile::yandex_market();
        assert_eq!(market.stock_batch_size, 2000);
        assert_eq!(market.price_batch_size, 500);
        assert!(market.include_warehouse_fields);
        assert_eq!(market.currency_code, "RUR");
    }

    #[test]
    fn test_profile_rejects_zero_batch_size() {
        let profile = MarketplaceProfile::new(0, 10, false, "RUB");
        assert!(matches!(profile.validate(), Err(Error::Config(_))));

        let profile = MarketplaceProfile::new(10, 0, false, "RUB");
        assert!(matches!(profile.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_campaign_context_carries_warehouse() {
        let campaign = CampaignSettings::yandex_market("fbs", "21000", "555");
        let context = campaign.context();
        assert_eq!(context.campaign_id, "21000");
        assert_eq!(context.warehouse_id.as_deref(), Some("555"));

        let ozon = CampaignSettings::ozon("42").context();
        assert!(ozon.warehouse_id.is_none());
    }

    #[test]
    fn test_warehouse_profile_requires_warehouse() {
        let campaign =
            CampaignSettings::ozon("42").with_profile(MarketplaceProfile::yandex_market());
        assert!(matches!(campaign.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let settings = SyncSettings::builder()
            .ozon_credentials(OzonCredentials::new("42", "key"))
            .campaign(CampaignSettings::ozon("42"))
            .build()
            .unwrap();

        assert_eq!(settings.max_concurrent_uploads, DEFAULT_MAX_CONCURRENT_UPLOADS);
        assert_eq!(settings.feed_url, DEFAULT_FEED_URL);
        assert_eq!(settings.feed_preamble_rows, DEFAULT_FEED_PREAMBLE_ROWS);
    }

    #[test]
    fn test_builder_requires_campaign() {
        let result = SyncSettings::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_credentials() {
        let result = SyncSettings::builder()
            .campaign(CampaignSettings::yandex_market("fbs", "21000", "555"))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "yandex_market credentials");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_duplicate_labels() {
        let result = SyncSettings::builder()
            .yandex_credentials(YandexCredentials::new("token"))
            .campaign(CampaignSettings::yandex_market("fbs", "1", "10"))
            .campaign(CampaignSettings::yandex_market("fbs", "2", "20"))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        let result = SyncSettings::builder()
            .ozon_credentials(OzonCredentials::new("42", "key"))
            .campaign(CampaignSettings::ozon("42"))
            .max_concurrent_uploads(0)
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup_reads_all_campaigns() {
        let settings = SyncSettings::from_lookup(lookup_from(&[
            ("SELLER_TOKEN", "ozon-key"),
            ("CLIENT_ID", "42"),
            ("MARKET_TOKEN", "ym-token"),
            ("FBS_ID", "21000"),
            ("WAREHOUSE_FBS_ID", "555"),
            ("DBS_ID", "22000"),
            ("WAREHOUSE_DBS_ID", "666"),
            ("MAX_CONCURRENT_UPLOADS", "8"),
        ]))
        .unwrap();

        let labels: Vec<&str> = settings.campaigns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["ozon", "yandex_market_fbs", "yandex_market_dbs"]);
        assert_eq!(settings.campaigns[2].warehouse_id.as_deref(), Some("666"));
        assert_eq!(settings.max_concurrent_uploads, 8);
        assert_eq!(settings.ozon.as_ref().unwrap().api_key, "ozon-key");
    }

    #[test]
    fn test_from_lookup_skips_unconfigured_marketplace() {
        let settings = SyncSettings::from_lookup(lookup_from(&[
            ("MARKET_TOKEN", "ym-token"),
            ("DBS_ID", "22000"),
            ("WAREHOUSE_DBS_ID", "666"),
            ("SUPPLIER_FEED_URL", "https://example.com/feed.zip"),
        ]))
        .unwrap();

        assert_eq!(settings.campaigns.len(), 1);
        assert_eq!(settings.campaigns[0].label, "yandex_market_dbs");
        assert!(settings.ozon.is_none());
        assert_eq!(settings.feed_url, "https://example.com/feed.zip");
    }

    #[test]
    fn test_from_lookup_requires_warehouse_for_campaign() {
        let result = SyncSettings::from_lookup(lookup_from(&[
            ("MARKET_TOKEN", "ym-token"),
            ("FBS_ID", "21000"),
        ]));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup_rejects_bad_concurrency() {
        let result = SyncSettings::from_lookup(lookup_from(&[
            ("SELLER_TOKEN", "ozon-key"),
            ("CLIENT_ID", "42"),
            ("MAX_CONCURRENT_UPLOADS", "many"),
        ]));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup_without_variables_fails() {
        let result = SyncSettings::from_lookup(|_| None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let ozon = format!("{:?}", OzonCredentials::new("42", "super-secret-key"));
        assert!(ozon.contains("supe***"));
        assert!(!ozon.contains("super-secret-key"));

        let market = format!("{:?}", YandexCredentials::new("y0_AgAAAA-token"));
        assert!(!market.contains("y0_AgAAAA-token"));
    }
}
