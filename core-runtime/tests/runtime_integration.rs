//! Integration tests for settings loading and run event delivery

use bridge_traits::time::LogLevel;
use core_runtime::config::{SyncSettings, DEFAULT_FEED_URL};
use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream, SyncEvent};
use core_runtime::logging::{LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_settings_from_environment_style_lookup() {
    let settings = SyncSettings::from_lookup(|key| match key {
        "SELLER_TOKEN" => Some("seller-token".to_string()),
        "CLIENT_ID" => Some("987".to_string()),
        "MARKET_TOKEN" => Some("   ".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(settings.campaigns.len(), 1);
    assert_eq!(settings.campaigns[0].campaign_id, "987");
    assert!(settings.yandex_market.is_none());
    assert_eq!(settings.feed_url, DEFAULT_FEED_URL);
}

#[test]
fn test_config_errors_are_descriptive() {
    let err = SyncSettings::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("SELLER_TOKEN"));
}

#[test]
fn test_logging_config_is_debug_safe() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);

    let rendered = format!("{:?}", config);
    assert!(rendered.contains("Compact"));
    assert!(rendered.contains("has_logger_sink: false"));
}

#[tokio::test]
async fn test_failed_batches_can_be_watched_separately() {
    let bus = EventBus::default();
    let mut warnings = EventStream::new(bus.subscribe())
        .filter(|event| event.severity() >= EventSeverity::Warning);

    for (index, succeeded) in [(0, true), (1, false), (2, true)] {
        bus.emit(CoreEvent::Sync(SyncEvent::BatchDispatched {
            run_id: "run-7".to_string(),
            kind: "price".to_string(),
            index,
            size: 500,
            succeeded,
            rejected: 0,
            error: (!succeeded).then(|| "Request timed out".to_string()),
        }))
        .unwrap();
    }

    match warnings.recv().await.unwrap() {
        CoreEvent::Sync(SyncEvent::BatchDispatched { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(warnings.try_recv().is_none());
}
