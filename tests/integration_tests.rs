mod common;

use common::{fast_settings, CountingOpener, FakeXbee};
use std::time::Duration;
use tokio::time::timeout;
use toml;
use xbee_cli::core::transport::ExchangeState;
use xbee_cli::domain::config::SerialSettings;
use xbee_cli::{resolve, DefaultField, Location, Pipeline, XbeeConfig, XbeeError};

/// Integration tests for the xbee library
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_config_serialization() {
        let config = XbeeConfig::default();
        let toml_str = toml::to_string(&config).expect("Failed to serialize config");
        let deserialized: XbeeConfig = toml::from_str(&toml_str)
            .expect("Failed to deserialize config");

        assert_eq!(config, deserialized);
        assert_eq!(deserialized.serial.baud_rate, 9600);
    }

    #[test]
    fn test_resolve_examples() {
        assert_eq!(
            resolve("a:b", DefaultField::Path),
            Location::on_device("a", "b")
        );
        assert_eq!(resolve("a", DefaultField::Path), Location::local("a"));
        assert_eq!(resolve("a", DefaultField::Device), Location::device("a"));

        let structured = Location::on_device("/dev/ttyX", "/flash");
        assert_eq!(resolve(structured.clone(), DefaultField::Path), structured);
    }

    #[tokio::test]
    async fn test_pipeline_runs_exchanges_in_turn() {
        let opener = CountingOpener::new();
        opener.attach(
            "/dev/ttyX",
            FakeXbee::new().with_register("SH", "13A200").with_register("SL", "41B7A1C2"),
        );

        let pipeline = Pipeline::open(&opener, "/dev/ttyX", &SerialSettings::default(), &fast_settings())
            .await
            .unwrap();
        assert_eq!(pipeline.state(), ExchangeState::Idle);

        let sh = pipeline.command("SH", None).await.unwrap();
        let sl = pipeline.command("SL", None).await.unwrap();
        assert_eq!(sh, vec!["13A200"]);
        assert_eq!(sl, vec!["41B7A1C2"]);

        pipeline.close().await;
        assert_eq!(opener.destroyed(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_exchange_is_rejected() {
        let opener = CountingOpener::new();
        opener.attach("/dev/ttyX", FakeXbee::new().with_register("SH", "13A200"));

        let pipeline = Pipeline::open(&opener, "/dev/ttyX", &SerialSettings::default(), &fast_settings())
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            pipeline.command("SH", None),
            pipeline.command("SH", None)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(XbeeError::Busy { .. })));
        assert_eq!(pipeline.state(), ExchangeState::Idle);

        pipeline.close().await;
    }

    #[tokio::test]
    async fn test_close_with_silent_device_finishes() {
        let opener = CountingOpener::new();
        opener.attach("/dev/ttyX", FakeXbee::new());

        let pipeline = Pipeline::open(&opener, "/dev/ttyX", &SerialSettings::default(), &fast_settings())
            .await
            .unwrap();

        let result = timeout(Duration::from_secs(1), pipeline.close()).await;
        assert!(result.is_ok(), "Closing should not wait for the device");
        assert_eq!(opener.destroyed(), 1);
    }

    #[tokio::test]
    async fn test_dropped_pipeline_releases_handle() {
        let opener = CountingOpener::new();
        opener.attach("/dev/ttyX", FakeXbee::new());

        let pipeline = Pipeline::open(&opener, "/dev/ttyX", &SerialSettings::default(), &fast_settings())
            .await
            .unwrap();
        drop(pipeline);

        opener.settled().await;
        assert_eq!(opener.destroyed(), 1);
    }
}
