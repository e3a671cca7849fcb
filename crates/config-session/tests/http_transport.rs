//! HTTP device transport against a mock device bridge.

use config_session::{DeliveryError, DeviceTransport, HttpDeviceTransport};
use serde_json::json;
use settings_cache::SettingsSnapshot;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> SettingsSnapshot {
    [
        ("backgroundColor".to_string(), json!(16711680)),
        ("secondsHandEnabled".to_string(), json!(true)),
    ]
    .into_iter()
    .collect()
}

fn transport(server: &MockServer, timeout: Duration) -> HttpDeviceTransport {
    let endpoint = Url::parse(&format!("{}/settings", server.uri())).unwrap();
    HttpDeviceTransport::new(endpoint, timeout).unwrap()
}

#[tokio::test]
async fn test_push_posts_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settings"))
        .and(body_json(json!({"backgroundColor": 16711680, "secondsHandEnabled": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server, Duration::from_secs(5))
        .push(settings())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejection_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("watch not connected"))
        .expect(1)
        .mount(&server)
        .await;

    let result = transport(&server, Duration::from_secs(5)).push(settings()).await;

    match result {
        Err(DeliveryError::Rejected(reason)) => {
            assert!(reason.contains("503"));
            assert!(reason.contains("watch not connected"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_device_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = transport(&server, Duration::from_millis(200)).push(settings()).await;

    assert!(matches!(result, Err(DeliveryError::Http(_))));
}
