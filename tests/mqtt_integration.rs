// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use hitepro_lib::config::IntegrationConfig;
use hitepro_lib::discovery::{CoordinatorState, DiscoveryCoordinator};
use hitepro_lib::error::ProtocolError;
use hitepro_lib::protocol::{MessageHandler, MqttBroker, Transport};
use mockforge_mqtt::broker::MqttConfig;
use parking_lot::Mutex;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind
    sleep(Duration::from_millis(500)).await;
}

async fn connect(port: u16) -> MqttBroker {
    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .await
        .expect("connect to mock broker")
}

fn noop_handler() -> MessageHandler {
    Arc::new(|_topic: &str, _payload: &str| {})
}

// ============================================================================
// Connection
// ============================================================================

mod connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;
        assert!(broker.is_connected());
        assert_eq!(broker.config().host(), "127.0.0.1");
        assert_eq!(broker.config().port(), port);
    }

    #[tokio::test]
    async fn disconnect_marks_broker_offline() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;
        broker.disconnect().await.unwrap();
        assert!(!broker.is_connected());
    }

    #[tokio::test]
    async fn missing_broker_times_out() {
        let port = get_test_port();

        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_millis(300))
            .build()
            .await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }
}

// ============================================================================
// Transport
// ============================================================================

mod transport {
    use super::*;

    #[tokio::test]
    async fn subscribe_and_unsubscribe() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let first = broker
            .subscribe("/devices/hite-pro/controls/#", noop_handler())
            .await
            .unwrap();
        let second = broker
            .subscribe("/devices/hite-pro/controls/#", noop_handler())
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(broker.subscription_count(), 2);

        broker.unsubscribe(first).await.unwrap();
        assert_eq!(broker.subscription_count(), 1);
        broker.unsubscribe(second).await.unwrap();
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_handle_fails() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let handle = broker.subscribe("a/#", noop_handler()).await.unwrap();
        broker.unsubscribe(handle).await.unwrap();

        assert!(matches!(
            broker.unsubscribe(handle).await,
            Err(ProtocolError::NotSubscribed(_))
        ));
    }

    #[tokio::test]
    async fn publish_reaches_subscriber_on_another_client() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let listener = connect(port).await;
        let sender = connect(port).await;

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let handler: MessageHandler = Arc::new(move |topic: &str, payload: &str| {
            sink.lock().push((topic.to_string(), payload.to_string()));
        });
        listener
            .subscribe("/devices/hite-pro/controls/Relay-Kitchen_Main_1/on", handler)
            .await
            .unwrap();
        // Let the broker register the subscription
        sleep(Duration::from_millis(200)).await;

        sender
            .publish("/devices/hite-pro/controls/Relay-Kitchen_Main_1/on", "1", false)
            .await
            .unwrap();
        sender
            .publish("/devices/hite-pro/controls/Relay-Kitchen_Main_1", "1", false)
            .await
            .unwrap();

        for _ in 0..60 {
            if !received.lock().is_empty() {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
        // Give a stray non-matching message time to arrive
        sleep(Duration::from_millis(100)).await;

        assert_eq!(
            *received.lock(),
            vec![(
                "/devices/hite-pro/controls/Relay-Kitchen_Main_1/on".to_string(),
                "1".to_string()
            )]
        );
    }
}

// ============================================================================
// Discovery over a broker
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn coordinator_subscribes_and_releases_discovery_topic() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = Arc::new(connect(port).await);

        let coordinator = Arc::new(DiscoveryCoordinator::new(
            Arc::clone(&broker),
            IntegrationConfig::default(),
        ));

        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Subscribed);
        assert_eq!(broker.subscription_count(), 1);

        coordinator.stop().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Unsubscribed);
        assert_eq!(broker.subscription_count(), 0);
    }
}
