// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection.
//!
//! [`MqttBroker`] maintains a persistent rumqttc connection, dispatches
//! inbound publishes through a [`TopicRouter`], and implements
//! [`Transport`] at QoS 0.
//!
//! # Examples
//!
//! ```no_run
//! use hitepro_lib::protocol::MqttBroker;
//!
//! # async fn example() -> Result<(), hitepro_lib::error::ProtocolError> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .build()
//!     .await?;
//!
//! // Clones share the same connection
//! let broker_clone = broker.clone();
//! assert!(broker_clone.is_connected());
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::oneshot;

use super::{MessageHandler, SubscriptionHandle, TopicRouter, Transport};
use crate::error::ProtocolError;

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl MqttBrokerConfig {
    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// An MQTT broker connection usable as a [`Transport`].
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    client: AsyncClient,
    router: TopicRouter,
    config: MqttBrokerConfig,
    connected: AtomicBool,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the connection configuration.
    #[must_use]
    pub fn config(&self) -> &MqttBrokerConfig {
        &self.inner.config
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.router.len()
    }

    /// Disconnects from the broker and drops every subscription.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.router.clear();
        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Transport for MqttBroker {
    async fn subscribe(
        &self,
        filter: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionHandle, ProtocolError> {
        let handle = self.inner.router.register(filter, handler);

        if let Err(e) = self
            .inner
            .client
            .subscribe(filter, QoS::AtMostOnce)
            .await
        {
            self.inner.router.unregister(handle);
            return Err(ProtocolError::Mqtt(e));
        }

        tracing::debug!(filter = %filter, %handle, "Subscribed to topic filter");
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProtocolError> {
        let filter = self
            .inner
            .router
            .unregister(handle)
            .ok_or(ProtocolError::NotSubscribed(handle.value()))?;

        // Other handlers may still share the broker-side subscription
        if self.inner.router.has_filter(&filter) {
            return Ok(());
        }

        self.inner
            .client
            .unsubscribe(&filter)
            .await
            .map_err(ProtocolError::Mqtt)?;

        tracing::debug!(filter = %filter, %handle, "Unsubscribed from topic filter");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), ProtocolError> {
        self.inner
            .client
            .publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())
            .await
            .map_err(ProtocolError::Mqtt)?;

        tracing::debug!(topic = %topic, payload = %payload, retain, "Published message");
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use hitepro_lib::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), hitepro_lib::error::ProtocolError> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("hitepro_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                router: TopicRouter::new(),
                config: self.config.clone(),
                connected: AtomicBool::new(false),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();

        let broker_clone = broker.clone();
        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(broker)
    }
}

/// Handles MQTT events for the broker connection.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    mut connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match std::str::from_utf8(&publish.payload) {
                    Ok(payload) => {
                        tracing::trace!(
                            topic = %publish.topic,
                            payload = %payload,
                            "MQTT message received"
                        );
                        broker.inner.router.route(&publish.topic, payload);
                    }
                    Err(_) => {
                        tracing::debug!(topic = %publish.topic, "Ignoring non-UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if broker.is_connected() {
                    tracing::error!(error = %e, "MQTT broker event loop error");
                }
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
        }
    }
}
