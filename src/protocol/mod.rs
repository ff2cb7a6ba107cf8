// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transports.
//!
//! Discovery and entities only need three primitives from the message bus:
//! subscribe a topic filter with a handler, cancel such a subscription, and
//! publish a payload. The [`Transport`] trait captures exactly that.
//!
//! # Transports
//!
//! - [`MemoryBus`]: in-process bus with retained messages, for tests and
//!   embedders that already own an MQTT connection
//! - [`MqttBroker`]: a rumqttc connection to a real broker (feature `mqtt`)
//!
//! All publishes are at-most-once (QoS 0).

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_router;

pub use memory::{MemoryBus, PublishedMessage};
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use topic_router::{TopicRouter, topic_matches};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ProtocolError;

/// Handler invoked with `(topic, payload)` for each inbound message.
///
/// Handlers run on the transport's delivery context and must not block.
pub type MessageHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Identifies one subscription on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

/// A publish/subscribe message bus.
///
/// Filters follow MQTT topic matching (`+` for one level, `#` for the rest).
/// Implementations must be shareable across tasks.
pub trait Transport: Send + Sync + 'static {
    /// Subscribes `handler` to every message matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription cannot be established.
    fn subscribe(
        &self,
        filter: &str,
        handler: MessageHandler,
    ) -> impl Future<Output = Result<SubscriptionHandle, ProtocolError>> + Send;

    /// Cancels a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotSubscribed`] for unknown handles, or a
    /// transport error if the broker rejects the request.
    fn unsubscribe(
        &self,
        handle: SubscriptionHandle,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Publishes `payload` to `topic` at QoS 0.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport does not accept the message.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}
