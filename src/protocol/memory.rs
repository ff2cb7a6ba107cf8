// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process message bus.
//!
//! [`MemoryBus`] behaves like a broker with a single client: publishes are
//! delivered synchronously to every matching subscription, retained messages
//! are replayed to new subscribers, and everything the client published is
//! recorded for inspection.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use hitepro_lib::protocol::{MemoryBus, Transport};
//!
//! # async fn example() -> Result<(), hitepro_lib::error::ProtocolError> {
//! let bus = MemoryBus::new();
//!
//! // A device announces its retained state before anyone listens
//! bus.inject("/devices/hite-pro/controls/Relay-Kitchen_Main_1", "1", true);
//!
//! // The new subscriber receives the retained message immediately
//! bus.subscribe(
//!     "/devices/hite-pro/controls/#",
//!     Arc::new(|topic: &str, payload: &str| println!("{topic} = {payload}")),
//! )
//! .await?;
//!
//! bus.publish("/devices/hite-pro/controls/Relay-Kitchen_Main_1/on", "0", true).await?;
//! assert_eq!(bus.published().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{MessageHandler, SubscriptionHandle, TopicRouter, Transport, topic_matches};
use crate::error::ProtocolError;

/// A message published through a [`MemoryBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Message payload.
    pub payload: String,
    /// Whether the message was retained.
    pub retain: bool,
}

/// In-process [`Transport`].
///
/// Cloning is cheap; all clones share the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<MemoryBusInner>,
}

#[derive(Default)]
struct MemoryBusInner {
    router: TopicRouter,
    retained: RwLock<BTreeMap<String, String>>,
    published: Mutex<Vec<PublishedMessage>>,
    offline: AtomicBool,
}

impl MemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a message as if another client had published it.
    ///
    /// Injected messages are not recorded in [`published`](Self::published).
    /// Returns the number of subscriptions that received the message.
    pub fn inject(&self, topic: &str, payload: &str, retain: bool) -> usize {
        if retain {
            self.retain(topic, payload);
        }
        self.inner.router.route(topic, payload)
    }

    /// Returns every message published through the transport, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published.lock().clone()
    }

    /// Returns the messages published to `topic`, oldest first.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.inner
            .published
            .lock()
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Forgets the recorded publishes.
    pub fn clear_published(&self) {
        self.inner.published.lock().clear();
    }

    /// Returns the retained payload for `topic`, if any.
    #[must_use]
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.inner.retained.read().get(topic).cloned()
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.router.len()
    }

    /// Simulates losing or regaining the connection.
    ///
    /// While offline, subscribe and publish fail with
    /// [`ProtocolError::ConnectionFailed`].
    pub fn set_connected(&self, connected: bool) {
        self.inner.offline.store(!connected, Ordering::Release);
    }

    /// Returns whether the bus accepts requests.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.inner.offline.load(Ordering::Acquire)
    }

    fn ensure_connected(&self) -> Result<(), ProtocolError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ProtocolError::ConnectionFailed(
                "memory bus is offline".to_string(),
            ))
        }
    }

    /// Stores or clears a retained message. An empty payload clears it.
    fn retain(&self, topic: &str, payload: &str) {
        let mut retained = self.inner.retained.write();
        if payload.is_empty() {
            retained.remove(topic);
        } else {
            retained.insert(topic.to_string(), payload.to_string());
        }
    }
}

impl Transport for MemoryBus {
    async fn subscribe(
        &self,
        filter: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionHandle, ProtocolError> {
        self.ensure_connected()?;

        let handle = self.inner.router.register(filter, Arc::clone(&handler));

        let replay: Vec<(String, String)> = self
            .inner
            .retained
            .read()
            .iter()
            .filter(|(topic, _)| topic_matches(filter, topic))
            .map(|(topic, payload)| (topic.clone(), payload.clone()))
            .collect();

        for (topic, payload) in &replay {
            handler(topic, payload);
        }

        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProtocolError> {
        self.inner
            .router
            .unregister(handle)
            .map(|_| ())
            .ok_or(ProtocolError::NotSubscribed(handle.value()))
    }

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), ProtocolError> {
        self.ensure_connected()?;

        self.inner.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        if retain {
            self.retain(topic, payload);
        }
        self.inner.router.route(topic, payload);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("subscriptions", &self.subscription_count())
            .field("retained", &self.inner.retained.read().len())
            .field("connected", &self.is_connected())
            .finish()
    }
}
