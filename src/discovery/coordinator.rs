// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery coordinator.
//!
//! Ties classification, device resolution, entity construction and host
//! registration together, and owns everything discovery creates.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::{IntegrationConfig, PLATFORMS};
use crate::entity::{EntityPlatform, EntityRuntime, build_for};
use crate::error::{Error, Result};
use crate::event::{DiscoveryEvent, EventBus};
use crate::protocol::{MessageHandler, SubscriptionHandle, Transport};
use crate::registry::{DeviceDirectory, DeviceRegistry};
use crate::types::EntityKind;

use super::{classify, resolve};

/// Lifecycle of a [`DiscoveryCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Created, not yet subscribed.
    Idle,
    /// Subscribed to the discovery topic.
    Subscribed,
    /// Stopped; all subscriptions released.
    Unsubscribed,
}

#[derive(Debug)]
struct Lifecycle {
    state: CoordinatorState,
    /// Bumped by every `start` and `stop`, so a `start` can tell whether it
    /// was overtaken while subscribing.
    generation: u64,
    subscription: Option<SubscriptionHandle>,
    worker: Option<JoinHandle<()>>,
}

/// Discovers controls on the bus and turns them into entities.
///
/// The coordinator subscribes to the configured discovery topic. Every
/// inbound topic is classified; matches resolve their device in the
/// [`DeviceDirectory`], become an [`EntityRuntime`] and are handed to the
/// [`EntityPlatform`] registered for their kind. Rediscovering a known
/// entity is a no-op.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hitepro_lib::config::IntegrationConfig;
/// use hitepro_lib::discovery::DiscoveryCoordinator;
/// use hitepro_lib::entity::{EntityPlatform, EntityRuntime};
/// use hitepro_lib::protocol::MemoryBus;
/// use hitepro_lib::types::EntityKind;
///
/// struct Switches;
///
/// impl EntityPlatform<MemoryBus> for Switches {
///     fn register(&self, entity: Arc<EntityRuntime<MemoryBus>>) {
///         println!("new switch {}", entity.unique_id());
///     }
/// }
///
/// # async fn example() -> hitepro_lib::Result<()> {
/// let bus = Arc::new(MemoryBus::new());
/// let coordinator = Arc::new(
///     DiscoveryCoordinator::new(bus.clone(), IntegrationConfig::default())
///         .with_platform(EntityKind::Switch, Arc::new(Switches)),
/// );
///
/// coordinator.start().await?;
///
/// let entity = coordinator
///     .handle_discovery("/devices/hite-pro/controls/Relay-Kitchen_Main_1")
///     .await?
///     .expect("switch discovered");
/// assert_eq!(entity.unique_id(), "Relay-Kitchen_Main_Relay-Kitchen_Main_1");
///
/// coordinator.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryCoordinator<T> {
    transport: Arc<T>,
    config: IntegrationConfig,
    directory: DeviceDirectory,
    platforms: HashMap<EntityKind, Arc<dyn EntityPlatform<T>>>,
    entities: RwLock<HashMap<String, Arc<EntityRuntime<T>>>>,
    /// Serializes the discovery pipeline against itself and against `stop`.
    pipeline: tokio::sync::Mutex<()>,
    events: EventBus,
    lifecycle: Mutex<Lifecycle>,
}

impl<T: Transport> DiscoveryCoordinator<T> {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(transport: Arc<T>, config: IntegrationConfig) -> Self {
        Self {
            transport,
            config,
            directory: DeviceDirectory::new(),
            platforms: HashMap::new(),
            entities: RwLock::new(HashMap::new()),
            pipeline: tokio::sync::Mutex::new(()),
            events: EventBus::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: CoordinatorState::Idle,
                generation: 0,
                subscription: None,
                worker: None,
            }),
        }
    }

    /// Records devices in the host's device registry.
    #[must_use]
    pub fn with_device_registry(mut self, registry: Arc<dyn DeviceRegistry>) -> Self {
        self.directory = DeviceDirectory::with_registry(registry);
        self
    }

    /// Sets the platform receiving entities of `kind`.
    ///
    /// Entities of kinds without a platform are not created.
    #[must_use]
    pub fn with_platform(mut self, kind: EntityKind, platform: Arc<dyn EntityPlatform<T>>) -> Self {
        self.platforms.insert(kind, platform);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribes to the discovery topic.
    ///
    /// Inbound topics are queued to a worker task that runs
    /// [`handle_discovery`](Self::handle_discovery) for each, in arrival
    /// order. Starting a running coordinator is a no-op.
    ///
    /// # Errors
    ///
    /// - a protocol error if the subscription fails; the coordinator then
    ///   stays in its previous state
    /// - [`Error::NotRunning`] if [`stop`](Self::stop) ran while subscribing;
    ///   the subscription is released again
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let (previous, generation) = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == CoordinatorState::Subscribed {
                return Ok(());
            }
            lifecycle.generation += 1;
            let previous = std::mem::replace(&mut lifecycle.state, CoordinatorState::Subscribed);
            (previous, lifecycle.generation)
        };

        for kind in PLATFORMS
            .iter()
            .filter(|kind| !self.platforms.contains_key(*kind))
        {
            tracing::debug!(kind = %kind, "No platform registered, entities of this kind are dropped");
        }

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let worker = tokio::spawn(run_worker(Arc::downgrade(self), rx));

        let handler: MessageHandler = Arc::new(move |topic: &str, _payload: &str| {
            // The worker is gone once the coordinator stopped
            let _ = tx.send(topic.to_string());
        });

        let filter = self.config.mqtt_topic();
        match self.transport.subscribe(filter, handler).await {
            Ok(handle) => {
                let stale = {
                    let mut lifecycle = self.lifecycle.lock();
                    if lifecycle.generation == generation {
                        lifecycle.subscription = Some(handle);
                        lifecycle.worker = Some(worker);
                        None
                    } else {
                        Some(worker)
                    }
                };
                if let Some(worker) = stale {
                    worker.abort();
                    if let Err(e) = self.transport.unsubscribe(handle).await {
                        tracing::warn!(error = %e, "Failed to unsubscribe discovery topic");
                    }
                    tracing::debug!(filter = %filter, "Discovery stopped while subscribing");
                    return Err(Error::NotRunning);
                }
                tracing::info!(filter = %filter, "Discovery started");
                Ok(())
            }
            Err(e) => {
                worker.abort();
                let mut lifecycle = self.lifecycle.lock();
                if lifecycle.generation == generation {
                    lifecycle.state = previous;
                }
                Err(e.into())
            }
        }
    }

    /// Unsubscribes the discovery topic and tears down every entity.
    ///
    /// Waits for an in-flight discovery message to finish first. Stopping a
    /// coordinator that is not running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the discovery topic cannot be
    /// unsubscribed. Entities are torn down regardless; failures to
    /// unsubscribe their state topics are logged.
    pub async fn stop(&self) -> Result<()> {
        let (subscription, worker) = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != CoordinatorState::Subscribed {
                return Ok(());
            }
            lifecycle.state = CoordinatorState::Unsubscribed;
            lifecycle.generation += 1;
            (lifecycle.subscription.take(), lifecycle.worker.take())
        };

        let _pipeline = self.pipeline.lock().await;
        if let Some(worker) = worker {
            worker.abort();
        }

        let mut result = Ok(());
        if let Some(handle) = subscription
            && let Err(e) = self.transport.unsubscribe(handle).await
        {
            tracing::warn!(error = %e, "Failed to unsubscribe discovery topic");
            result = Err(e.into());
        }

        let entities: Vec<_> = self.entities.write().drain().map(|(_, e)| e).collect();
        for entity in entities {
            self.teardown(&entity).await;
        }

        tracing::info!(filter = %self.config.mqtt_topic(), "Discovery stopped");
        result
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Runs one discovery message through the pipeline.
    ///
    /// Returns `Ok(None)` for topics outside the control naming convention
    /// and for kinds without a platform, and the existing entity when the
    /// control is already known.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRunning`] unless the coordinator is started
    /// - [`Error::Discovery`] for malformed control names
    /// - a protocol error if the state topic cannot be subscribed
    pub async fn handle_discovery(&self, topic: &str) -> Result<Option<Arc<EntityRuntime<T>>>> {
        let Some(control) = classify(topic) else {
            tracing::trace!(topic = %topic, "Ignoring unclassified topic");
            return Ok(None);
        };
        tracing::debug!(
            topic = %topic,
            kind = %control.kind,
            control = %control.control_name,
            "Processing discovery message"
        );

        let _pipeline = self.pipeline.lock().await;
        if !self.is_running() {
            return Err(Error::NotRunning);
        }

        let identity = match resolve(&control.control_name) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Dropping discovery message");
                self.events.publish(DiscoveryEvent::failed(topic, &e));
                return Err(e.into());
            }
        };

        let (device, created) = self.directory.get_or_create_identity(&identity);
        if created {
            self.events.publish(DiscoveryEvent::device_created(
                device.device_id(),
                device.handle(),
            ));
        }

        let descriptor = build_for(&control, device.device_id());
        if let Some(existing) = self.entity(descriptor.unique_id()) {
            tracing::trace!(unique_id = %existing.unique_id(), "Entity already known");
            return Ok(Some(existing));
        }

        let Some(platform) = self.platforms.get(&control.kind).cloned() else {
            tracing::debug!(
                kind = %control.kind,
                unique_id = %descriptor.unique_id(),
                "No platform for entity kind, dropping entity"
            );
            return Ok(None);
        };

        let entity = EntityRuntime::new(descriptor, device, Arc::clone(&self.transport));
        entity.attach().await?;

        self.entities
            .write()
            .insert(entity.unique_id().to_string(), Arc::clone(&entity));
        platform.register(Arc::clone(&entity));

        tracing::debug!(
            unique_id = %entity.unique_id(),
            kind = %entity.kind(),
            device = %entity.device().device_id(),
            "Registered entity"
        );
        self.events.publish(DiscoveryEvent::entity_added(
            entity.unique_id(),
            entity.kind(),
            entity.device().device_id(),
        ));

        Ok(Some(entity))
    }

    /// Tears down one entity and forgets it.
    ///
    /// Returns `false` if no entity has this id.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the state topic cannot be
    /// unsubscribed. The entity is removed regardless.
    pub async fn remove_entity(&self, unique_id: &str) -> Result<bool> {
        let Some(entity) = self.entities.write().remove(unique_id) else {
            return Ok(false);
        };

        let result = entity.remove().await;
        self.events.publish(DiscoveryEvent::entity_removed(unique_id));
        tracing::debug!(unique_id = %unique_id, "Removed entity");
        result.map(|()| true)
    }

    async fn teardown(&self, entity: &EntityRuntime<T>) {
        if let Err(e) = entity.remove().await {
            tracing::warn!(
                unique_id = %entity.unique_id(),
                error = %e,
                "Failed to unsubscribe entity state topic"
            );
        }
        self.events
            .publish(DiscoveryEvent::entity_removed(entity.unique_id()));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the entity with this unique id.
    #[must_use]
    pub fn entity(&self, unique_id: &str) -> Option<Arc<EntityRuntime<T>>> {
        self.entities.read().get(unique_id).cloned()
    }

    /// Returns all live entities.
    #[must_use]
    pub fn entities(&self) -> Vec<Arc<EntityRuntime<T>>> {
        self.entities.read().values().cloned().collect()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns the device directory.
    #[must_use]
    pub fn devices(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.lifecycle.lock().state
    }

    /// Returns `true` while subscribed to the discovery topic.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == CoordinatorState::Subscribed
    }

    /// Returns a receiver for discovery lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

/// Processes queued discovery topics until the coordinator goes away.
async fn run_worker<T: Transport>(
    coordinator: std::sync::Weak<DiscoveryCoordinator<T>>,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(topic) = rx.recv().await {
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        match coordinator.handle_discovery(&topic).await {
            Ok(_) | Err(Error::Discovery(_)) => {}
            Err(Error::NotRunning) => break,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Discovery message failed");
            }
        }
    }
}

impl<T> std::fmt::Debug for DiscoveryCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCoordinator")
            .field("config", &self.config)
            .field("state", &self.lifecycle.lock().state)
            .field("devices", &self.directory.len())
            .field("entities", &self.entities.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryBus;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl EntityPlatform<MemoryBus> for Collect {
        fn register(&self, entity: Arc<EntityRuntime<MemoryBus>>) {
            self.0.lock().push(entity.unique_id().to_string());
        }
    }

    fn coordinator(bus: &Arc<MemoryBus>) -> (Arc<DiscoveryCoordinator<MemoryBus>>, Arc<Collect>) {
        let platform = Arc::new(Collect::default());
        let mut coordinator = DiscoveryCoordinator::new(Arc::clone(bus), IntegrationConfig::default());
        for kind in EntityKind::ALL {
            coordinator = coordinator.with_platform(kind, platform.clone());
        }
        (Arc::new(coordinator), platform)
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);

        coordinator.start().await.unwrap();
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Subscribed);
        assert_eq!(bus.subscription_count(), 1);

        coordinator.stop().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Unsubscribed);
        assert_eq!(bus.subscription_count(), 0);
    }

    /// Bus whose subscribe waits until the test opens the gate.
    struct GatedBus {
        bus: MemoryBus,
        gate: tokio::sync::Semaphore,
    }

    impl Transport for GatedBus {
        async fn subscribe(
            &self,
            filter: &str,
            handler: MessageHandler,
        ) -> std::result::Result<SubscriptionHandle, crate::error::ProtocolError> {
            let _open = self.gate.acquire().await.map_err(|_| {
                crate::error::ProtocolError::ConnectionFailed("gate closed".to_string())
            })?;
            self.bus.subscribe(filter, handler).await
        }

        async fn unsubscribe(
            &self,
            handle: SubscriptionHandle,
        ) -> std::result::Result<(), crate::error::ProtocolError> {
            self.bus.unsubscribe(handle).await
        }

        async fn publish(
            &self,
            topic: &str,
            payload: &str,
            retain: bool,
        ) -> std::result::Result<(), crate::error::ProtocolError> {
            self.bus.publish(topic, payload, retain).await
        }
    }

    #[tokio::test]
    async fn stop_while_subscribing_releases_subscription() {
        let transport = Arc::new(GatedBus {
            bus: MemoryBus::new(),
            gate: tokio::sync::Semaphore::new(0),
        });
        let coordinator = Arc::new(DiscoveryCoordinator::new(
            Arc::clone(&transport),
            IntegrationConfig::default(),
        ));

        let starting = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.start().await })
        };
        while coordinator.state() != CoordinatorState::Subscribed {
            tokio::task::yield_now().await;
        }

        coordinator.stop().await.unwrap();
        transport.gate.add_permits(1);

        let result = starting.await.unwrap();
        assert!(matches!(result, Err(Error::NotRunning)));
        assert_eq!(coordinator.state(), CoordinatorState::Unsubscribed);
        assert_eq!(transport.bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);

        coordinator.start().await.unwrap();
        coordinator.stop().await.unwrap();
        coordinator.start().await.unwrap();

        assert!(coordinator.is_running());
        assert_eq!(bus.subscription_count(), 1);
        coordinator
            .handle_discovery("/devices/hite-pro/controls/Reload")
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn failed_start_keeps_previous_state() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);
        bus.set_connected(false);

        assert!(matches!(coordinator.start().await, Err(Error::Protocol(_))));
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn handle_discovery_requires_running() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);

        let err = coordinator
            .handle_discovery("/devices/hite-pro/controls/Reload")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotRunning));
    }

    #[tokio::test]
    async fn unclassified_topic_is_dropped() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, platform) = coordinator(&bus);
        coordinator.start().await.unwrap();

        let result = coordinator
            .handle_discovery("/devices/hite-pro/controls/Uptime")
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(platform.0.lock().is_empty());
        assert!(coordinator.devices().is_empty());
    }

    #[tokio::test]
    async fn duplicate_discovery_is_idempotent() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, platform) = coordinator(&bus);
        coordinator.start().await.unwrap();

        let topic = "/devices/hite-pro/controls/Relay-Kitchen_Main_1";
        let first = coordinator.handle_discovery(topic).await.unwrap().unwrap();
        let second = coordinator.handle_discovery(topic).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(coordinator.entity_count(), 1);
        assert_eq!(platform.0.lock().len(), 1);
        // Discovery filter plus one state topic
        assert_eq!(bus.subscription_count(), 2);
    }

    #[tokio::test]
    async fn kind_without_platform_is_not_created() {
        let bus = Arc::new(MemoryBus::new());
        let platform = Arc::new(Collect::default());
        let coordinator = Arc::new(
            DiscoveryCoordinator::new(Arc::clone(&bus), IntegrationConfig::default())
                .with_platform(EntityKind::Button, platform.clone()),
        );
        coordinator.start().await.unwrap();

        let result = coordinator
            .handle_discovery("/devices/hite-pro/controls/Relay-Kitchen_Main_1")
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(coordinator.entity_count(), 0);
        assert_eq!(bus.subscription_count(), 1);
    }

    #[tokio::test]
    async fn remove_entity_unsubscribes() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);
        coordinator.start().await.unwrap();
        let mut events = coordinator.subscribe();

        let entity = coordinator
            .handle_discovery("/devices/hite-pro/controls/Relay-Kitchen_Main_1")
            .await
            .unwrap()
            .unwrap();

        assert!(coordinator.remove_entity(entity.unique_id()).await.unwrap());
        assert!(!coordinator.remove_entity(entity.unique_id()).await.unwrap());
        assert!(entity.is_removed());
        assert_eq!(coordinator.entity_count(), 0);
        assert_eq!(bus.subscription_count(), 1);

        let mut saw_removed = false;
        while let Ok(event) = events.try_recv() {
            saw_removed |= matches!(event, DiscoveryEvent::EntityRemoved { .. });
        }
        assert!(saw_removed);
    }

    #[tokio::test]
    async fn stop_tears_down_entities() {
        let bus = Arc::new(MemoryBus::new());
        let (coordinator, _) = coordinator(&bus);
        coordinator.start().await.unwrap();

        let switch = coordinator
            .handle_discovery("/devices/hite-pro/controls/Relay-Kitchen_Main_1")
            .await
            .unwrap()
            .unwrap();
        coordinator
            .handle_discovery("/devices/hite-pro/controls/Temp-Hall_Main_1")
            .await
            .unwrap();

        coordinator.stop().await.unwrap();

        assert!(switch.is_removed());
        assert_eq!(coordinator.entity_count(), 0);
        assert_eq!(bus.subscription_count(), 0);
        assert!(matches!(switch.turn_on().await, Err(Error::EntityRemoved(_))));
        assert!(matches!(
            coordinator
                .handle_discovery("/devices/hite-pro/controls/Reload")
                .await,
            Err(Error::NotRunning)
        ));
    }
}
