// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live entity instances.
//!
//! An [`EntityRuntime`] wraps a descriptor with mutable state. It follows
//! its state topic, translates inbound payloads into [`StateChange`]s, and
//! turns commands into publishes.
//!
//! # Inbound payloads
//!
//! - Switch, binary sensor: the `on` payload turns the entity on, the `off`
//!   payload turns it off, anything else is ignored.
//! - Light: as above; a dimmable light additionally treats a decimal integer
//!   payload as device brightness (0..=100), scaled to 0..=255.
//! - Sensor: every payload is stored verbatim.
//!
//! # Commands
//!
//! Commands publish first and update local state only once the transport
//! accepted the message. There is no confirmation from the device; its
//! next state publication wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::protocol::{MessageHandler, SubscriptionHandle, Transport};
use crate::registry::DeviceRecord;
use crate::state::{EntityState, StateChange};
use crate::subscription::{CallbackRegistry, SubscriptionId};
use crate::types::{Brightness, EntityKind, PowerState};

use super::EntityDescriptor;

/// A live entity bound to a transport.
///
/// # Examples
///
/// ```
/// use hitepro_lib::entity::{EntityRuntime, build};
/// use hitepro_lib::protocol::MemoryBus;
/// use hitepro_lib::registry::DeviceDirectory;
/// use hitepro_lib::types::{EntityKind, PowerState};
/// use std::sync::Arc;
///
/// # async fn example() -> hitepro_lib::Result<()> {
/// let bus = Arc::new(MemoryBus::new());
/// let topic = "/devices/hite-pro/controls/Relay-Kitchen_Main_1";
/// let device = DeviceDirectory::new().get_or_create("Relay-Kitchen_Main", "Relay-Kitchen");
/// let descriptor = build(EntityKind::Switch, "Relay-Kitchen_Main_1", topic, device.device_id());
///
/// let entity = EntityRuntime::new(descriptor, device, bus.clone());
/// entity.attach().await?;
///
/// bus.inject(topic, "1", true);
/// assert_eq!(entity.state().power(), Some(PowerState::On));
///
/// entity.turn_off().await?;
/// assert!(!entity.is_on());
/// # Ok(())
/// # }
/// ```
pub struct EntityRuntime<T> {
    descriptor: EntityDescriptor,
    device: Arc<DeviceRecord>,
    transport: Arc<T>,
    state: RwLock<EntityState>,
    callbacks: CallbackRegistry,
    subscription: Mutex<Option<SubscriptionHandle>>,
    removed: AtomicBool,
}

impl<T: Transport> EntityRuntime<T> {
    /// Creates an entity in its initial state. Call [`attach`](Self::attach)
    /// to start following the state topic.
    #[must_use]
    pub fn new(descriptor: EntityDescriptor, device: Arc<DeviceRecord>, transport: Arc<T>) -> Arc<Self> {
        let state = EntityState::for_kind(descriptor.kind());
        Arc::new(Self {
            descriptor,
            device,
            transport,
            state: RwLock::new(state),
            callbacks: CallbackRegistry::new(),
            subscription: Mutex::new(None),
            removed: AtomicBool::new(false),
        })
    }

    /// Subscribes to the state topic.
    ///
    /// Does nothing for entities without a state topic or when already
    /// subscribed. The handler holds a weak reference, so a dropped entity
    /// simply stops reacting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityRemoved`] after [`remove`](Self::remove), or a
    /// protocol error if the subscription fails.
    pub async fn attach(self: &Arc<Self>) -> Result<()> {
        self.ensure_live()?;
        let Some(topic) = self.descriptor.state_topic() else {
            return Ok(());
        };
        if self.subscription.lock().is_some() {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let handler: MessageHandler = Arc::new(move |_topic: &str, payload: &str| {
            if let Some(entity) = weak.upgrade() {
                entity.handle_message(payload);
            }
        });

        let handle = self.transport.subscribe(topic, handler).await?;
        *self.subscription.lock() = Some(handle);

        tracing::debug!(
            unique_id = %self.descriptor.unique_id(),
            topic = %topic,
            "Subscribed to state topic"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.descriptor.kind()
    }

    /// Returns the unique id.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        self.descriptor.unique_id()
    }

    /// Returns the device the entity belongs to.
    #[must_use]
    pub fn device(&self) -> &Arc<DeviceRecord> {
        &self.device
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state.read().clone()
    }

    /// Returns `true` if the entity is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.read().is_on()
    }

    /// Returns the brightness of a light, if known.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.state.read().brightness()
    }

    /// Returns the last sensor value, if any.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        self.state.read().value().map(str::to_string)
    }

    /// Returns `true` once the entity has been removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Returns `true` while the state topic is subscribed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Returns the entity's callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Registers a callback receiving every state change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.callbacks.on_state_changed(callback)
    }

    /// Registers a callback for on/off changes.
    pub fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        self.callbacks.on_power_changed(callback)
    }

    /// Unregisters a callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Handles a payload received on the state topic.
    ///
    /// Returns `true` if the state changed. Unrecognised payloads and
    /// messages arriving after removal are ignored.
    pub fn handle_message(&self, payload: &str) -> bool {
        if self.is_removed() {
            return false;
        }
        match self.decode(payload) {
            Some(change) => self.apply(change),
            None => {
                tracing::trace!(
                    unique_id = %self.descriptor.unique_id(),
                    payload = %payload,
                    "Ignoring unrecognised payload"
                );
                false
            }
        }
    }

    fn decode(&self, payload: &str) -> Option<StateChange> {
        let payloads = self.descriptor.payloads();
        match self.kind() {
            EntityKind::Button => None,
            EntityKind::Sensor => Some(StateChange::Value(payload.to_string())),
            EntityKind::Switch | EntityKind::BinarySensor | EntityKind::Light => {
                if payloads.on.as_deref() == Some(payload) {
                    Some(StateChange::Power(PowerState::On))
                } else if payloads.off.as_deref() == Some(payload) {
                    Some(StateChange::Power(PowerState::Off))
                } else {
                    let control = self.descriptor.brightness()?;
                    let raw = parse_device_level(payload)?;
                    Some(StateChange::Brightness(Brightness::from_device(
                        raw,
                        control.scale,
                    )))
                }
            }
        }
    }

    /// Applies a change and notifies callbacks if the state changed.
    fn apply(&self, change: StateChange) -> bool {
        let changed = self.state.write().apply(&change);
        if changed {
            tracing::debug!(
                unique_id = %self.descriptor.unique_id(),
                change = ?change,
                "Entity state changed"
            );
            self.callbacks.dispatch(&change);
        }
        changed
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Presses a button.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityNotSupported`] for other kinds,
    /// [`Error::EntityRemoved`] after removal, or the transport error.
    pub async fn press(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.descriptor.capabilities().press {
            return Err(Error::CapabilityNotSupported);
        }
        let topic = self
            .descriptor
            .command_topic()
            .ok_or(Error::CapabilityNotSupported)?;
        let payload = self
            .descriptor
            .payloads()
            .press
            .as_deref()
            .ok_or(Error::CapabilityNotSupported)?;

        self.transport.publish(topic, payload, false).await?;
        tracing::debug!(unique_id = %self.descriptor.unique_id(), "Button pressed");
        Ok(())
    }

    /// Turns a switch or light on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityNotSupported`] for read-only kinds,
    /// [`Error::EntityRemoved`] after removal, or the transport error.
    pub async fn turn_on(&self) -> Result<()> {
        self.set_power(PowerState::On).await
    }

    /// Turns a switch or light off.
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<()> {
        self.set_power(PowerState::Off).await
    }

    /// Sends a brightness level to a light.
    ///
    /// This usually turns the light on, but a brightness that rounds to
    /// device level 0 (display brightness 0 or 1 at a device scale of 100)
    /// turns it **off**. The device treats level 0 as off, and local power
    /// state follows.
    ///
    /// On a light without brightness control this is a plain
    /// [`turn_on`](Self::turn_on).
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on).
    pub async fn turn_on_with_brightness(&self, brightness: Brightness) -> Result<()> {
        self.ensure_live()?;
        let Some(control) = self.descriptor.brightness() else {
            return self.turn_on().await;
        };

        let level = brightness.to_device(control.scale);
        self.transport
            .publish(&control.topic, &level.to_string(), true)
            .await?;

        let power = if level == 0 { PowerState::Off } else { PowerState::On };
        self.apply(StateChange::Power(power));
        self.apply(StateChange::Brightness(brightness));
        Ok(())
    }

    /// Sets the brightness of a dimmable light.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityNotSupported`] if the entity has no
    /// brightness control; otherwise as
    /// [`turn_on_with_brightness`](Self::turn_on_with_brightness).
    pub async fn set_brightness(&self, brightness: Brightness) -> Result<()> {
        if !self.descriptor.capabilities().brightness {
            return Err(Error::CapabilityNotSupported);
        }
        self.turn_on_with_brightness(brightness).await
    }

    async fn set_power(&self, state: PowerState) -> Result<()> {
        self.ensure_live()?;
        if !self.descriptor.capabilities().power_control {
            return Err(Error::CapabilityNotSupported);
        }
        let topic = self
            .descriptor
            .command_topic()
            .ok_or(Error::CapabilityNotSupported)?;
        let payloads = self.descriptor.payloads();
        let payload = match state {
            PowerState::On => payloads.on.as_deref(),
            PowerState::Off => payloads.off.as_deref(),
        }
        .ok_or(Error::CapabilityNotSupported)?;

        self.transport.publish(topic, payload, true).await?;
        self.apply(StateChange::Power(state));
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Removes the entity: cancels the state subscription and rejects any
    /// further command. Removing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the transport error if unsubscribing fails. The entity is
    /// removed regardless.
    pub async fn remove(&self) -> Result<()> {
        if self.removed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let handle = self.subscription.lock().take();
        self.callbacks.dispatch_removed();
        self.callbacks.clear();

        if let Some(handle) = handle {
            self.transport.unsubscribe(handle).await?;
            tracing::debug!(unique_id = %self.descriptor.unique_id(), "Unsubscribed from state topic");
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_removed() {
            Err(Error::EntityRemoved(self.descriptor.unique_id().to_string()))
        } else {
            Ok(())
        }
    }
}

/// Parses a device level: a non-empty run of ASCII digits.
fn parse_device_level(payload: &str) -> Option<u32> {
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    payload.parse().ok()
}

impl<T> std::fmt::Debug for EntityRuntime<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRuntime")
            .field("unique_id", &self.descriptor.unique_id())
            .field("kind", &self.descriptor.kind())
            .field("state", &*self.state.read())
            .field("removed", &self.removed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::build;
    use crate::protocol::MemoryBus;
    use crate::registry::DeviceDirectory;
    use std::sync::atomic::AtomicU32;

    const PREFIX: &str = "/devices/hite-pro/controls";

    fn entity(
        bus: &Arc<MemoryBus>,
        kind: EntityKind,
        control_name: &str,
    ) -> (Arc<EntityRuntime<MemoryBus>>, String) {
        let topic = format!("{PREFIX}/{control_name}");
        let identity = crate::discovery::resolve(control_name).unwrap();
        let device = DeviceDirectory::new().get_or_create(&identity.device_id, &identity.model);
        let descriptor = build(kind, control_name, &topic, device.device_id());
        (EntityRuntime::new(descriptor, device, Arc::clone(bus)), topic)
    }

    #[tokio::test]
    async fn switch_follows_state_topic() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, topic) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        switch.attach().await.unwrap();
        assert!(switch.is_subscribed());

        bus.inject(&topic, "1", false);
        assert_eq!(switch.state().power(), Some(PowerState::On));

        bus.inject(&topic, "0", false);
        assert_eq!(switch.state().power(), Some(PowerState::Off));

        bus.inject(&topic, "garbage", false);
        assert_eq!(switch.state().power(), Some(PowerState::Off));
    }

    #[tokio::test]
    async fn garbage_keeps_previous_on_state() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, _) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");

        assert!(switch.handle_message("1"));
        assert!(!switch.handle_message("garbage"));
        assert!(switch.is_on());
    }

    #[tokio::test]
    async fn retained_state_applies_on_attach() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, topic) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        bus.inject(&topic, "1", true);

        switch.attach().await.unwrap();
        assert!(switch.is_on());
    }

    #[tokio::test]
    async fn turn_on_publishes_retained_and_sets_state() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, topic) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");

        switch.turn_on().await.unwrap();
        assert!(switch.is_on());

        let published = bus.published_to(&format!("{topic}/on"));
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].payload, "1");
        assert!(published[0].retain);

        switch.turn_off().await.unwrap();
        assert!(!switch.is_on());
        assert_eq!(bus.published().last().unwrap().payload, "0");
    }

    #[tokio::test]
    async fn failed_publish_leaves_state_unchanged() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, _) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        bus.set_connected(false);

        let err = switch.turn_on().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(!switch.is_on());
    }

    #[tokio::test]
    async fn button_press_is_not_retained() {
        let bus = Arc::new(MemoryBus::new());
        let (button, topic) = entity(&bus, EntityKind::Button, "Reload");
        button.attach().await.unwrap();
        assert!(!button.is_subscribed());

        button.press().await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, format!("{topic}/on"));
        assert_eq!(published[0].payload, "1");
        assert!(!published[0].retain);
        assert!(bus.retained(&format!("{topic}/on")).is_none());
    }

    #[tokio::test]
    async fn capability_mismatch_is_rejected() {
        let bus = Arc::new(MemoryBus::new());
        let (button, _) = entity(&bus, EntityKind::Button, "Reload");
        let (sensor, _) = entity(&bus, EntityKind::Sensor, "Temp-Hall_Main_1");
        let (switch, _) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");

        assert!(matches!(button.turn_on().await, Err(Error::CapabilityNotSupported)));
        assert!(matches!(sensor.press().await, Err(Error::CapabilityNotSupported)));
        assert!(matches!(
            switch.set_brightness(Brightness::MAX).await,
            Err(Error::CapabilityNotSupported)
        ));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn binary_sensor_is_read_only() {
        let bus = Arc::new(MemoryBus::new());
        let (contact, topic) = entity(&bus, EntityKind::BinarySensor, "Smart-Door_Hall_Contact");
        contact.attach().await.unwrap();

        bus.inject(&topic, "1", false);
        assert!(contact.is_on());
        assert!(matches!(contact.turn_off().await, Err(Error::CapabilityNotSupported)));
    }

    #[tokio::test]
    async fn sensor_stores_raw_value() {
        let bus = Arc::new(MemoryBus::new());
        let (sensor, topic) = entity(&bus, EntityKind::Sensor, "Temp-Hall_Main_1");
        sensor.attach().await.unwrap();

        bus.inject(&topic, " 21.5 ", false);
        assert_eq!(sensor.value().as_deref(), Some(" 21.5 "));

        bus.inject(&topic, "", false);
        assert_eq!(sensor.value().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn dimmable_light_scales_brightness() {
        let bus = Arc::new(MemoryBus::new());
        let (light, topic) = entity(&bus, EntityKind::Light, "Relay-Kitchen_Main_1_Brightness");
        light.attach().await.unwrap();

        bus.inject(&topic, "50", false);
        assert_eq!(light.brightness(), Some(Brightness::new(128)));

        light.turn_on_with_brightness(Brightness::MAX).await.unwrap();
        let last = bus.published().last().cloned().unwrap();
        assert_eq!(last.topic, format!("{topic}/on"));
        assert_eq!(last.payload, "100");
        assert!(last.retain);
        assert!(light.is_on());
        assert_eq!(light.brightness(), Some(Brightness::MAX));
    }

    #[tokio::test]
    async fn on_payload_wins_over_brightness() {
        let bus = Arc::new(MemoryBus::new());
        let (light, _) = entity(&bus, EntityKind::Light, "Relay-Kitchen_Main_1_Brightness");

        light.handle_message("1");
        assert!(light.is_on());
        assert!(light.brightness().is_none());

        assert!(!light.handle_message("-5"));
        assert!(!light.handle_message("7.5"));
        assert!(light.brightness().is_none());
    }

    #[tokio::test]
    async fn brightness_zero_turns_light_off() {
        let bus = Arc::new(MemoryBus::new());
        let (light, _) = entity(&bus, EntityKind::Light, "Relay-Kitchen_Main_1_Brightness");

        light.turn_on().await.unwrap();
        light.set_brightness(Brightness::new(1)).await.unwrap();

        assert_eq!(bus.published().last().unwrap().payload, "0");
        assert!(!light.is_on());
    }

    #[tokio::test]
    async fn turn_on_with_minimum_brightness_turns_light_off() {
        let bus = Arc::new(MemoryBus::new());
        let (light, _) = entity(&bus, EntityKind::Light, "Relay-Kitchen_Main_1_Brightness");
        light.turn_on().await.unwrap();

        light.turn_on_with_brightness(Brightness::MIN).await.unwrap();

        assert_eq!(bus.published().last().unwrap().payload, "0");
        assert_eq!(light.state().power(), Some(PowerState::Off));
        assert_eq!(light.brightness(), Some(Brightness::MIN));

        light.turn_on_with_brightness(Brightness::new(3)).await.unwrap();
        assert_eq!(bus.published().last().unwrap().payload, "1");
        assert!(light.is_on());
    }

    #[tokio::test]
    async fn plain_light_ignores_numeric_payloads() {
        let bus = Arc::new(MemoryBus::new());
        let (light, _) = entity(&bus, EntityKind::Light, "Relay-Kitchen_Main_1a");

        assert!(!light.handle_message("42"));
        assert!(light.brightness().is_none());

        light.turn_on_with_brightness(Brightness::new(10)).await.unwrap();
        assert_eq!(bus.published().last().unwrap().payload, "1");
        assert!(light.brightness().is_none());
    }

    #[tokio::test]
    async fn callbacks_fire_only_on_change() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, _) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        switch.on_power_changed(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        switch.handle_message("1");
        switch.handle_message("1");
        switch.turn_on().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        switch.turn_off().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remove_unsubscribes_and_rejects_commands() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, topic) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        switch.attach().await.unwrap();
        assert_eq!(bus.subscription_count(), 1);

        let removed = Arc::new(AtomicU32::new(0));
        let removed_clone = Arc::clone(&removed);
        switch.callbacks().on_removed(move || {
            removed_clone.fetch_add(1, Ordering::SeqCst);
        });

        switch.remove().await.unwrap();
        switch.remove().await.unwrap();

        assert!(switch.is_removed());
        assert!(!switch.is_subscribed());
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(removed.load(Ordering::SeqCst), 1);

        bus.inject(&topic, "1", false);
        assert!(!switch.is_on());
        assert!(!switch.handle_message("1"));

        let err = switch.turn_on().await.unwrap_err();
        assert!(matches!(err, Error::EntityRemoved(id) if id == "Relay-Kitchen_Main_Relay-Kitchen_Main_1"));
        assert!(switch.attach().await.is_err());
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn dropped_entity_stops_handling() {
        let bus = Arc::new(MemoryBus::new());
        let (switch, topic) = entity(&bus, EntityKind::Switch, "Relay-Kitchen_Main_1");
        switch.attach().await.unwrap();
        drop(switch);

        assert_eq!(bus.inject(&topic, "1", false), 1);
    }
}
