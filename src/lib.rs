// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `HiTE-PRO` Lib - discovers HiTE-PRO controls on an MQTT bus and maps them
//! to stateful entities.
//!
//! A HiTE-PRO gateway exposes every relay channel, dimmer and sensor as one
//! MQTT topic below a common prefix. This library watches that prefix,
//! recognises controls by their names, groups them into devices and keeps an
//! entity per control in sync with the bus.
//!
//! # Entity Kinds
//!
//! - **Button**: the gateway `Reload` control, press only
//! - **Switch**: plain relay channels, on/off
//! - **Light**: relay channels with a suffix, optionally dimmable
//! - **Binary sensor**: `Smart-` contacts, on/off state
//! - **Sensor**: any other measurement, opaque value
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hitepro_lib::config::IntegrationConfig;
//! use hitepro_lib::entity::{EntityPlatform, EntityRuntime};
//! use hitepro_lib::types::EntityKind;
//! use hitepro_lib::{DiscoveryCoordinator, MqttBroker};
//!
//! struct Lights;
//!
//! impl EntityPlatform<MqttBroker> for Lights {
//!     fn register(&self, entity: Arc<EntityRuntime<MqttBroker>>) {
//!         entity.on_power_changed(|state| println!("light is now {state:?}"));
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> hitepro_lib::Result<()> {
//!     let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//!
//!     let coordinator = Arc::new(
//!         DiscoveryCoordinator::new(broker, IntegrationConfig::default())
//!             .with_platform(EntityKind::Light, Arc::new(Lights)),
//!     );
//!     coordinator.start().await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     coordinator.stop().await
//! }
//! ```
//!
//! # Testing Without a Broker
//!
//! [`MemoryBus`](protocol::MemoryBus) implements the same
//! [`Transport`](protocol::Transport) in process, keeps retained messages and
//! records everything published:
//!
//! ```
//! use std::sync::Arc;
//! use hitepro_lib::config::IntegrationConfig;
//! use hitepro_lib::protocol::MemoryBus;
//! use hitepro_lib::DiscoveryCoordinator;
//!
//! # async fn example() -> hitepro_lib::Result<()> {
//! let bus = Arc::new(MemoryBus::new());
//! let coordinator = Arc::new(DiscoveryCoordinator::new(bus.clone(), IntegrationConfig::default()));
//! coordinator.start().await?;
//!
//! bus.inject("/devices/hite-pro/controls/Reload", "", true);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod entity;
pub mod error;
pub mod event;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod subscription;
pub mod types;

pub use config::IntegrationConfig;
pub use discovery::{CoordinatorState, DiscoveryCoordinator};
pub use entity::{EntityDescriptor, EntityPlatform, EntityRuntime};
pub use error::{ConfigError, DiscoveryError, Error, ProtocolError, Result};
pub use event::{DiscoveryEvent, EventBus};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use protocol::{MemoryBus, Transport};
pub use registry::{DeviceDirectory, DeviceRecord, DeviceRegistry};
pub use state::{EntityState, StateChange};
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use types::{Brightness, EntityKind, PowerState};
