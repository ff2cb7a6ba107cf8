// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auto-discovery of HiTE-PRO controls.
//!
//! The gateway publishes one topic per control below a common prefix, for
//! example `/devices/hite-pro/controls/Relay-Kitchen_Main_1`. Discovery
//! subscribes to a wildcard over that prefix and, for every topic seen:
//!
//! 1. [`classify`] maps the control name to an entity kind
//! 2. [`resolve`] derives the owning device from the control name
//! 3. the device is recorded once in the [`DeviceDirectory`](crate::registry::DeviceDirectory)
//! 4. an [`EntityRuntime`](crate::entity::EntityRuntime) is built, subscribed
//!    to its state topic and handed to the host platform for its kind
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use hitepro_lib::config::IntegrationConfig;
//! use hitepro_lib::discovery::DiscoveryCoordinator;
//! use hitepro_lib::protocol::MqttBroker;
//!
//! # async fn example() -> hitepro_lib::Result<()> {
//! let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//! let coordinator = Arc::new(DiscoveryCoordinator::new(broker, IntegrationConfig::default()));
//!
//! let mut events = coordinator.subscribe();
//! coordinator.start().await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod classifier;
mod coordinator;
mod identity;

pub use classifier::{ClassifiedControl, classify};
pub use coordinator::{CoordinatorState, DiscoveryCoordinator};
pub use identity::{DeviceIdentity, GATEWAY_DEVICE_ID, RELOAD_CONTROL, resolve};
