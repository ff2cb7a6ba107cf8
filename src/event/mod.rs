// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery lifecycle events.
//!
//! The discovery coordinator announces created devices, added and removed
//! entities, and failed discovery messages on an [`EventBus`].
//!
//! # Examples
//!
//! ```
//! use hitepro_lib::event::{DiscoveryEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DiscoveryEvent::entity_removed("Gateway_Reload"));
//! ```

mod discovery_event;
mod event_bus;

pub use discovery_event::DiscoveryEvent;
pub use event_bus::EventBus;
