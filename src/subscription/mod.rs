// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for entity state changes.
//!
//! Every live entity owns a [`CallbackRegistry`]. Hosts register callbacks
//! through the entity and receive a [`SubscriptionId`] they can later use to
//! unsubscribe. Callbacks fire for inbound state-topic messages as well as
//! for optimistic updates after commands, but only when the state actually
//! changed.
//!
//! # Usage
//!
//! ```
//! use hitepro_lib::subscription::CallbackRegistry;
//! use hitepro_lib::state::StateChange;
//!
//! let callbacks = CallbackRegistry::new();
//! let sub_id = callbacks.on_power_changed(|state| {
//!     println!("now {state}");
//! });
//!
//! callbacks.dispatch(&StateChange::power_on());
//! callbacks.unsubscribe(sub_id);
//! ```

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
