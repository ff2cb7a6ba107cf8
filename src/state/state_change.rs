// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! State changes are produced by inbound state-topic messages and by
//! optimistic command updates, and are applied to an
//! [`EntityState`](super::EntityState).
//!
//! # Examples
//!
//! ```
//! use hitepro_lib::state::StateChange;
//! use hitepro_lib::types::{Brightness, PowerState};
//!
//! let on = StateChange::Power(PowerState::On);
//! let dim = StateChange::Brightness(Brightness::new(128));
//! let reading = StateChange::Value("21.5".to_string());
//! # let _ = (on, dim, reading);
//! ```

use crate::types::{Brightness, PowerState};

/// A change to an entity's state.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// On/off state changed.
    Power(PowerState),

    /// Light brightness changed (display scale).
    Brightness(Brightness),

    /// Sensor value changed. Stored verbatim.
    Value(String),
}

impl StateChange {
    /// Creates a power-on change.
    #[must_use]
    pub fn power_on() -> Self {
        Self::Power(PowerState::On)
    }

    /// Creates a power-off change.
    #[must_use]
    pub fn power_off() -> Self {
        Self::Power(PowerState::Off)
    }

    /// Returns the power state carried by this change, if any.
    #[must_use]
    pub fn power_state(&self) -> Option<PowerState> {
        match self {
            Self::Power(state) => Some(*state),
            _ => None,
        }
    }
}
