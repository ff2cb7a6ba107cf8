// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity state tracking.

use chrono::{DateTime, Utc};

use crate::types::{Brightness, EntityKind, PowerState};

use super::StateChange;

/// Current state of one entity.
///
/// Which fields are meaningful depends on the entity kind: switches and
/// binary sensors track power, lights track power and brightness, sensors
/// track the last raw value, and buttons track nothing.
///
/// # Examples
///
/// ```
/// use hitepro_lib::state::{EntityState, StateChange};
/// use hitepro_lib::types::{EntityKind, PowerState};
///
/// let mut state = EntityState::for_kind(EntityKind::Switch);
/// assert_eq!(state.power(), Some(PowerState::Off));
///
/// assert!(state.apply(&StateChange::power_on()));
/// assert!(!state.apply(&StateChange::power_on()));
/// assert!(state.is_on());
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityState {
    /// On/off state.
    power: Option<PowerState>,
    /// Brightness on the display scale.
    brightness: Option<Brightness>,
    /// Last raw sensor value.
    value: Option<String>,
    /// When the state last changed.
    last_changed: Option<DateTime<Utc>>,
}

impl EntityState {
    /// Creates the initial state for an entity kind.
    ///
    /// Entities with an on/off state start off; everything else starts unknown.
    #[must_use]
    pub fn for_kind(kind: EntityKind) -> Self {
        let power = match kind {
            EntityKind::Switch | EntityKind::Light | EntityKind::BinarySensor => {
                Some(PowerState::Off)
            }
            EntityKind::Button | EntityKind::Sensor => None,
        };
        Self {
            power,
            ..Self::default()
        }
    }

    /// Returns the on/off state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.power
    }

    /// Returns `true` if the entity is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.power.is_some_and(|p| p.is_on())
    }

    /// Returns the brightness, if known.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Returns the last sensor value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns when the state last changed.
    #[must_use]
    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.last_changed
    }

    /// Applies a state change and returns whether the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        let changed = match change {
            StateChange::Power(state) => replace_if_changed(&mut self.power, *state),
            StateChange::Brightness(value) => replace_if_changed(&mut self.brightness, *value),
            StateChange::Value(value) => {
                if self.value.as_deref() == Some(value.as_str()) {
                    false
                } else {
                    self.value = Some(value.clone());
                    true
                }
            }
        };

        if changed {
            self.last_changed = Some(Utc::now());
        }
        changed
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        false
    } else {
        *slot = Some(value);
        true
    }
}
