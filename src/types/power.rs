// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On/off state shared by switches, lights, and binary sensors.

use std::fmt;

/// Represents the on/off state of an entity.
///
/// # Examples
///
/// ```
/// use hitepro_lib::types::PowerState;
///
/// assert_eq!(PowerState::from(true), PowerState::On);
/// assert!(PowerState::On.is_on());
/// assert_eq!(PowerState::Off.as_str(), "off");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Entity is off.
    #[default]
    Off,
    /// Entity is on.
    On,
}

impl PowerState {
    /// Returns the state name reported to the host.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }

    /// Returns `true` if the state is [`PowerState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_off() {
        assert_eq!(PowerState::default(), PowerState::Off);
    }

    #[test]
    fn from_bool() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert_eq!(PowerState::from(false), PowerState::Off);
    }

    #[test]
    fn display() {
        assert_eq!(PowerState::On.to_string(), "on");
    }
}
