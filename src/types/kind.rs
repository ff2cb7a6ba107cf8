// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity kinds a discovered control can map to.

use std::fmt;
use std::str::FromStr;

/// The closed set of entity kinds produced by discovery.
///
/// # Examples
///
/// ```
/// use hitepro_lib::types::EntityKind;
///
/// assert_eq!(EntityKind::BinarySensor.as_str(), "binary_sensor");
/// assert_eq!("switch".parse::<EntityKind>(), Ok(EntityKind::Switch));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Stateless push button.
    Button,
    /// On/off relay.
    Switch,
    /// Relay driving a light, optionally dimmable.
    Light,
    /// Two-state sensor.
    BinarySensor,
    /// Sensor reporting an opaque value.
    Sensor,
}

impl EntityKind {
    /// All kinds, in host platform order.
    pub const ALL: [Self; 5] = [
        Self::Button,
        Self::Switch,
        Self::Light,
        Self::Sensor,
        Self::BinarySensor,
    ];

    /// Returns the platform name used by the host.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Switch => "switch",
            Self::Light => "light",
            Self::BinarySensor => "binary_sensor",
            Self::Sensor => "sensor",
        }
    }

    /// Returns `true` if entities of this kind follow a state topic.
    #[must_use]
    pub const fn has_state(&self) -> bool {
        !matches!(self, Self::Button)
    }

    /// Returns `true` if entities of this kind accept commands.
    #[must_use]
    pub const fn is_commandable(&self) -> bool {
        matches!(self, Self::Button | Self::Switch | Self::Light)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind: {s}"))
    }
}
