// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity capability flags.

use crate::types::EntityKind;

/// Capabilities of a discovered entity.
///
/// Fixed by the factory when the entity is built; commands that require a
/// missing capability fail with
/// [`Error::CapabilityNotSupported`](crate::Error::CapabilityNotSupported).
///
/// # Examples
///
/// ```
/// use hitepro_lib::entity::Capabilities;
/// use hitepro_lib::types::EntityKind;
///
/// let switch = Capabilities::for_kind(EntityKind::Switch);
/// assert!(switch.power_control);
/// assert!(!switch.brightness);
///
/// let dimmer = Capabilities::dimmable_light();
/// assert!(dimmer.brightness);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
// Independent feature flags, not states of one machine.
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Reports an on/off state.
    pub power_state: bool,

    /// Accepts on/off commands.
    pub power_control: bool,

    /// Accepts brightness commands and reports brightness.
    pub brightness: bool,

    /// Can be pressed.
    pub press: bool,

    /// Reports an opaque value.
    pub value: bool,
}

impl Capabilities {
    /// Returns the base capabilities of an entity kind.
    ///
    /// Lights start without brightness; see [`dimmable_light`](Self::dimmable_light).
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Button => Self {
                power_state: false,
                power_control: false,
                brightness: false,
                press: true,
                value: false,
            },
            EntityKind::Switch | EntityKind::Light => Self {
                power_state: true,
                power_control: true,
                brightness: false,
                press: false,
                value: false,
            },
            EntityKind::BinarySensor => Self {
                power_state: true,
                power_control: false,
                brightness: false,
                press: false,
                value: false,
            },
            EntityKind::Sensor => Self {
                power_state: false,
                power_control: false,
                brightness: false,
                press: false,
                value: true,
            },
        }
    }

    /// Returns the capabilities of a light with brightness control.
    #[must_use]
    pub const fn dimmable_light() -> Self {
        Self {
            brightness: true,
            ..Self::for_kind(EntityKind::Light)
        }
    }
}
