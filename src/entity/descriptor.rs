// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity descriptors and the factory that builds them.
//!
//! A descriptor captures everything an entity needs to talk to the bus:
//! which topic carries its state, where commands go, which payloads mean
//! what, and what the entity can do.
//!
//! | Kind | State topic | Command topic | Payloads |
//! |------|-------------|---------------|----------|
//! | Button | none | `<topic>/on` | press `1` |
//! | Switch | `<topic>` | `<topic>/on` | on `1`, off `0` |
//! | Light | `<topic>` | `<topic>/on` | on `1`, off `0`, optional brightness |
//! | BinarySensor | `<topic>` | none | on `1`, off `0` |
//! | Sensor | `<topic>` | none | raw value |

use crate::discovery::ClassifiedControl;
use crate::types::EntityKind;

use super::Capabilities;

/// Suffix appended to a control topic to form its command topic.
pub const COMMAND_SUFFIX: &str = "/on";

/// Payload meaning "on".
pub const PAYLOAD_ON: &str = "1";

/// Payload meaning "off".
pub const PAYLOAD_OFF: &str = "0";

/// Payload sent when a button is pressed.
pub const PAYLOAD_PRESS: &str = "1";

/// Device-side brightness range of dimmable lights.
pub const DEVICE_BRIGHTNESS_SCALE: u16 = 100;

/// Payloads an entity sends and recognises.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PayloadTable {
    /// Payload meaning "on".
    pub on: Option<String>,
    /// Payload meaning "off".
    pub off: Option<String>,
    /// Payload sent on a button press.
    pub press: Option<String>,
}

impl PayloadTable {
    /// Table for entities with an on/off state.
    #[must_use]
    pub fn on_off() -> Self {
        Self {
            on: Some(PAYLOAD_ON.to_string()),
            off: Some(PAYLOAD_OFF.to_string()),
            press: None,
        }
    }

    /// Table for buttons.
    #[must_use]
    pub fn press() -> Self {
        Self {
            press: Some(PAYLOAD_PRESS.to_string()),
            ..Self::default()
        }
    }
}

/// Brightness wiring of a dimmable light.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BrightnessControl {
    /// Topic receiving brightness commands.
    pub topic: String,
    /// Maximum brightness value on the device side.
    pub scale: u16,
}

/// Immutable description of one entity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EntityDescriptor {
    kind: EntityKind,
    unique_id: String,
    control_name: String,
    display_name: String,
    device_id: String,
    state_topic: Option<String>,
    command_topic: Option<String>,
    payloads: PayloadTable,
    brightness: Option<BrightnessControl>,
    capabilities: Capabilities,
}

impl EntityDescriptor {
    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the unique id, `<device_id>_<control_name>`.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Returns the control name the entity was built from.
    #[must_use]
    pub fn control_name(&self) -> &str {
        &self.control_name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the id of the owning device.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the topic the entity follows for state.
    #[must_use]
    pub fn state_topic(&self) -> Option<&str> {
        self.state_topic.as_deref()
    }

    /// Returns the topic commands are published to.
    #[must_use]
    pub fn command_topic(&self) -> Option<&str> {
        self.command_topic.as_deref()
    }

    /// Returns the payload table.
    #[must_use]
    pub fn payloads(&self) -> &PayloadTable {
        &self.payloads
    }

    /// Returns the brightness wiring of dimmable lights.
    #[must_use]
    pub fn brightness(&self) -> Option<&BrightnessControl> {
        self.brightness.as_ref()
    }

    /// Returns the capability flags.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Builds the descriptor for a classified control.
///
/// A light whose control name contains `brightness` (any case) gets
/// brightness control on its command topic with a device scale of 100.
///
/// # Examples
///
/// ```
/// use hitepro_lib::entity::build;
/// use hitepro_lib::types::EntityKind;
///
/// let topic = "/devices/hite-pro/controls/Relay-Kitchen_Main_1";
/// let descriptor = build(
///     EntityKind::Switch,
///     "Relay-Kitchen_Main_1",
///     topic,
///     "Relay-Kitchen_Main",
/// );
///
/// assert_eq!(descriptor.unique_id(), "Relay-Kitchen_Main_Relay-Kitchen_Main_1");
/// assert_eq!(descriptor.display_name(), "Relay-Kitchen Main 1");
/// assert_eq!(
///     descriptor.command_topic(),
///     Some("/devices/hite-pro/controls/Relay-Kitchen_Main_1/on")
/// );
/// ```
#[must_use]
pub fn build(kind: EntityKind, control_name: &str, topic: &str, device_id: &str) -> EntityDescriptor {
    let command_topic = format!("{topic}{COMMAND_SUFFIX}");

    let (state_topic, command_topic, payloads) = match kind {
        EntityKind::Button => (None, Some(command_topic), PayloadTable::press()),
        EntityKind::Switch | EntityKind::Light => (
            Some(topic.to_string()),
            Some(command_topic),
            PayloadTable::on_off(),
        ),
        EntityKind::BinarySensor => (Some(topic.to_string()), None, PayloadTable::on_off()),
        EntityKind::Sensor => (Some(topic.to_string()), None, PayloadTable::default()),
    };

    let brightness = (kind == EntityKind::Light
        && control_name.to_lowercase().contains("brightness"))
    .then(|| BrightnessControl {
        topic: format!("{topic}{COMMAND_SUFFIX}"),
        scale: DEVICE_BRIGHTNESS_SCALE,
    });

    let capabilities = if brightness.is_some() {
        Capabilities::dimmable_light()
    } else {
        Capabilities::for_kind(kind)
    };

    EntityDescriptor {
        kind,
        unique_id: format!("{device_id}_{control_name}"),
        control_name: control_name.to_string(),
        display_name: control_name.replace('_', " "),
        device_id: device_id.to_string(),
        state_topic,
        command_topic,
        payloads,
        brightness,
        capabilities,
    }
}

/// Builds the descriptor for a control owned by `device_id`.
#[must_use]
pub fn build_for(control: &ClassifiedControl, device_id: &str) -> EntityDescriptor {
    build(control.kind, &control.control_name, &control.topic, device_id)
}
