// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery lifecycle event types.

use crate::registry::DeviceHandle;
use crate::types::EntityKind;

/// Events emitted by the discovery coordinator.
///
/// # Examples
///
/// ```
/// use hitepro_lib::event::DiscoveryEvent;
/// use hitepro_lib::types::EntityKind;
///
/// let added = DiscoveryEvent::entity_added("Gateway_Reload", EntityKind::Button, "Gateway");
/// assert_eq!(added.unique_id(), Some("Gateway_Reload"));
/// assert!(added.is_entity_lifecycle());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum DiscoveryEvent {
    /// A device was seen for the first time.
    DeviceCreated {
        /// HiTE-PRO device id.
        device_id: String,
        /// Host registry handle of the device.
        handle: DeviceHandle,
    },

    /// An entity was registered with its platform.
    EntityAdded {
        /// Unique id of the entity.
        unique_id: String,
        /// Kind of the entity.
        kind: EntityKind,
        /// Device the entity belongs to.
        device_id: String,
    },

    /// An entity was torn down.
    EntityRemoved {
        /// Unique id of the entity.
        unique_id: String,
    },

    /// A classified control could not be turned into an entity.
    DiscoveryFailed {
        /// Topic of the offending discovery message.
        topic: String,
        /// Description of the failure.
        error: String,
    },
}

impl DiscoveryEvent {
    /// Returns the entity unique id for entity events.
    #[must_use]
    pub fn unique_id(&self) -> Option<&str> {
        match self {
            Self::EntityAdded { unique_id, .. } | Self::EntityRemoved { unique_id } => {
                Some(unique_id)
            }
            Self::DeviceCreated { .. } | Self::DiscoveryFailed { .. } => None,
        }
    }

    /// Returns `true` for entity added/removed events.
    #[must_use]
    pub fn is_entity_lifecycle(&self) -> bool {
        matches!(self, Self::EntityAdded { .. } | Self::EntityRemoved { .. })
    }

    /// Creates a device created event.
    #[must_use]
    pub fn device_created(device_id: impl Into<String>, handle: DeviceHandle) -> Self {
        Self::DeviceCreated {
            device_id: device_id.into(),
            handle,
        }
    }

    /// Creates an entity added event.
    #[must_use]
    pub fn entity_added(
        unique_id: impl Into<String>,
        kind: EntityKind,
        device_id: impl Into<String>,
    ) -> Self {
        Self::EntityAdded {
            unique_id: unique_id.into(),
            kind,
            device_id: device_id.into(),
        }
    }

    /// Creates an entity removed event.
    #[must_use]
    pub fn entity_removed(unique_id: impl Into<String>) -> Self {
        Self::EntityRemoved {
            unique_id: unique_id.into(),
        }
    }

    /// Creates a discovery failure event.
    #[must_use]
    pub fn failed(topic: impl Into<String>, error: impl ToString) -> Self {
        Self::DiscoveryFailed {
            topic: topic.into(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;

    #[test]
    fn unique_id_extraction() {
        let removed = DiscoveryEvent::entity_removed("a_b");
        assert_eq!(removed.unique_id(), Some("a_b"));

        let created = DiscoveryEvent::device_created("Gateway", DeviceHandle::new());
        assert!(created.unique_id().is_none());
    }

    #[test]
    fn failure_carries_error_text() {
        let event = DiscoveryEvent::failed(
            "/x/controls/Uptime",
            DiscoveryError::MalformedControlName("Uptime".to_string()),
        );
        assert_eq!(
            event,
            DiscoveryEvent::DiscoveryFailed {
                topic: "/x/controls/Uptime".to_string(),
                error: "malformed control name: Uptime".to_string(),
            }
        );
        assert!(!event.is_entity_lifecycle());
    }
}
