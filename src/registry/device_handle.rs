// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host device handle type.

use std::fmt;

use uuid::Uuid;

/// Handle of a device in the host's device registry.
///
/// The discovery engine keys devices by their HiTE-PRO device id; the host
/// keys them by this opaque handle. Entities reference their device through
/// it.
///
/// # Examples
///
/// ```
/// use hitepro_lib::registry::DeviceHandle;
///
/// let handle = DeviceHandle::new();
/// println!("Device: {handle}");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeviceHandle(Uuid);

impl DeviceHandle {
    /// Creates a new random handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a handle from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.0.to_string()[..8];
        write!(f, "DeviceHandle({short}...)")
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DeviceHandle {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
