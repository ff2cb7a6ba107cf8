// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directory of discovered devices.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{CONFIGURATION_URL, DOMAIN, MANUFACTURER};
use crate::discovery::{DeviceIdentity, GATEWAY_DEVICE_ID};

use super::DeviceHandle;

/// Device description handed to the host's device registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceInfo {
    /// Identifier pairs, `(DOMAIN, device_id)`.
    pub identifiers: Vec<(String, String)>,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Display name.
    pub name: String,
    /// Model name.
    pub model: String,
    /// Configuration page of the device.
    pub configuration_url: Option<String>,
}

/// Host-side storage of devices.
///
/// Implementations must be idempotent on identifiers: asking twice for the
/// same identifiers returns the same handle.
pub trait DeviceRegistry: Send + Sync {
    /// Returns the handle for the described device, creating it if needed.
    fn get_or_create(&self, info: &DeviceInfo) -> DeviceHandle;
}

/// A discovered physical device.
///
/// Identity fields never change once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceRecord {
    device_id: String,
    model: String,
    display_name: String,
    handle: DeviceHandle,
}

impl DeviceRecord {
    /// Returns the HiTE-PRO device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the device model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the host registry handle.
    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }
}

/// Returns the display name for a device id.
fn display_name_for(device_id: &str) -> String {
    if device_id == GATEWAY_DEVICE_ID {
        GATEWAY_DEVICE_ID.to_string()
    } else {
        device_id.replace('_', " ")
    }
}

/// Registry of device records keyed by device id.
///
/// Creation is serialized by a single lock, so concurrent discovery of
/// controls on the same device yields exactly one record and one call to the
/// host registry.
///
/// # Examples
///
/// ```
/// use hitepro_lib::registry::DeviceDirectory;
///
/// let directory = DeviceDirectory::new();
/// let first = directory.get_or_create("Relay-Kitchen_Main", "Relay-Kitchen");
/// let again = directory.get_or_create("Relay-Kitchen_Main", "Other");
///
/// assert_eq!(first.display_name(), "Relay-Kitchen Main");
/// assert_eq!(again.model(), "Relay-Kitchen");
/// assert_eq!(directory.len(), 1);
/// ```
pub struct DeviceDirectory {
    devices: Mutex<HashMap<String, Arc<DeviceRecord>>>,
    host: Option<Arc<dyn DeviceRegistry>>,
}

impl DeviceDirectory {
    /// Creates a directory that mints its own device handles.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            host: None,
        }
    }

    /// Creates a directory backed by the host's device registry.
    #[must_use]
    pub fn with_registry(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            host: Some(registry),
        }
    }

    /// Returns the record for `device_id`, creating it on first sighting.
    ///
    /// Later calls return the existing record unchanged, whatever `model`
    /// they pass.
    pub fn get_or_create(&self, device_id: &str, model: &str) -> Arc<DeviceRecord> {
        self.upsert(device_id, model).0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// the record was created by this call.
    pub fn upsert(&self, device_id: &str, model: &str) -> (Arc<DeviceRecord>, bool) {
        let mut devices = self.devices.lock();
        if let Some(record) = devices.get(device_id) {
            return (Arc::clone(record), false);
        }

        let display_name = display_name_for(device_id);
        let handle = match &self.host {
            Some(registry) => registry.get_or_create(&DeviceInfo {
                identifiers: vec![(DOMAIN.to_string(), device_id.to_string())],
                manufacturer: MANUFACTURER.to_string(),
                name: display_name.clone(),
                model: model.to_string(),
                configuration_url: Some(CONFIGURATION_URL.to_string()),
            }),
            None => DeviceHandle::new(),
        };

        let record = Arc::new(DeviceRecord {
            device_id: device_id.to_string(),
            model: model.to_string(),
            display_name,
            handle,
        });
        devices.insert(device_id.to_string(), Arc::clone(&record));

        tracing::debug!(device = %device_id, model = %model, %handle, "Created device record");
        (record, true)
    }

    /// Resolves and records the device for an identity.
    pub fn get_or_create_identity(&self, identity: &DeviceIdentity) -> (Arc<DeviceRecord>, bool) {
        self.upsert(&identity.device_id, &identity.model)
    }

    /// Returns the record for `device_id`, if known.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceRecord>> {
        self.devices.lock().get(device_id).cloned()
    }

    /// Returns all known records.
    #[must_use]
    pub fn records(&self) -> Vec<Arc<DeviceRecord>> {
        self.devices.lock().values().cloned().collect()
    }

    /// Returns the number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    /// Returns `true` if no device has been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }
}

impl Default for DeviceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDirectory")
            .field("devices", &self.len())
            .field("host_registry", &self.host.is_some())
            .finish()
    }
}
