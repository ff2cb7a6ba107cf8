// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity derived from control names.

use crate::error::DiscoveryError;

/// Control name of the gateway reload button.
pub const RELOAD_CONTROL: &str = "Reload";

/// Device id and model of the gateway itself.
pub const GATEWAY_DEVICE_ID: &str = "Gateway";

/// Identity of the physical device a control belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Stable device identifier.
    pub device_id: String,
    /// Display model.
    pub model: String,
}

impl DeviceIdentity {
    /// Returns `true` for the gateway device.
    #[must_use]
    pub fn is_gateway(&self) -> bool {
        self.device_id == GATEWAY_DEVICE_ID
    }
}

/// Resolves the device a control belongs to.
///
/// The device id is the first two underscore-separated segments of the
/// control name, and the model is the first segment. The `Reload` control
/// belongs to the gateway.
///
/// # Errors
///
/// Returns [`DiscoveryError::MalformedControlName`] if the name has fewer
/// than two segments.
///
/// # Examples
///
/// ```
/// use hitepro_lib::discovery::resolve;
///
/// let identity = resolve("Relay-Kitchen_Main_1")?;
/// assert_eq!(identity.device_id, "Relay-Kitchen_Main");
/// assert_eq!(identity.model, "Relay-Kitchen");
///
/// let gateway = resolve("Reload")?;
/// assert_eq!(gateway.device_id, "Gateway");
/// # Ok::<(), hitepro_lib::error::DiscoveryError>(())
/// ```
pub fn resolve(control_name: &str) -> Result<DeviceIdentity, DiscoveryError> {
    if control_name == RELOAD_CONTROL {
        return Ok(DeviceIdentity {
            device_id: GATEWAY_DEVICE_ID.to_string(),
            model: GATEWAY_DEVICE_ID.to_string(),
        });
    }

    let mut segments = control_name.split('_');
    let (Some(model), Some(second)) = (segments.next(), segments.next()) else {
        return Err(DiscoveryError::MalformedControlName(
            control_name.to_string(),
        ));
    };

    Ok(DeviceIdentity {
        device_id: format!("{model}_{second}"),
        model: model.to_string(),
    })
}
