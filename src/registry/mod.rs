// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device records shared by the entities of one physical device.
//!
//! Every control discovered on the bus belongs to a device. The
//! [`DeviceDirectory`] creates a [`DeviceRecord`] the first time a device is
//! seen and hands back the same record afterwards. When the host supplies a
//! [`DeviceRegistry`], the directory registers each new device there exactly
//! once and keeps the returned [`DeviceHandle`].

mod device_handle;
mod directory;

pub use device_handle::DeviceHandle;
pub use directory::{DeviceDirectory, DeviceInfo, DeviceRecord, DeviceRegistry};
