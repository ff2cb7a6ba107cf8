// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types used across discovery and entity state.
//!
//! - [`EntityKind`]: which entity a control becomes
//! - [`PowerState`]: on/off state
//! - [`Brightness`]: display brightness with device-range conversion

mod brightness;
mod kind;
mod power;

pub use brightness::Brightness;
pub use kind::EntityKind;
pub use power::PowerState;
