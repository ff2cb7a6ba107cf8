// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for dimmable lights.
//!
//! Brightness is always held on the 0-255 display scale. Devices report and
//! accept a native integer range (0-100 for HiTE-PRO dimmers); conversion
//! between the two happens only at the payload boundary.

use std::fmt;

/// Brightness on the 0-255 display scale.
///
/// # Examples
///
/// ```
/// use hitepro_lib::types::Brightness;
///
/// let full = Brightness::MAX;
/// assert_eq!(full.to_device(100), 100);
///
/// let half = Brightness::from_device(50, 100);
/// assert_eq!(half.value(), 128);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Brightness(u8);

impl Brightness {
    /// Lowest brightness.
    pub const MIN: Self = Self(0);

    /// Full brightness.
    pub const MAX: Self = Self(u8::MAX);

    /// Creates a brightness from a display value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the display value (0-255).
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Converts a device-native value to display brightness.
    ///
    /// Values above `scale` are clamped to full brightness. A zero scale
    /// yields [`Brightness::MIN`].
    #[must_use]
    pub fn from_device(raw: u32, scale: u16) -> Self {
        if scale == 0 {
            return Self::MIN;
        }
        let scale = u32::from(scale);
        let raw = raw.min(scale);
        let value = round_div(raw * u32::from(u8::MAX), scale);
        Self(u8::try_from(value).unwrap_or(u8::MAX))
    }

    /// Converts display brightness to the device-native range `0..=scale`.
    #[must_use]
    pub fn to_device(&self, scale: u16) -> u32 {
        round_div(u32::from(self.0) * u32::from(scale), u32::from(u8::MAX))
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for Brightness {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Integer division rounding half away from zero.
fn round_div(numerator: u32, denominator: u32) -> u32 {
    (numerator * 2 + denominator) / (denominator * 2)
}
