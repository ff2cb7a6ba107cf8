// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration configuration.
//!
//! The integration has a single option: the wildcard topic used to discover
//! controls. It is validated when the configuration entry is created, and
//! again when stored entry data is loaded.
//!
//! # Examples
//!
//! ```
//! use hitepro_lib::config::{IntegrationConfig, DEFAULT_TOPIC};
//!
//! let config = IntegrationConfig::default();
//! assert_eq!(config.mqtt_topic(), DEFAULT_TOPIC);
//!
//! let config = IntegrationConfig::from_json(r#"{"mqtt_topic": "/devices/hall/controls/#"}"#)?;
//! assert_eq!(config.mqtt_topic(), "/devices/hall/controls/#");
//!
//! assert!(IntegrationConfig::new("   ").is_err());
//! # Ok::<(), hitepro_lib::error::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::EntityKind;

/// Integration domain, used as the identifier namespace for devices.
pub const DOMAIN: &str = "hite_pro";

/// Manufacturer reported for every discovered device.
pub const MANUFACTURER: &str = "HiTE-PRO";

/// Configuration page of the HiTE-PRO gateway.
pub const CONFIGURATION_URL: &str = "http://hitepro.local/";

/// Default discovery topic.
pub const DEFAULT_TOPIC: &str = "/devices/hite-pro/controls/#";

/// Title of the configuration entry.
pub const ENTRY_TITLE: &str = "HiTE-PRO Devices";

/// Platforms the integration forwards entities to.
pub const PLATFORMS: [EntityKind; 5] = EntityKind::ALL;

/// Configuration of one integration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Wildcard topic subscribed for discovery.
    #[serde(default = "default_topic")]
    mqtt_topic: String,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            mqtt_topic: default_topic(),
        }
    }
}

impl IntegrationConfig {
    /// Creates a configuration for the given discovery topic.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTopic`] if the topic is blank.
    pub fn new(mqtt_topic: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            mqtt_topic: mqtt_topic.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from stored entry data.
    ///
    /// A missing `mqtt_topic` key falls back to [`DEFAULT_TOPIC`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the data cannot be parsed, or
    /// [`ConfigError::InvalidTopic`] if the stored topic is blank.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as entry data.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks that the discovery topic is not blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTopic`] if the topic is empty or whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt_topic.trim().is_empty() {
            return Err(ConfigError::InvalidTopic);
        }
        Ok(())
    }

    /// Returns the discovery topic.
    #[must_use]
    pub fn mqtt_topic(&self) -> &str {
        &self.mqtt_topic
    }

    /// Returns the title of the configuration entry.
    #[must_use]
    pub fn title(&self) -> &'static str {
        ENTRY_TITLE
    }
}
