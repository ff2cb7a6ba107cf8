// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `hitepro_lib` library.
//!
//! This module provides the error hierarchy for the discovery engine:
//! malformed control names, transport failures, configuration validation,
//! and commands issued against entities that are no longer live.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A discovery event could not be turned into an entity.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The message transport rejected a publish or subscribe request.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The integration configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A command was issued to an entity that has been removed.
    #[error("entity {0} has been removed")]
    EntityRemoved(String),

    /// The entity does not support the requested capability.
    #[error("entity does not support this capability")]
    CapabilityNotSupported,

    /// The discovery coordinator is not running.
    #[error("discovery coordinator is not running")]
    NotRunning,
}

/// Errors raised while processing a single discovery event.
///
/// These never stop the discovery stream; the offending event is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The control name does not contain the two segments a device id needs.
    #[error("malformed control name: {0}")]
    MalformedControlName(String),
}

/// Errors related to the publish/subscribe transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The subscription handle is unknown to the transport.
    #[error("no subscription with handle {0}")]
    NotSubscribed(u64),
}

/// Errors related to integration configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The discovery topic is empty or only whitespace.
    #[error("discovery topic must not be blank")]
    InvalidTopic,

    /// The stored entry data is not valid JSON.
    #[error("invalid entry data: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns the key shown to the user by the configuration form.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::InvalidTopic => "invalid_topic",
            Self::Json(_) => "invalid_data",
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
