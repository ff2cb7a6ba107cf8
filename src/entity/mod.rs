// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entities built from discovered controls.
//!
//! - [`build`] turns a classified control into an [`EntityDescriptor`]
//! - [`EntityRuntime`] is the live entity, following its state topic and
//!   publishing commands
//! - [`EntityPlatform`] is implemented by the host to receive new entities

mod capabilities;
mod descriptor;
mod runtime;

pub use capabilities::Capabilities;
pub use descriptor::{
    BrightnessControl, COMMAND_SUFFIX, DEVICE_BRIGHTNESS_SCALE, EntityDescriptor, PAYLOAD_OFF,
    PAYLOAD_ON, PAYLOAD_PRESS, PayloadTable, build, build_for,
};
pub use runtime::EntityRuntime;

use std::sync::Arc;

/// Host container receiving the entities of one kind.
///
/// The coordinator registers every new entity exactly once, after its state
/// subscription is in place.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use hitepro_lib::entity::{EntityPlatform, EntityRuntime};
/// use hitepro_lib::protocol::MemoryBus;
///
/// #[derive(Default)]
/// struct Switches(Mutex<Vec<Arc<EntityRuntime<MemoryBus>>>>);
///
/// impl EntityPlatform<MemoryBus> for Switches {
///     fn register(&self, entity: Arc<EntityRuntime<MemoryBus>>) {
///         self.0.lock().push(entity);
///     }
/// }
/// ```
pub trait EntityPlatform<T>: Send + Sync {
    /// Takes ownership of a newly discovered entity.
    fn register(&self, entity: Arc<EntityRuntime<T>>);
}
