// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity state management types.
//!
//! [`EntityState`] holds the current state of one entity, while
//! [`StateChange`] represents an individual change that can be applied to it.
//!
//! # Examples
//!
//! ```
//! use hitepro_lib::state::{EntityState, StateChange};
//! use hitepro_lib::types::{EntityKind, PowerState};
//!
//! let mut state = EntityState::for_kind(EntityKind::Light);
//! state.apply(&StateChange::Power(PowerState::On));
//!
//! assert_eq!(state.power(), Some(PowerState::On));
//! ```

mod entity_state;
mod state_change;

pub use entity_state::EntityState;
pub use state_change::StateChange;
