// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic classification.
//!
//! Maps a control topic such as `/devices/hite-pro/controls/Relay-Kitchen_Main_1`
//! to the entity kind it represents. The control name is the last topic level
//! and must sit directly below a `controls` level.
//!
//! # Rules
//!
//! Rules are tried in order and the first match wins:
//!
//! | Kind | Control name |
//! |------|--------------|
//! | Button | `Reload` |
//! | Switch | `Relay-<w>_<w>_<digits>` |
//! | Light | `Relay-<w>_<w>_<digits><any>` |
//! | BinarySensor | `Smart-<w>_<w>_<w>` |
//! | Sensor | `<w>-<w>_<w>_<w><any>` |
//!
//! `<w>` is one or more word characters (letters, digits, underscore). The
//! Light rule accepts everything the Switch rule does, so Switch must be
//! tried first.

use crate::types::EntityKind;

/// A control recognised by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedControl {
    /// The entity kind the control maps to.
    pub kind: EntityKind,
    /// The control name (last topic level).
    pub control_name: String,
    /// The full topic the control was seen on.
    pub topic: String,
}

/// Classification rules in priority order.
const RULES: [(EntityKind, fn(&str) -> bool); 5] = [
    (EntityKind::Button, is_reload),
    (EntityKind::Switch, is_switch),
    (EntityKind::Light, is_light),
    (EntityKind::BinarySensor, is_binary_sensor),
    (EntityKind::Sensor, is_sensor),
];

/// Classifies a topic.
///
/// Returns `None` for topics outside the control naming convention; such
/// topics are expected on a wildcard subscription and are not an error.
///
/// # Examples
///
/// ```
/// use hitepro_lib::discovery::classify;
/// use hitepro_lib::types::EntityKind;
///
/// let control = classify("/devices/hite-pro/controls/Relay-Kitchen_Main_1").unwrap();
/// assert_eq!(control.kind, EntityKind::Switch);
/// assert_eq!(control.control_name, "Relay-Kitchen_Main_1");
///
/// assert!(classify("/devices/hite-pro/meta/name").is_none());
/// ```
#[must_use]
pub fn classify(topic: &str) -> Option<ClassifiedControl> {
    let control_name = control_name(topic)?;

    let (kind, _) = RULES.iter().find(|(_, matches)| matches(control_name))?;

    Some(ClassifiedControl {
        kind: *kind,
        control_name: control_name.to_string(),
        topic: topic.to_string(),
    })
}

/// Extracts the control name from `.../controls/<name>`.
fn control_name(topic: &str) -> Option<&str> {
    let (parent, name) = topic.rsplit_once('/')?;
    let parent_level = parent.rsplit('/').next()?;
    if parent_level != "controls" || name.is_empty() {
        return None;
    }
    Some(name)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the leading run of word characters.
fn word_prefix(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}

/// `<w>_<w>`: an underscore with word characters on both sides.
fn has_inner_underscore(word: &str) -> bool {
    word.bytes()
        .enumerate()
        .any(|(i, b)| b == b'_' && i > 0 && i + 1 < word.len())
}

/// `<w>_<w>_<x>` at the start of an all-word string, where `<x>` starts with
/// a byte accepted by `third`.
///
/// Taking the last qualifying separator is enough: a longer head keeps every
/// inner underscore of a shorter one.
fn has_three_segments(word: &str, third: fn(u8) -> bool) -> bool {
    word.as_bytes()
        .windows(2)
        .rposition(|pair| pair[0] == b'_' && third(pair[1]))
        .is_some_and(|sep| has_inner_underscore(&word[..sep]))
}

fn any_byte(_: u8) -> bool {
    true
}

fn is_reload(name: &str) -> bool {
    name == "Reload"
}

/// `Relay-<w>_<w>_<digits>`
fn is_switch(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("Relay-") else {
        return false;
    };
    if word_prefix(rest).len() != rest.len() {
        return false;
    }
    rest.rsplit_once('_').is_some_and(|(head, digits)| {
        !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && has_inner_underscore(head)
    })
}

/// `Relay-<w>_<w>_<digits><any>`
fn is_light(name: &str) -> bool {
    name.strip_prefix("Relay-")
        .is_some_and(|rest| has_three_segments(word_prefix(rest), |b| b.is_ascii_digit()))
}

/// `Smart-<w>_<w>_<w>`
fn is_binary_sensor(name: &str) -> bool {
    name.strip_prefix("Smart-").is_some_and(|rest| {
        word_prefix(rest).len() == rest.len() && has_three_segments(rest, any_byte)
    })
}

/// `<w>-<w>_<w>_<w><any>`
fn is_sensor(name: &str) -> bool {
    let model = word_prefix(name);
    !model.is_empty()
        && name[model.len()..]
            .strip_prefix('-')
            .is_some_and(|rest| has_three_segments(word_prefix(rest), any_byte))
}
