// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic routing for subscription handlers.
//!
//! The [`TopicRouter`] keeps the handlers registered by subscribers together
//! with their topic filters, and hands every inbound message to each handler
//! whose filter matches.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: /devices/hite-pro/controls/Relay-Kitchen_Main_1 → 1
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!     Match against every registered filter
//!     (/devices/hite-pro/controls/#, .../Relay-Kitchen_Main_1)
//!                     ↓
//!           handler(topic, payload) for each match
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{MessageHandler, SubscriptionHandle};

struct Route {
    filter: String,
    handler: MessageHandler,
}

/// Routes messages to handlers by MQTT topic filter.
pub struct TopicRouter {
    next_id: AtomicU64,
    routes: RwLock<HashMap<SubscriptionHandle, Route>>,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a handler for a topic filter and returns its handle.
    pub fn register(&self, filter: impl Into<String>, handler: MessageHandler) -> SubscriptionHandle {
        let filter = filter.into();
        let handle = SubscriptionHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(filter = %filter, %handle, "Registering topic handler");
        self.routes.write().insert(handle, Route { filter, handler });
        handle
    }

    /// Removes a handler, returning the filter it was registered with.
    pub fn unregister(&self, handle: SubscriptionHandle) -> Option<String> {
        let route = self.routes.write().remove(&handle)?;
        tracing::debug!(filter = %route.filter, %handle, "Unregistering topic handler");
        Some(route.filter)
    }

    /// Returns `true` if any registered handler uses exactly this filter.
    #[must_use]
    pub fn has_filter(&self, filter: &str) -> bool {
        self.routes.read().values().any(|route| route.filter == filter)
    }

    /// Returns the handlers whose filter matches `topic`.
    #[must_use]
    pub fn handlers_for(&self, topic: &str) -> Vec<MessageHandler> {
        self.routes
            .read()
            .values()
            .filter(|route| topic_matches(&route.filter, topic))
            .map(|route| Arc::clone(&route.handler))
            .collect()
    }

    /// Delivers a message to every matching handler.
    ///
    /// Handlers run after the routing lock is released, so they may register
    /// or unregister routes themselves. Returns the number of handlers called.
    pub fn route(&self, topic: &str, payload: &str) -> usize {
        let handlers = self.handlers_for(topic);
        if handlers.is_empty() {
            tracing::trace!(topic = %topic, "No handler for topic");
        }
        for handler in &handlers {
            handler(topic, payload);
        }
        handlers.len()
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.routes.write().clear();
    }
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("routes", &self.len())
            .finish()
    }
}

/// Returns `true` if `topic` matches the MQTT topic `filter`.
///
/// `+` matches exactly one level and `#` matches any number of trailing
/// levels, including the parent level itself. Wildcards in the first level
/// do not match topics starting with `$`.
///
/// # Examples
///
/// ```
/// use hitepro_lib::protocol::topic_matches;
///
/// assert!(topic_matches("/devices/hite-pro/controls/#", "/devices/hite-pro/controls/Reload"));
/// assert!(topic_matches("/devices/+/controls/Reload", "/devices/hite-pro/controls/Reload"));
/// assert!(!topic_matches("/devices/+/Reload", "/devices/hite-pro/controls/Reload"));
/// ```
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counting_handler(counter: &Arc<AtomicU32>) -> MessageHandler {
        let counter = Arc::clone(counter);
        Arc::new(move |_topic, _payload| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn exact_filter_matches_only_itself() {
        assert!(topic_matches("a/b/c", "a/b/c"));
        assert!(!topic_matches("a/b/c", "a/b"));
        assert!(!topic_matches("a/b", "a/b/c"));
    }

    #[test]
    fn multi_level_wildcard() {
        let filter = "/devices/hite-pro/controls/#";
        assert!(topic_matches(filter, "/devices/hite-pro/controls/Reload"));
        assert!(topic_matches(filter, "/devices/hite-pro/controls/Reload/on"));
        assert!(topic_matches(filter, "/devices/hite-pro/controls"));
        assert!(!topic_matches(filter, "/devices/hite-pro/meta/name"));
        assert!(topic_matches("#", "anything/at/all"));
    }

    #[test]
    fn hash_must_be_last_level() {
        assert!(!topic_matches("a/#/c", "a/b/c"));
    }

    #[test]
    fn single_level_wildcard() {
        assert!(topic_matches("a/+/c", "a/b/c"));
        assert!(topic_matches("a/+", "a/"));
        assert!(!topic_matches("a/+", "a/b/c"));
        assert!(!topic_matches("a/+/c", "a/c"));
    }

    #[test]
    fn leading_slash_is_an_empty_level() {
        assert!(topic_matches("+/devices/#", "/devices/x"));
        assert!(!topic_matches("devices/#", "/devices/x"));
    }

    #[test]
    fn system_topics_skip_leading_wildcards() {
        assert!(!topic_matches("#", "$SYS/uptime"));
        assert!(!topic_matches("+/uptime", "$SYS/uptime"));
        assert!(topic_matches("$SYS/#", "$SYS/uptime"));
    }

    #[test]
    fn route_calls_matching_handlers() {
        let router = TopicRouter::new();
        let wildcard = Arc::new(AtomicU32::new(0));
        let exact = Arc::new(AtomicU32::new(0));

        router.register("/devices/hite-pro/controls/#", counting_handler(&wildcard));
        router.register(
            "/devices/hite-pro/controls/Relay-Kitchen_Main_1",
            counting_handler(&exact),
        );

        assert_eq!(
            router.route("/devices/hite-pro/controls/Relay-Kitchen_Main_1", "1"),
            2
        );
        assert_eq!(router.route("/devices/hite-pro/controls/Reload", ""), 1);
        assert_eq!(router.route("/elsewhere", ""), 0);

        assert_eq!(wildcard.load(Ordering::SeqCst), 2);
        assert_eq!(exact.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_receives_topic_and_payload() {
        let router = TopicRouter::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        router.register(
            "a/#",
            Arc::new(move |topic: &str, payload: &str| {
                seen_clone.lock().push((topic.to_string(), payload.to_string()));
            }),
        );
        router.route("a/b", "42");

        assert_eq!(*seen.lock(), vec![("a/b".to_string(), "42".to_string())]);
    }

    #[test]
    fn unregister_returns_filter() {
        let router = TopicRouter::new();
        let counter = Arc::new(AtomicU32::new(0));
        let handle = router.register("a/b", counting_handler(&counter));

        assert!(router.has_filter("a/b"));
        assert_eq!(router.unregister(handle).as_deref(), Some("a/b"));
        assert!(router.unregister(handle).is_none());
        assert!(!router.has_filter("a/b"));
        assert!(router.is_empty());

        router.route("a/b", "x");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handles_are_unique() {
        let router = TopicRouter::new();
        let counter = Arc::new(AtomicU32::new(0));
        let first = router.register("a", counting_handler(&counter));
        let second = router.register("a", counting_handler(&counter));

        assert_ne!(first, second);
        assert_eq!(router.len(), 2);

        router.unregister(first);
        assert!(router.has_filter("a"));
    }

    #[test]
    fn handler_may_unregister_during_route() {
        let router = Arc::new(TopicRouter::new());
        let slot = Arc::new(parking_lot::Mutex::new(None::<SubscriptionHandle>));

        let router_clone = Arc::clone(&router);
        let slot_clone = Arc::clone(&slot);
        let handle = router.register(
            "a",
            Arc::new(move |_: &str, _: &str| {
                if let Some(handle) = slot_clone.lock().take() {
                    router_clone.unregister(handle);
                }
            }),
        );
        *slot.lock() = Some(handle);

        assert_eq!(router.route("a", ""), 1);
        assert!(router.is_empty());
    }
}
