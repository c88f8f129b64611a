//! Per-destination subscription routing.
//!
//! Maps inbound frame destinations to handlers. A session owns exactly two
//! live routes (the personal message queue and the side-channel queue);
//! the router itself is generic so it routes to whatever handler value the
//! caller binds. Dispatch is synchronous on the caller's thread; the router
//! only resolves, it never invokes.

use std::collections::HashMap;

/// Destination-to-handler table.
///
/// Re-subscribing to a destination replaces the previous handler (last
/// writer wins). [`SubscriptionRouter::unsubscribe_all`] is idempotent.
#[derive(Debug, Clone)]
pub struct SubscriptionRouter<H> {
    routes: HashMap<String, H>,
}

impl<H> Default for SubscriptionRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SubscriptionRouter<H> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register `handler` for `destination`, returning the handler it
    /// replaced, if any.
    pub fn subscribe(&mut self, destination: impl Into<String>, handler: H) -> Option<H> {
        self.routes.insert(destination.into(), handler)
    }

    /// Resolve the handler for `destination`.
    pub fn route(&self, destination: &str) -> Option<&H> {
        self.routes.get(destination)
    }

    /// Drop every route. Idempotent; called on session teardown before the
    /// transport is released so no handler resolves against a torn-down
    /// view.
    pub fn unsubscribe_all(&mut self) {
        self.routes.clear();
    }

    /// Number of live routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the router has no live routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_handler_per_destination_last_writer_wins() {
        let mut router = SubscriptionRouter::new();
        assert_eq!(router.subscribe("/user/queue/messages", 1), None);
        assert_eq!(router.subscribe("/user/queue/messages", 2), Some(1));

        assert_eq!(router.route("/user/queue/messages"), Some(&2));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn unknown_destination_resolves_to_none() {
        let router: SubscriptionRouter<u8> = SubscriptionRouter::new();
        assert_eq!(router.route("/user/queue/other"), None);
    }

    #[test]
    fn unsubscribe_all_is_idempotent() {
        let mut router = SubscriptionRouter::new();
        router.subscribe("/a", 1);
        router.subscribe("/b", 2);

        router.unsubscribe_all();
        assert!(router.is_empty());

        router.unsubscribe_all();
        assert!(router.is_empty());
    }
}
