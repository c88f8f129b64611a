//! View-change observation and scroll scheduling.
//!
//! The original design watched the rendered region with a structural
//! mutation observer; here the merge stages emit an explicit view-changed
//! signal instead. The observer collapses a burst of signals within one
//! dispatch cycle into a single scroll-to-latest action, so a batch of N
//! patches scrolls once, not N times.

/// Collapses view-change notifications into scroll actions.
///
/// Inactive until [`ViewObserver::start`] (the view region must exist) and
/// after [`ViewObserver::stop`] (teardown); notifications outside that
/// window are ignored.
#[derive(Debug, Clone, Default)]
pub struct ViewObserver {
    active: bool,
    pending: usize,
}

impl ViewObserver {
    /// Create an inactive observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin observing.
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop observing and discard pending notifications.
    pub fn stop(&mut self) {
        self.active = false;
        self.pending = 0;
    }

    /// Whether the observer is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record that a merge batch mutated the view.
    pub fn notify(&mut self) {
        if self.active {
            self.pending = self.pending.saturating_add(1);
        }
    }

    /// Notifications recorded since the last drain.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Drain pending notifications into at most one scroll action.
    ///
    /// Returns `true` when at least one mutation was observed since the
    /// last drain.
    pub fn take_scroll(&mut self) -> bool {
        let scroll = self.pending > 0;
        self.pending = 0;
        scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_to_one_scroll() {
        let mut observer = ViewObserver::new();
        observer.start();

        for _ in 0..5 {
            observer.notify();
        }
        assert_eq!(observer.pending(), 5);

        assert!(observer.take_scroll());
        assert!(!observer.take_scroll());
    }

    #[test]
    fn no_mutation_means_no_scroll() {
        let mut observer = ViewObserver::new();
        observer.start();
        assert!(!observer.take_scroll());
    }

    #[test]
    fn inactive_observer_ignores_notifications() {
        let mut observer = ViewObserver::new();
        observer.notify();
        assert!(!observer.take_scroll());

        observer.start();
        observer.notify();
        observer.stop();
        assert!(!observer.take_scroll());
    }
}
