//! A pure, clock-agnostic debounce tracker (spec §4.5, §5 Timeouts:
//! filesystem 100 ms, config 500 ms).
//!
//! Kept independent of any async runtime so the quiet-period logic can be
//! driven with synthetic `Instant`s in tests instead of real sleeps.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct Debouncer<T: Eq + Hash + Clone> {
    interval: Duration,
    last_touch: HashMap<T, Instant>,
}

impl<T: Eq + Hash + Clone> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_touch: HashMap::new() }
    }

    /// Record activity for `key`, resetting its quiet-period clock.
    pub fn touch(&mut self, key: T, now: Instant) {
        self.last_touch.insert(key, now);
    }

    /// Remove and return every key whose quiet period has elapsed as of
    /// `now`, in no particular order.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<T> {
        let interval = self.interval;
        let ready: Vec<T> = self
            .last_touch
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) >= interval)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &ready {
            self.last_touch.remove(key);
        }
        ready
    }

    pub fn is_pending(&self, key: &T) -> bool {
        self.last_touch.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_not_ready_before_interval_elapses() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.touch("git-box".to_string(), t0);
        assert!(d.drain_ready(t0 + Duration::from_millis(50)).is_empty());
    }

    #[test]
    fn key_ready_once_interval_elapses() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.touch("git-box".to_string(), t0);
        let ready = d.drain_ready(t0 + Duration::from_millis(150));
        assert_eq!(ready, vec!["git-box".to_string()]);
        assert!(!d.is_pending(&"git-box".to_string()));
    }

    #[test]
    fn repeated_touches_reset_the_quiet_period() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.touch("git-box".to_string(), t0);
        d.touch("git-box".to_string(), t0 + Duration::from_millis(80));
        // Only 80ms since the latest touch; not yet ready even though 130ms
        // has passed since the first touch.
        assert!(d.drain_ready(t0 + Duration::from_millis(130)).is_empty());
        assert!(!d.drain_ready(t0 + Duration::from_millis(170)).is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.touch("git-box".to_string(), t0);
        d.touch("filesystem".to_string(), t0 + Duration::from_millis(60));
        let ready = d.drain_ready(t0 + Duration::from_millis(110));
        assert_eq!(ready, vec!["git-box".to_string()]);
    }
}
