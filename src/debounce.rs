/// Keyed trailing-edge debouncer driven by an explicit clock
use std::collections::HashMap;
use std::hash::Hash;

/// Coalesces bursts of triggers per key
///
/// Each `schedule` pushes the key's deadline to `now + delay`. Callers
/// poll `take_due` when their timer fires; keys whose deadline has passed
/// are returned once and forgotten.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay_ms: i64,
    deadlines: HashMap<K, i64>,
}

impl<K: Eq + Hash + Copy + Ord> Debouncer<K> {
    pub fn new(delay_ms: i64) -> Self {
        Debouncer {
            delay_ms,
            deadlines: HashMap::new(),
        }
    }

    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    /// Returns true when the key was not already waiting
    pub fn schedule(&mut self, key: K, now: i64) -> bool {
        self.deadlines.insert(key, now + self.delay_ms).is_none()
    }

    /// Keys whose quiet period has elapsed, in ascending key order
    pub fn take_due(&mut self, now: i64) -> Vec<K> {
        let mut due: Vec<K> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        due.sort();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }
}
