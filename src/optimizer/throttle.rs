//! Throttled, coalescing update queue
//!
//! At most one pending value per key. A value pushed while another is still
//! pending replaces it, and a key is emitted at most once per window.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No value was pending for the key
    Queued,
    /// A pending value was overwritten
    Coalesced,
}

#[derive(Debug)]
pub struct ThrottledQueue<K, V> {
    window: Duration,
    pending: HashMap<K, V>,
    /// Insertion order of pending keys
    order: Vec<K>,
    last_emitted: HashMap<K, Instant>,
    coalesced: u64,
}

impl<K, V> ThrottledQueue<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            order: Vec::new(),
            last_emitted: HashMap::new(),
            coalesced: 0,
        }
    }

    pub fn push(&mut self, key: K, value: V) -> PushOutcome {
        if self.pending.insert(key.clone(), value).is_some() {
            self.coalesced += 1;
            PushOutcome::Coalesced
        } else {
            self.order.push(key);
            PushOutcome::Queued
        }
    }

    /// Emits pending values whose key is outside its throttle window.
    pub fn take_ready(&mut self, now: Instant) -> Vec<(K, V)> {
        let window = self.window;
        let (ready, waiting): (Vec<K>, Vec<K>) =
            self.order.drain(..).partition(|key| match self.last_emitted.get(key) {
                Some(last) => now.saturating_duration_since(*last) >= window,
                None => true,
            });
        self.order = waiting;

        ready
            .into_iter()
            .filter_map(|key| {
                let value = self.pending.remove(&key)?;
                self.last_emitted.insert(key.clone(), now);
                Some((key, value))
            })
            .collect()
    }

    /// Emits everything pending, ignoring the window.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let now = Instant::now();
        self.order
            .drain(..)
            .filter_map(|key| {
                let value = self.pending.remove(&key)?;
                self.last_emitted.insert(key.clone(), now);
                Some((key, value))
            })
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Values dropped because a newer one replaced them.
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesces_same_key() {
        let mut queue = ThrottledQueue::new(Duration::from_secs(1));
        assert_eq!(queue.push("memory", 1), PushOutcome::Queued);
        assert_eq!(queue.push("memory", 2), PushOutcome::Coalesced);
        assert_eq!(queue.push("connection", 9), PushOutcome::Queued);

        assert_eq!(queue.pending_len(), 2);
        assert_eq!(queue.coalesced_count(), 1);

        let ready = queue.take_ready(Instant::now());
        assert_eq!(ready, vec![("memory", 2), ("connection", 9)]);
    }

    #[test]
    fn test_window_holds_back_recent_keys() {
        let start = Instant::now();
        let mut queue = ThrottledQueue::new(Duration::from_secs(10));

        queue.push("k", 1);
        assert_eq!(queue.take_ready(start), vec![("k", 1)]);

        queue.push("k", 2);
        assert!(queue.take_ready(start + Duration::from_secs(5)).is_empty());
        assert_eq!(queue.pending_len(), 1);

        queue.push("k", 3);
        assert_eq!(
            queue.take_ready(start + Duration::from_secs(10)),
            vec![("k", 3)]
        );
    }

    #[test]
    fn test_drain_ignores_window() {
        let mut queue = ThrottledQueue::new(Duration::from_secs(3600));
        queue.push(1u8, "a");
        queue.take_ready(Instant::now());
        queue.push(1u8, "b");

        assert_eq!(queue.drain(), vec![(1u8, "b")]);
        assert_eq!(queue.pending_len(), 0);
    }
}
