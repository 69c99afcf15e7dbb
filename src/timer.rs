use std::collections::{BTreeMap, HashMap};

/// Engine time in milliseconds since the controller started.
pub type Millis = u64;

/// Handle to a pending timer. Repeating timers keep their handle across firings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Entry<E> {
    id: TimerId,
    event: E,
    /// Re-arm interval for repeating timers.
    every: Option<Millis>,
}

/// Virtual-time timer wheel. Everything that "waits" in the engine waits here.
///
/// Entries are ordered by `(due, seq)` so timers due at the same instant fire in
/// the order they were armed.
pub struct TimerQueue<E> {
    due: BTreeMap<(Millis, u64), Entry<E>>,
    /// Current queue key for each live timer.
    index: HashMap<TimerId, (Millis, u64)>,
    next_seq: u64,
}

impl<E: Clone> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            due: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Fire `event` once, `delay` ms after `now`.
    pub fn after(&mut self, now: Millis, delay: Millis, event: E) -> TimerId {
        let id = TimerId(self.bump());
        self.insert(now + delay, id, event, None);
        id
    }

    /// Fire `event` every `interval` ms, first firing at `now + interval`.
    pub fn every(&mut self, now: Millis, interval: Millis, event: E) -> TimerId {
        let interval = interval.max(1);
        let id = TimerId(self.bump());
        self.insert(now + interval, id, event, Some(interval));
        id
    }

    /// Cancel a timer. Returns false if it already fired (one-shot) or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => self.due.remove(&key).is_some(),
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Instant of the earliest pending timer.
    pub fn next_due(&self) -> Option<Millis> {
        self.due.keys().next().map(|(at, _)| *at)
    }

    /// Pop the earliest timer due at or before `now`.
    /// Repeating timers are re-armed relative to their scheduled instant, not `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, TimerId, E)> {
        let (&key, _) = self.due.iter().next()?;
        if key.0 > now {
            return None;
        }
        let entry = self.due.remove(&key)?;
        self.index.remove(&entry.id);

        let at = key.0;
        if let Some(interval) = entry.every {
            self.insert(at + interval, entry.id, entry.event.clone(), Some(interval));
        }
        Some((at, entry.id, entry.event))
    }

    /// Drop every timer whose event fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) {
        let index = &mut self.index;
        self.due.retain(|_, entry| {
            let kept = keep(&entry.event);
            if !kept {
                index.remove(&entry.id);
            }
            kept
        });
    }

    pub fn clear(&mut self) {
        self.due.clear();
        self.index.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.due.len()
    }

    fn insert(&mut self, at: Millis, id: TimerId, event: E, every: Option<Millis>) {
        let key = (at, self.bump());
        self.index.insert(id, key);
        self.due.insert(key, Entry { id, event, every });
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl<E: Clone> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
