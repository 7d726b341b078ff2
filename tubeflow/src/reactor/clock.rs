//! A virtual clock holding timed calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// A scheduled call.
pub type TimedCall = Box<dyn FnOnce()>;

/// Identifies a call scheduled with `Reactor::call_later`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Time that only moves when told to.
#[derive(Default)]
pub(crate) struct Clock {
    now: Duration,
    next_id: u64,
    calls: BTreeMap<(Duration, u64), TimedCall>,
    deadlines: HashMap<u64, Duration>,
}

impl Clock {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, call: TimedCall) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = self.now + delay;
        self.calls.insert((deadline, id), call);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    pub fn cancel(&mut self, timer: TimerId) -> bool {
        match self.deadlines.remove(&timer.0) {
            Some(deadline) => self.calls.remove(&(deadline, timer.0)).is_some(),
            None => false,
        }
    }

    /// Removes the earliest call due at or before `limit`, moving time to it.
    pub fn pop_due(&mut self, limit: Duration) -> Option<TimedCall> {
        let (&(deadline, id), _) = self.calls.first_key_value()?;
        if deadline > limit {
            return None;
        }
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        self.calls.remove(&(deadline, id))
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn pending(&self) -> usize {
        self.calls.len()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("now", &self.now)
            .field("pending", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_calls_in_deadline_order() {
        let mut clock = Clock::default();
        clock.schedule(Duration::from_secs(2), Box::new(|| {}));
        let first = clock.schedule(Duration::from_secs(1), Box::new(|| {}));
        assert_eq!(clock.pending(), 2);

        assert!(clock.pop_due(Duration::ZERO).is_none());
        assert!(clock.pop_due(Duration::from_secs(1)).is_some());
        assert_eq!(clock.now(), Duration::from_secs(1));
        assert!(!clock.cancel(first));
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut clock = Clock::default();
        let timer = clock.schedule(Duration::from_millis(5), Box::new(|| {}));

        assert!(clock.cancel(timer));
        assert!(!clock.cancel(timer));
        assert!(clock.pop_due(Duration::from_secs(1)).is_none());
    }
}
