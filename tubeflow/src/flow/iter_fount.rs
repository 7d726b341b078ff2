//! A fount that produces items from an iterator.

use super::{Drain, Fount, Pause, Pauser};
use crate::core::StopReason;
use crate::errors::FlowError;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

struct IterState<T> {
    items: Box<dyn Iterator<Item = T> + Send>,
    drain: Option<Arc<dyn Drain<T>>>,
    paused: bool,
    pumping: bool,
    stopped: bool,
}

/// Pushes the items of an iterator to its drain, honoring pauses.
///
/// Production stops while paused and picks up where it left off on resume.
/// When the iterator is exhausted the drain sees [`StopReason::Finished`].
pub struct IteratorFount<T> {
    state: Mutex<IterState<T>>,
    pauser: Pauser,
}

impl<T: Send + 'static> IteratorFount<T> {
    /// Creates a fount over `items`.
    pub fn new<I>(items: I) -> Arc<Self>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Arc::new_cyclic(|me: &Weak<Self>| {
            let on_pause = me.clone();
            let on_resume = me.clone();
            Self {
                state: Mutex::new(IterState {
                    items: Box::new(items.into_iter()),
                    drain: None,
                    paused: false,
                    pumping: false,
                    stopped: false,
                }),
                pauser: Pauser::new(
                    move || {
                        if let Some(fount) = on_pause.upgrade() {
                            fount.state.lock().paused = true;
                        }
                    },
                    move || {
                        if let Some(fount) = on_resume.upgrade() {
                            fount.state.lock().paused = false;
                            fount.pump();
                        }
                    },
                ),
            }
        })
    }

    /// Returns true while a drain holds a pause.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pauser.is_paused()
    }

    /// Returns true once the flow has ended.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    fn pump(&self) {
        {
            let mut state = self.state.lock();
            if state.pumping {
                return;
            }
            state.pumping = true;
        }
        loop {
            let (drain, next) = {
                let mut state = self.state.lock();
                let drain = match state.drain.clone() {
                    Some(drain) if !state.paused && !state.stopped => drain,
                    _ => {
                        state.pumping = false;
                        return;
                    }
                };
                let next = state.items.next();
                if next.is_none() {
                    state.stopped = true;
                    state.pumping = false;
                    state.drain = None;
                }
                (drain, next)
            };
            match next {
                Some(item) => drain.receive(item),
                None => {
                    debug!("Iterator fount exhausted");
                    drain.flow_stopped(StopReason::Finished);
                    return;
                }
            }
        }
    }
}

impl<T: Send + 'static> Fount<T> for IteratorFount<T> {
    fn flow_to(self: Arc<Self>, drain: Arc<dyn Drain<T>>) {
        self.state.lock().drain = Some(Arc::clone(&drain));
        drain.flowing_from(Arc::clone(&self) as Arc<dyn Fount<T>>);
        self.pump();
    }

    fn pause_flow(&self) -> Pause {
        self.pauser.pause()
    }

    fn stop_flow(&self) {
        let drain = {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.drain.take()
        };
        if let Some(drain) = drain {
            drain.flow_stopped(StopReason::Failed(FlowError::StopFlowCalled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDrain;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delivers_everything_then_finishes() {
        let fount = IteratorFount::new(vec![1, 2, 3]);
        let drain = FakeDrain::<i32>::new();

        fount.clone().flow_to(drain.clone());

        assert_eq!(drain.received(), vec![1, 2, 3]);
        assert_eq!(drain.stops(), vec![StopReason::Finished]);
        assert!(fount.is_stopped());

        let weak = Arc::downgrade(&drain);
        drop(drain);
        assert_eq!(weak.strong_count(), 0);
    }

    #[test]
    fn test_pause_holds_production() {
        let fount = IteratorFount::new(vec!["a", "b", "c"]);
        let drain = FakeDrain::<&str>::new();
        drain.pause_after(1);

        fount.clone().flow_to(drain.clone());
        assert_eq!(drain.received(), vec!["a"]);
        assert!(fount.is_paused());

        drain.release_pauses();
        assert_eq!(drain.received(), vec!["a", "b", "c"]);
        assert_eq!(drain.stops(), vec![StopReason::Finished]);
    }

    #[test]
    fn test_stop_flow_notifies_drain() {
        let fount = IteratorFount::new(vec![1, 2]);
        let drain = FakeDrain::<i32>::new();
        let pause = fount.pause_flow();

        fount.clone().flow_to(drain.clone());
        assert!(drain.received().is_empty());

        fount.stop_flow();
        pause.unpause();

        assert!(drain.received().is_empty());
        assert_eq!(
            drain.stops(),
            vec![StopReason::Failed(FlowError::StopFlowCalled)]
        );
    }
}
