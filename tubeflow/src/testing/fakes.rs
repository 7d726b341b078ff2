//! Fake founts and drains for testing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::StopReason;
use crate::flow::{Drain, Fount, Pause, Pauser};

struct FakeFountState<T> {
    drain: Option<Arc<dyn Drain<T>>>,
    stopped: bool,
}

/// A fount driven by hand.
///
/// Items are pushed explicitly with [`FakeFount::push`]; pauses are recorded
/// but not enforced, so tests can observe how a drain copes with a fount
/// that keeps pushing.
pub struct FakeFount<T> {
    state: Mutex<FakeFountState<T>>,
    pauser: Pauser,
    pause_calls: Arc<AtomicUsize>,
}

impl<T: Send + 'static> FakeFount<T> {
    /// Creates a new fake fount.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let pause_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pause_calls);
        Arc::new(Self {
            state: Mutex::new(FakeFountState {
                drain: None,
                stopped: false,
            }),
            pauser: Pauser::new(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                || {},
            ),
            pause_calls,
        })
    }

    /// Returns the drain this fount flows to.
    #[must_use]
    pub fn drain(&self) -> Option<Arc<dyn Drain<T>>> {
        self.state.lock().drain.clone()
    }

    /// Delivers an item to the drain.
    pub fn push(&self, item: T) {
        if let Some(drain) = self.drain() {
            drain.receive(item);
        }
    }

    /// Ends the flow.
    pub fn finish(&self, reason: StopReason) {
        if let Some(drain) = self.drain() {
            drain.flow_stopped(reason);
        }
    }

    /// Returns true while any pause is outstanding.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pauser.is_paused()
    }

    /// Returns how many times the fount went from flowing to paused.
    #[must_use]
    pub fn times_paused(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    /// Returns true once `stop_flow` was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }
}

impl<T: Send + 'static> Fount<T> for FakeFount<T> {
    fn flow_to(self: Arc<Self>, drain: Arc<dyn Drain<T>>) {
        self.state.lock().drain = Some(Arc::clone(&drain));
        drain.flowing_from(self as Arc<dyn Fount<T>>);
    }

    fn pause_flow(&self) -> Pause {
        self.pauser.pause()
    }

    fn stop_flow(&self) {
        self.state.lock().stopped = true;
    }
}

struct FakeDrainState<T> {
    received: Vec<T>,
    stops: Vec<StopReason>,
    fount: Option<Arc<dyn Fount<T>>>,
    pauses: Vec<Pause>,
    pause_after: Option<usize>,
}

/// A drain that records everything it is given.
pub struct FakeDrain<T> {
    state: Mutex<FakeDrainState<T>>,
}

impl<T: Send + 'static> FakeDrain<T> {
    /// Creates a new fake drain.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeDrainState {
                received: Vec::new(),
                stops: Vec::new(),
                fount: None,
                pauses: Vec::new(),
                pause_after: None,
            }),
        })
    }

    /// Returns the received items.
    #[must_use]
    pub fn received(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.lock().received.clone()
    }

    /// Returns the stop reasons seen, in order.
    #[must_use]
    pub fn stops(&self) -> Vec<StopReason> {
        self.state.lock().stops.clone()
    }

    /// Returns the fount flowing to this drain.
    #[must_use]
    pub fn fount(&self) -> Option<Arc<dyn Fount<T>>> {
        self.state.lock().fount.clone()
    }

    /// Pauses the upstream fount and returns the handle.
    pub fn pause_fount(&self) -> Pause {
        match self.fount() {
            Some(fount) => fount.pause_flow(),
            None => Pause::noop(),
        }
    }

    /// Pauses the fount from inside `receive` once `count` items arrived.
    ///
    /// The pause is kept by the drain until [`FakeDrain::release_pauses`].
    pub fn pause_after(&self, count: usize) {
        self.state.lock().pause_after = Some(count);
    }

    /// Releases every pause the drain took on its own.
    pub fn release_pauses(&self) {
        let pauses = std::mem::take(&mut self.state.lock().pauses);
        drop(pauses);
    }

    /// Asks the fount to stop.
    pub fn stop_fount(&self) {
        if let Some(fount) = self.fount() {
            fount.stop_flow();
        }
    }
}

impl<T: Send + 'static> Drain<T> for FakeDrain<T> {
    fn flowing_from(&self, fount: Arc<dyn Fount<T>>) {
        self.state.lock().fount = Some(fount);
    }

    fn receive(&self, item: T) {
        let fount = {
            let mut state = self.state.lock();
            state.received.push(item);
            if state.pause_after == Some(state.received.len()) {
                state.pause_after = None;
                state.fount.clone()
            } else {
                None
            }
        };
        if let Some(fount) = fount {
            let pause = fount.pause_flow();
            self.state.lock().pauses.push(pause);
        }
    }

    fn flow_stopped(&self, reason: StopReason) {
        self.state.lock().stops.push(reason);
    }
}
