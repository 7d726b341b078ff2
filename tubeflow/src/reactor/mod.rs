//! A single-threaded reactor for driving flows.
//!
//! Everything in a flow runs on one logical thread: siphon logic, deferred
//! callbacks and the tasks that eventually resolve deferreds. The reactor
//! makes that explicit. It owns a FIFO of ready callbacks, a virtual clock
//! for timed calls, and a local executor for Rust futures whose outputs are
//! exposed as [`Deferred`] values.
//!
//! The reactor is deliberately `!Send`; share it with `Rc` when callbacks
//! need to schedule more work.

mod clock;

pub use clock::TimerId;

use clock::{Clock, TimedCall};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::Deferred;
use crate::errors::{FlowError, FlowResult};

/// A single-threaded event loop with a virtual clock.
pub struct Reactor {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    ready: RefCell<VecDeque<TimedCall>>,
    clock: RefCell<Clock>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// Creates an idle reactor at time zero.
    #[must_use]
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            ready: RefCell::new(VecDeque::new()),
            clock: RefCell::new(Clock::default()),
        }
    }

    /// Returns the virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.borrow().now()
    }

    /// Queues `call` to run on the next turn.
    pub fn call_soon<F>(&self, call: F)
    where
        F: FnOnce() + 'static,
    {
        self.ready.borrow_mut().push_back(Box::new(call));
    }

    /// Schedules `call` to run once the clock has moved `delay` forward.
    pub fn call_later<F>(&self, delay: Duration, call: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        self.clock.borrow_mut().schedule(delay, Box::new(call))
    }

    /// Cancels a timed call. Returns false if it already ran or was cancelled.
    pub fn cancel(&self, timer: TimerId) -> bool {
        self.clock.borrow_mut().cancel(timer)
    }

    /// Returns the number of timed calls not yet run.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.clock.borrow().pending()
    }

    /// Runs `future` on the reactor and exposes its output as a deferred.
    pub fn spawn<T, F>(&self, future: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: Future<Output = FlowResult<T>> + 'static,
    {
        let deferred = Deferred::new();
        let producer = deferred.clone();
        let spawned = self.spawner.spawn_local(async move {
            if producer.settle(future.await).is_err() {
                debug!("Spawned task finished after its deferred was resolved");
            }
        });
        if let Err(err) = spawned {
            if deferred
                .reject(FlowError::internal(format!("spawn failed: {err}")))
                .is_err()
            {
                debug!("Spawn failure not reported: deferred already resolved");
            }
        }
        deferred
    }

    /// Returns a deferred that resolves with `result` after `delay`.
    pub fn defer_later<T>(&self, delay: Duration, result: FlowResult<T>) -> Deferred<T>
    where
        T: Send + 'static,
    {
        let deferred = Deferred::new();
        let producer = deferred.clone();
        self.call_later(delay, move || {
            if producer.settle(result).is_err() {
                debug!("Timed resolution dropped: deferred already resolved");
            }
        });
        deferred
    }

    /// Runs ready callbacks and spawned tasks until nothing can progress
    /// without the clock moving.
    ///
    /// Must not be called from inside a callback or task.
    pub fn run_until_idle(&self) {
        loop {
            let mut ran = false;
            loop {
                let next = self.ready.borrow_mut().pop_front();
                let Some(call) = next else { break };
                call();
                ran = true;
            }
            self.pool.borrow_mut().run_until_stalled();
            if !ran && self.ready.borrow().is_empty() {
                break;
            }
        }
    }

    /// Moves the clock forward, running every timed call that falls due in
    /// deadline order, each followed by whatever work it made ready.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        self.run_until_idle();
        loop {
            let due = self.clock.borrow_mut().pop_due(target);
            let Some(call) = due else { break };
            call();
            self.run_until_idle();
        }
        self.clock.borrow_mut().set_now(target);
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("now", &self.now())
            .field("ready", &self.ready.borrow().len())
            .field("timers", &self.pending_timers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::IntoFuture;
    use std::rc::Rc;

    #[test]
    fn test_call_soon_runs_in_order() {
        let reactor = Reactor::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let log = Rc::clone(&log);
            reactor.call_soon(move || log.borrow_mut().push(n));
        }
        assert!(log.borrow().is_empty());

        reactor.run_until_idle();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_call_later_follows_the_clock() {
        let reactor = Reactor::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let late = Rc::clone(&log);
        reactor.call_later(Duration::from_secs(2), move || late.borrow_mut().push("late"));
        let early = Rc::clone(&log);
        reactor.call_later(Duration::from_secs(1), move || early.borrow_mut().push("early"));

        reactor.advance(Duration::from_millis(500));
        assert!(log.borrow().is_empty());

        reactor.advance(Duration::from_secs(2));
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(reactor.now(), Duration::from_millis(2500));
        assert_eq!(reactor.pending_timers(), 0);
    }

    #[test]
    fn test_cancelled_call_never_runs() {
        let reactor = Reactor::new();
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);

        let timer = reactor.call_later(Duration::from_secs(1), move || *flag.borrow_mut() = true);
        assert!(reactor.cancel(timer));

        reactor.advance(Duration::from_secs(5));
        assert!(!*ran.borrow());
    }

    #[test]
    fn test_defer_later() {
        let reactor = Reactor::new();
        let d = reactor.defer_later(Duration::from_secs(3), Ok("done"));

        reactor.advance(Duration::from_secs(2));
        assert!(!d.is_resolved());

        reactor.advance(Duration::from_secs(1));
        assert!(d.is_resolved());
    }

    #[test]
    fn test_defer_later_keeps_earlier_resolution() {
        let reactor = Reactor::new();
        let d = reactor.defer_later(Duration::from_secs(1), Ok(1_u8));
        d.resolve(2).unwrap();

        reactor.advance(Duration::from_secs(1));

        assert_eq!(reactor.pending_timers(), 0);
        assert_eq!(tokio_test::block_on(d.into_future()), Ok(2));
    }

    #[test]
    fn test_spawned_future_resolves_deferred() {
        let reactor = Reactor::new();
        let timer = reactor.defer_later(Duration::from_secs(1), Ok(20_u32));
        let d = reactor.spawn(async move {
            let base = timer.await?;
            Ok::<_, FlowError>(base + 1)
        });

        reactor.run_until_idle();
        assert!(!d.is_resolved());

        reactor.advance(Duration::from_secs(1));
        assert!(d.is_resolved());
        assert_eq!(tokio_test::block_on(d.into_future()), Ok(21));
    }

    #[test]
    fn test_spawned_failure() {
        let reactor = Reactor::new();
        let d: Deferred<u8> = reactor.spawn(async { Err(FlowError::resolution("refused")) });

        reactor.run_until_idle();
        let result = tokio_test::block_on(d.into_future());
        assert_eq!(result, Err(FlowError::resolution("refused")));
    }
}
