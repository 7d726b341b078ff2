//! Single-shot pending values.
//!
//! A [`Deferred`] is a shared handle on a value that becomes known later.
//! The producer keeps one clone and resolves it; the consumer registers one
//! callback. Callbacks run on the caller's stack: resolving a deferred runs
//! its callback before `resolve` returns, and registering on an already
//! resolved deferred runs the callback before `on_resolved` returns.

use crate::errors::{FlowError, FlowResult};
use parking_lot::Mutex;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// A resolution callback.
pub type ResolveCallback<T> = Box<dyn FnOnce(FlowResult<T>) + Send>;

struct Slot<T> {
    resolved: bool,
    observed: bool,
    result: Option<FlowResult<T>>,
    callback: Option<ResolveCallback<T>>,
}

/// A pending value that resolves exactly once.
pub struct Deferred<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// Creates an unresolved deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                resolved: false,
                observed: false,
                result: None,
                callback: None,
            })),
        }
    }

    /// Creates a deferred already resolved with a value.
    #[must_use]
    pub fn succeed(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates a deferred already resolved with a failure.
    #[must_use]
    pub fn fail(err: FlowError) -> Self {
        Self::settled(Err(err))
    }

    fn settled(result: FlowResult<T>) -> Self {
        let deferred = Self::new();
        {
            let mut slot = deferred.slot.lock();
            slot.resolved = true;
            slot.result = Some(result);
        }
        deferred
    }

    /// Returns true once the deferred has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().resolved
    }

    /// Returns true once a callback has been registered.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.slot.lock().observed
    }

    /// Resolves with a value.
    pub fn resolve(&self, value: T) -> FlowResult<()> {
        self.settle(Ok(value))
    }

    /// Resolves with a failure.
    pub fn reject(&self, err: FlowError) -> FlowResult<()> {
        self.settle(Err(err))
    }

    /// Resolves with either outcome.
    ///
    /// Fails with [`FlowError::AlreadyResolved`] on the second call.
    pub fn settle(&self, result: FlowResult<T>) -> FlowResult<()> {
        let callback = {
            let mut slot = self.slot.lock();
            if slot.resolved {
                return Err(FlowError::AlreadyResolved);
            }
            slot.resolved = true;
            match slot.callback.take() {
                Some(callback) => callback,
                None => {
                    slot.result = Some(result);
                    return Ok(());
                }
            }
        };
        callback(result);
        Ok(())
    }

    /// Registers the single resolution callback.
    ///
    /// Fails with [`FlowError::AlreadyObserved`] if a callback was already
    /// registered; the rejected callback is dropped without running.
    pub fn on_resolved<F>(&self, callback: F) -> FlowResult<()>
    where
        F: FnOnce(FlowResult<T>) + Send + 'static,
    {
        let ready = {
            let mut slot = self.slot.lock();
            if slot.observed {
                return Err(FlowError::AlreadyObserved);
            }
            slot.observed = true;
            if slot.resolved {
                slot.result.take()
            } else {
                slot.callback = Some(Box::new(callback));
                return Ok(());
            }
        };
        match ready {
            Some(result) => callback(result),
            None => return Err(FlowError::internal("resolved deferred lost its result")),
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("Deferred")
            .field("resolved", &slot.resolved)
            .field("observed", &slot.observed)
            .finish()
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = FlowResult<T>;
    type IntoFuture = DeferredFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        let (tx, rx) = oneshot::channel();
        let registered = self.on_resolved(move |result| {
            // The future may have been dropped; nobody is left to tell.
            let _ = tx.send(result);
        });
        match registered {
            Ok(()) => DeferredFuture::Waiting(rx),
            Err(err) => DeferredFuture::Failed(Some(err)),
        }
    }
}

/// Future returned by awaiting a [`Deferred`].
///
/// Resolves to [`FlowError::Abandoned`] if every handle on the deferred is
/// dropped before it resolves.
#[derive(Debug)]
pub enum DeferredFuture<T> {
    /// Waiting for the resolution callback.
    Waiting(oneshot::Receiver<FlowResult<T>>),
    /// Registration failed.
    Failed(Option<FlowError>),
}

impl<T> Future for DeferredFuture<T> {
    type Output = FlowResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Self::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(FlowError::Abandoned))),
            Self::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(FlowError::AlreadyObserved))),
        }
    }
}
