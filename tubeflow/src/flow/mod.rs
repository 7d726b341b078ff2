//! The push contract between producers and consumers.
//!
//! A [`Fount`] pushes items into the [`Drain`] it flows to. The drain slows
//! the fount down by calling [`Fount::pause_flow`] and holding the returned
//! [`Pause`]; releasing every outstanding pause lets items flow again. The
//! fount ends the flow with [`Drain::flow_stopped`], exactly once.
//!
//! All calls happen on one logical thread. Implementations must tolerate
//! re-entrant calls: a drain may pause or stop its fount from inside
//! `receive`.

mod iter_fount;
mod pause;

pub use iter_fount::IteratorFount;
pub use pause::{Pause, Pauser};

use crate::core::StopReason;
use std::sync::Arc;

/// A producer of items.
pub trait Fount<T>: Send + Sync {
    /// Starts delivering items to `drain`.
    ///
    /// Implementations call `drain.flowing_from(self)` before delivering.
    fn flow_to(self: Arc<Self>, drain: Arc<dyn Drain<T>>);

    /// Pauses delivery until the returned handle is released.
    fn pause_flow(&self) -> Pause;

    /// Asks the fount to stop producing for good.
    fn stop_flow(&self);
}

/// A consumer of items.
pub trait Drain<T>: Send + Sync {
    /// Called when `fount` starts flowing to this drain.
    fn flowing_from(&self, fount: Arc<dyn Fount<T>>);

    /// Receives one item.
    fn receive(&self, item: T);

    /// Called once when the flow ends.
    fn flow_stopped(&self, reason: StopReason);
}
