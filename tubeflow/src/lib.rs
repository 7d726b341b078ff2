//! # Tubeflow
//!
//! Flow-controlled pipelines of tubes with in-order delivery of deferred
//! results.
//!
//! A [`Tube`](tubes::Tube) turns each input into an
//! [`Emission`](core::Emission): a lazy sequence of outputs, any of which
//! may be a [`Deferred`](core::Deferred) that resolves later. A
//! [`Siphon`](siphon::Siphon) places a tube between a
//! [`Fount`](flow::Fount) and a [`Drain`](flow::Drain) and guarantees:
//!
//! - **Ordering**: outputs reach the drain in the order the tube produced
//!   them, however their deferreds resolve
//! - **Laziness**: nothing after a pending output is pulled until it resolves
//! - **Backpressure**: resolved outputs are buffered while the drain is
//!   paused and flushed in order on resume; upstream is paused meanwhile
//! - **Failure propagation**: a failed output ends the flow at its position
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tubeflow::prelude::*;
//!
//! let lookup = FnTube::new("lookup", |name: String| {
//!     Emission::pending(resolver.resolve(name))
//! });
//! let fount = IteratorFount::new(vec!["a.example".to_string()]);
//! let exit = fount.flow_into(&series(lookup));
//! exit.flow_to(drain);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod errors;
pub mod events;
pub mod flow;
pub mod reactor;
pub mod siphon;
pub mod testing;
pub mod tubes;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{Deferred, Emission, Output, StopReason};
    pub use crate::errors::{FlowError, FlowResult};
    pub use crate::events::{
        CollectingEventSink, EventSink, FlowEvent, FlowMetrics, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::flow::{Drain, Fount, IteratorFount, Pause, Pauser};
    pub use crate::reactor::{Reactor, TimerId};
    pub use crate::siphon::{series, series_with, FountExt, Series, Siphon, SiphonConfig};
    pub use crate::tubes::{FnTube, Passthrough, Tube};
}
