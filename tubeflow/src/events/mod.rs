//! Flow events and metrics for observability.
//!
//! Siphons report what they do through an [`EventSink`] and keep running
//! totals in [`FlowMetrics`]. Both are optional: the default sink discards
//! everything.

mod metrics;
mod sink;

pub use metrics::FlowMetrics;
pub use sink::{CollectingEventSink, EventSink, FlowEvent, LoggingEventSink, NoOpEventSink};
