//! Core domain model types for tubeflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - Single-shot pending values
//! - Output units and the lazy emission a tube yields per input
//! - Flow stop reasons

mod deferred;
mod output;
mod status;

pub use deferred::{Deferred, DeferredFuture, ResolveCallback};
pub use output::{Emission, Output};
pub use status::StopReason;
