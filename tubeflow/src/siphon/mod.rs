//! Siphons: ordering and backpressure around a tube.
//!
//! This module provides:
//! - [`Siphon`], which runs a tube and delivers its outputs in order,
//!   awaiting pending outputs and buffering while downstream is paused
//! - [`Series`] for chaining tubes into a pipeline
//! - [`SiphonConfig`] for naming, buffer warnings and event emission

mod adapter;
mod config;
mod series;
mod state;

pub use adapter::Siphon;
pub use config::SiphonConfig;
pub use series::{series, series_with, FountExt, Series};
