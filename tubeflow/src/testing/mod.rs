//! Testing utilities for tubeflow pipelines.
//!
//! This module provides:
//! - A fake fount that records pauses and stops
//! - A fake drain that collects items and can pause its fount
//! - Tracing setup for tests

mod fakes;

pub use fakes::{FakeDrain, FakeFount};

/// Installs a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
