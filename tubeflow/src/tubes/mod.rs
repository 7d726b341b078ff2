//! Tube trait and implementations.
//!
//! Tubes are the processing stages of a pipeline. A tube turns one input into
//! an [`Emission`]: zero or more outputs, each available now or pending.
//! Tubes never wait for their own pending outputs; the siphon wrapping the
//! tube takes care of ordering and backpressure.

use crate::core::{Emission, StopReason};
use std::fmt::Debug;

/// Trait for pipeline stages.
pub trait Tube: Send + 'static {
    /// The type received from upstream.
    type Input: Send + 'static;
    /// The type delivered downstream.
    type Output: Send + 'static;

    /// Returns the name of the tube, used in logs and events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Produces the outputs for one input.
    fn received(&mut self, item: Self::Input) -> Emission<Self::Output>;

    /// Produces outputs when the tube is first connected to its upstream.
    fn started(&mut self) -> Emission<Self::Output> {
        Emission::empty()
    }

    /// Produces final outputs when the upstream flow ends.
    fn stopped(&mut self, _reason: &StopReason) -> Emission<Self::Output> {
        Emission::empty()
    }
}

/// A closure-based tube.
pub struct FnTube<I, O, F>
where
    F: FnMut(I) -> Emission<O> + Send + 'static,
{
    name: String,
    func: F,
    _types: std::marker::PhantomData<fn(I) -> O>,
}

impl<I, O, F> FnTube<I, O, F>
where
    F: FnMut(I) -> Emission<O> + Send + 'static,
{
    /// Creates a new closure-based tube.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _types: std::marker::PhantomData,
        }
    }
}

impl<I, O, F> Debug for FnTube<I, O, F>
where
    F: FnMut(I) -> Emission<O> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTube").field("name", &self.name).finish()
    }
}

impl<I, O, F> Tube for FnTube<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Emission<O> + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn received(&mut self, item: I) -> Emission<O> {
        (self.func)(item)
    }
}

/// A tube that passes every input through unchanged.
pub struct Passthrough<T> {
    _type: std::marker::PhantomData<fn(T) -> T>,
}

impl<T> Passthrough<T> {
    /// Creates a passthrough tube.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _type: std::marker::PhantomData,
        }
    }
}

impl<T> Default for Passthrough<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Passthrough<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passthrough")
    }
}

impl<T: Send + 'static> Tube for Passthrough<T> {
    type Input = T;
    type Output = T;

    fn name(&self) -> &str {
        "passthrough"
    }

    fn received(&mut self, item: T) -> Emission<T> {
        Emission::item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Output;

    fn collect<T>(emission: Emission<T>) -> Vec<T> {
        emission
            .map(|unit| match unit {
                Ok(Output::Item(value)) => value,
                _ => panic!("expected a plain item"),
            })
            .collect()
    }

    #[test]
    fn test_fn_tube() {
        let mut tube = FnTube::new("reverse", |data: String| {
            Emission::item(data.chars().rev().collect::<String>())
        });

        assert_eq!(tube.name(), "reverse");
        assert_eq!(collect(tube.received("hello".to_string())), vec!["olleh"]);
    }

    #[test]
    fn test_fn_tube_keeps_state() {
        let mut seen = 0;
        let mut tube = FnTube::new("count", move |_: ()| {
            seen += 1;
            Emission::item(seen)
        });

        assert_eq!(collect(tube.received(())), vec![1]);
        assert_eq!(collect(tube.received(())), vec![2]);
    }

    #[test]
    fn test_default_hooks_are_empty() {
        let mut tube = Passthrough::<u8>::new();

        assert!(tube.started().next().is_none());
        assert!(tube.stopped(&StopReason::Finished).next().is_none());
        assert_eq!(collect(tube.received(9)), vec![9]);
    }
}
