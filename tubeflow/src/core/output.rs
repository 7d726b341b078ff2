//! Output units and the lazy emission sequence a tube produces per input.

use super::Deferred;
use crate::errors::{FlowError, FlowResult};
use std::fmt;

/// One unit yielded by a tube.
#[derive(Debug)]
pub enum Output<T> {
    /// A value available now.
    Item(T),
    /// A value that resolves later.
    Pending(Deferred<T>),
}

impl<T> Output<T> {
    /// Wraps a plain value.
    #[must_use]
    pub fn item(value: T) -> Self {
        Self::Item(value)
    }

    /// Wraps a pending value.
    #[must_use]
    pub fn pending(deferred: Deferred<T>) -> Self {
        Self::Pending(deferred)
    }

    /// Returns true for a pending unit.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

type BoxedUnits<T> = Box<dyn Iterator<Item = FlowResult<Output<T>>> + Send>;

/// The ordered, lazy output of one tube invocation.
///
/// Units are pulled one at a time. An `Err` element ends the sequence with a
/// failure; anything after it is never pulled.
pub struct Emission<T> {
    units: BoxedUnits<T>,
}

impl<T: Send + 'static> Emission<T> {
    /// Creates an emission from any sequence of unit results.
    pub fn new<I>(units: I) -> Self
    where
        I: IntoIterator<Item = FlowResult<Output<T>>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            units: Box::new(units.into_iter()),
        }
    }

    /// An emission with no units.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// An emission with a single unit.
    #[must_use]
    pub fn once(output: Output<T>) -> Self {
        Self::new(std::iter::once(Ok(output)))
    }

    /// A single plain value.
    #[must_use]
    pub fn item(value: T) -> Self {
        Self::once(Output::Item(value))
    }

    /// A single pending value.
    #[must_use]
    pub fn pending(deferred: Deferred<T>) -> Self {
        Self::once(Output::Pending(deferred))
    }

    /// An emission that fails before producing anything.
    #[must_use]
    pub fn failed(err: FlowError) -> Self {
        Self::new(std::iter::once(Err(err)))
    }

    /// An emission over already-built units.
    pub fn from_outputs<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = Output<T>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(outputs.into_iter().map(Ok))
    }

    /// An emission of plain values.
    pub fn items<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(values.into_iter().map(|value| Ok(Output::Item(value))))
    }

    /// Continues with the emission built by `rest` once this one is exhausted.
    ///
    /// `rest` runs only when the consumer pulls past the last unit of `self`,
    /// so code after a pending unit waits for that unit to be delivered.
    #[must_use]
    pub fn then<F>(self, rest: F) -> Self
    where
        F: FnOnce() -> Emission<T> + Send + 'static,
    {
        let tail = Continuation::Waiting(Box::new(rest));
        Self::new(self.chain(tail))
    }
}

impl<T> Iterator for Emission<T> {
    type Item = FlowResult<Output<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.units.next()
    }
}

impl<T> fmt::Debug for Emission<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emission").finish_non_exhaustive()
    }
}

enum Continuation<T> {
    Waiting(Box<dyn FnOnce() -> Emission<T> + Send>),
    Running(Emission<T>),
    Done,
}

impl<T> Iterator for Continuation<T> {
    type Item = FlowResult<Output<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(self, Self::Done) {
                Self::Waiting(build) => *self = Self::Running(build()),
                Self::Running(mut emission) => {
                    let unit = emission.next();
                    if unit.is_some() {
                        *self = Self::Running(emission);
                    }
                    return unit;
                }
                Self::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn plain(unit: Option<FlowResult<Output<u32>>>) -> Option<u32> {
        match unit {
            Some(Ok(Output::Item(value))) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn test_items_in_order() {
        let mut emission = Emission::items(vec![1, 2, 3]);
        assert_eq!(plain(emission.next()), Some(1));
        assert_eq!(plain(emission.next()), Some(2));
        assert_eq!(plain(emission.next()), Some(3));
        assert!(emission.next().is_none());
    }

    #[test]
    fn test_then_is_lazy() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let mut emission = Emission::item(1).then(move || {
            flag.store(true, Ordering::SeqCst);
            Emission::item(2)
        });

        assert_eq!(plain(emission.next()), Some(1));
        assert!(!ran.load(Ordering::SeqCst));

        assert_eq!(plain(emission.next()), Some(2));
        assert!(ran.load(Ordering::SeqCst));
        assert!(emission.next().is_none());
    }

    #[test]
    fn test_pending_unit() {
        let mut emission = Emission::<u32>::pending(Deferred::new());
        let unit = emission.next().unwrap().unwrap();
        assert!(unit.is_pending());
    }

    #[test]
    fn test_failed_emission() {
        let mut emission = Emission::<u32>::failed(FlowError::tube("t", "broken"));
        assert!(matches!(emission.next(), Some(Err(FlowError::Tube { .. }))));
        assert!(emission.next().is_none());
    }
}
