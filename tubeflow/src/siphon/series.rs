//! Composing tubes into a pipeline.

use std::sync::Arc;

use super::adapter::Siphon;
use super::config::SiphonConfig;
use crate::events::{EventSink, NoOpEventSink};
use crate::flow::{Drain, Fount};
use crate::tubes::Tube;

/// A chain of siphons with one entry and one exit.
///
/// Items enter through [`Series::drain`] and leave, in order, through
/// [`Series::fount`]. Pausing the exit pauses every siphon up the chain and
/// finally the fount feeding the entry.
pub struct Series<I, O> {
    drain: Arc<dyn Drain<I>>,
    fount: Arc<dyn Fount<O>>,
    stages: Vec<String>,
}

/// Wraps `tube` in a siphon with default settings.
pub fn series<Tb: Tube>(tube: Tb) -> Series<Tb::Input, Tb::Output> {
    series_with(tube, SiphonConfig::default(), Arc::new(NoOpEventSink))
}

/// Wraps `tube` in a siphon with explicit settings.
pub fn series_with<Tb: Tube>(
    tube: Tb,
    config: SiphonConfig,
    events: Arc<dyn EventSink>,
) -> Series<Tb::Input, Tb::Output> {
    let siphon = Siphon::with_config(tube, config, events);
    Series {
        stages: vec![siphon.name().to_string()],
        drain: Arc::clone(&siphon) as Arc<dyn Drain<Tb::Input>>,
        fount: siphon,
    }
}

impl<I: Send + 'static, O: Send + 'static> Series<I, O> {
    /// Appends a tube after the current exit.
    #[must_use]
    pub fn then<Tb: Tube<Input = O>>(self, tube: Tb) -> Series<I, Tb::Output> {
        self.then_with(tube, SiphonConfig::default(), Arc::new(NoOpEventSink))
    }

    /// Appends a tube with explicit settings.
    #[must_use]
    pub fn then_with<Tb: Tube<Input = O>>(
        self,
        tube: Tb,
        config: SiphonConfig,
        events: Arc<dyn EventSink>,
    ) -> Series<I, Tb::Output> {
        let next = series_with(tube, config, events);
        Arc::clone(&self.fount).flow_to(next.drain);
        let mut stages = self.stages;
        stages.extend(next.stages);
        Series {
            drain: self.drain,
            fount: next.fount,
            stages,
        }
    }

    /// Returns the entry of the chain.
    #[must_use]
    pub fn drain(&self) -> Arc<dyn Drain<I>> {
        Arc::clone(&self.drain)
    }

    /// Returns the exit of the chain.
    #[must_use]
    pub fn fount(&self) -> Arc<dyn Fount<O>> {
        Arc::clone(&self.fount)
    }

    /// Returns the stage names, entry first.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Connects the exit of the chain to `drain`.
    pub fn flow_to(&self, drain: Arc<dyn Drain<O>>) {
        self.fount().flow_to(drain);
    }
}

/// Connecting a fount to a series.
pub trait FountExt<T> {
    /// Flows into the series' entry and returns its exit.
    fn flow_into<O: Send + 'static>(self, series: &Series<T, O>) -> Arc<dyn Fount<O>>;
}

impl<T, F> FountExt<T> for Arc<F>
where
    T: Send + 'static,
    F: Fount<T> + ?Sized,
{
    fn flow_into<O: Send + 'static>(self, series: &Series<T, O>) -> Arc<dyn Fount<O>> {
        self.flow_to(series.drain());
        series.fount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Emission;
    use crate::testing::{FakeDrain, FakeFount};
    use crate::tubes::FnTube;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_stage_series() {
        let fount = FakeFount::<String>::new();
        let drain = FakeDrain::<usize>::new();
        let pipeline = series(FnTube::new("split", |line: String| {
            Emission::items(
                line.split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
            )
        }))
        .then(FnTube::new("len", |word: String| Emission::item(word.len())));

        assert_eq!(pipeline.stages(), ["split", "len"]);

        fount.clone().flow_into(&pipeline).flow_to(drain.clone());
        fount.push("a bb ccc".to_string());

        assert_eq!(drain.received(), vec![1, 2, 3]);
    }

    #[test]
    fn test_pause_reaches_first_fount() {
        let fount = FakeFount::<u32>::new();
        let drain = FakeDrain::<u32>::new();
        let pipeline = series(FnTube::new("double", |n: u32| Emission::item(n * 2)))
            .then(FnTube::new("inc", |n: u32| Emission::item(n + 1)));
        fount.clone().flow_into(&pipeline).flow_to(drain.clone());

        let pause = drain.pause_fount();
        assert!(fount.is_paused());

        pause.unpause();
        assert!(!fount.is_paused());

        fount.push(4);
        assert_eq!(drain.received(), vec![9]);
    }
}
