//! Delivery state of a siphon and the decision of what to do next.
//!
//! The state never calls out. [`DeliveryState::next_step`] decides the next
//! action under the siphon's lock and hands back everything the action needs,
//! so the siphon can perform it with the lock released.

use crate::core::{Emission, StopReason};
use crate::errors::FlowError;
use crate::flow::{Drain, Fount, Pause};
use std::collections::VecDeque;
use std::sync::Arc;

/// A result waiting for its turn to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Held<T> {
    Item(T),
    Failure(FlowError),
}

/// What the pump does next.
pub(crate) enum Step<I, O> {
    /// Hand an item to the drain.
    Deliver(Arc<dyn Drain<O>>, O),
    /// End the run with a failure.
    Fail(Terminal<I, O>, FlowError),
    /// Pull the next unit from the current emission.
    Pull(Emission<O>),
    /// Run the tube on the next queued input.
    Invoke(I),
    /// Run the tube's `stopped` hook.
    Stop(StopReason),
    /// Forward the end of the flow downstream.
    Finish(Terminal<I, O>, StopReason),
    /// Nothing to do until something external happens.
    Rest(Rest<I>),
}

/// Everything released when a run ends.
pub(crate) struct Terminal<I, O> {
    pub downstream: Option<Arc<dyn Drain<O>>>,
    pub upstream: Option<Arc<dyn Fount<I>>>,
    pub pauses: Vec<Pause>,
}

/// Upstream bookkeeping to do once the pump stops.
pub(crate) struct Rest<I> {
    /// Pause this fount: work is outstanding.
    pub acquire: Option<Arc<dyn Fount<I>>>,
    /// Release this pause: ready for the next input.
    pub release: Option<Pause>,
}

pub(crate) struct DeliveryState<I, O> {
    pub upstream: Option<Arc<dyn Fount<I>>>,
    pub downstream: Option<Arc<dyn Drain<O>>>,
    pub emission: Option<Emission<O>>,
    /// Token of the pending unit being waited on.
    pub awaiting: Option<u64>,
    next_token: u64,
    pub held: VecDeque<Held<O>>,
    pub inputs: VecDeque<I>,
    pub paused: bool,
    pub pumping: bool,
    pub started: bool,
    pub upstream_stop: Option<StopReason>,
    /// Set while the `stopped` emission drains.
    pub stopping: Option<StopReason>,
    pub terminated: bool,
    /// Pause on upstream held while work is outstanding.
    pub busy_pause: Option<Pause>,
    /// Pause on upstream held while downstream is paused.
    pub downstream_pause: Option<Pause>,
}

impl<I, O> Default for DeliveryState<I, O> {
    fn default() -> Self {
        Self {
            upstream: None,
            downstream: None,
            emission: None,
            awaiting: None,
            next_token: 0,
            held: VecDeque::new(),
            inputs: VecDeque::new(),
            paused: false,
            pumping: false,
            started: false,
            upstream_stop: None,
            stopping: None,
            terminated: false,
            busy_pause: None,
            downstream_pause: None,
        }
    }
}

impl<I, O> DeliveryState<I, O> {
    /// Returns true when no emission, pending unit or held result remains.
    pub fn is_idle(&self) -> bool {
        self.emission.is_none() && self.awaiting.is_none() && self.held.is_empty()
    }

    /// Starts waiting on a pending unit and returns its token.
    pub fn await_pending(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.awaiting = Some(token);
        token
    }

    /// Accepts the resolution for `token`.
    ///
    /// Returns false for a stale token: the run ended or moved on.
    pub fn settle(&mut self, token: u64, result: Result<O, FlowError>) -> bool {
        if self.terminated || self.awaiting != Some(token) {
            return false;
        }
        self.awaiting = None;
        match result {
            Ok(value) => self.held.push_back(Held::Item(value)),
            Err(err) => {
                self.emission = None;
                self.held.push_back(Held::Failure(err));
            }
        }
        true
    }

    /// Ends the run, discarding everything not yet delivered.
    ///
    /// The links to both neighbours move into the returned [`Terminal`],
    /// so a finished siphon no longer keeps them alive.
    pub fn terminate(&mut self) -> Terminal<I, O> {
        self.terminated = true;
        self.emission = None;
        self.awaiting = None;
        self.held.clear();
        self.inputs.clear();
        self.upstream_stop = None;
        self.stopping = None;
        Terminal {
            downstream: self.downstream.take(),
            upstream: self.upstream.take(),
            pauses: self
                .busy_pause
                .take()
                .into_iter()
                .chain(self.downstream_pause.take())
                .collect(),
        }
    }

    fn rest(&mut self) -> Step<I, O> {
        self.pumping = false;
        if self.terminated {
            return Step::Rest(Rest {
                acquire: None,
                release: None,
            });
        }
        let busy = !self.is_idle() || !self.inputs.is_empty();
        let acquire = if busy && self.busy_pause.is_none() {
            self.upstream.clone()
        } else {
            None
        };
        let release = if busy { None } else { self.busy_pause.take() };
        Step::Rest(Rest { acquire, release })
    }

    /// Decides the next action; clears `pumping` when it returns `Rest`.
    pub fn next_step(&mut self) -> Step<I, O> {
        if self.terminated {
            return self.rest();
        }
        if let (false, Some(drain)) = (self.paused, self.downstream.clone()) {
            match self.held.pop_front() {
                Some(Held::Item(value)) => return Step::Deliver(drain, value),
                Some(Held::Failure(err)) => return Step::Fail(self.terminate(), err),
                None => {}
            }
        }
        if self.awaiting.is_some() {
            return self.rest();
        }
        if let Some(emission) = self.emission.take() {
            return Step::Pull(emission);
        }
        if !self.held.is_empty() {
            return self.rest();
        }
        if let Some(input) = self.inputs.pop_front() {
            return Step::Invoke(input);
        }
        if let Some(reason) = self.upstream_stop.take() {
            self.stopping = Some(reason.clone());
            return Step::Stop(reason);
        }
        if self.stopping.is_some() && self.downstream.is_some() {
            if let Some(reason) = self.stopping.take() {
                return Step::Finish(self.terminate(), reason);
            }
        }
        self.rest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Output;
    use crate::testing::FakeDrain;

    fn state() -> DeliveryState<u32, u32> {
        let mut state = DeliveryState::default();
        state.downstream = Some(FakeDrain::new() as Arc<dyn Drain<u32>>);
        state
    }

    fn delivered(step: Step<u32, u32>) -> Option<u32> {
        match step {
            Step::Deliver(_, value) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn test_held_items_delivered_fifo() {
        let mut state = state();
        state.held.push_back(Held::Item(1));
        state.held.push_back(Held::Item(2));

        assert_eq!(delivered(state.next_step()), Some(1));
        assert_eq!(delivered(state.next_step()), Some(2));
        assert!(matches!(state.next_step(), Step::Rest(_)));
        assert!(!state.pumping);
    }

    #[test]
    fn test_paused_state_holds() {
        let mut state = state();
        state.paused = true;
        state.held.push_back(Held::Item(1));

        assert!(matches!(state.next_step(), Step::Rest(_)));
        assert_eq!(state.held.len(), 1);
    }

    #[test]
    fn test_awaiting_blocks_pull() {
        let mut state = state();
        state.emission = Some(Emission::item(5));
        let token = state.await_pending();

        assert!(matches!(state.next_step(), Step::Rest(_)));

        assert!(state.settle(token, Ok(4)));
        assert_eq!(delivered(state.next_step()), Some(4));
        assert!(matches!(state.next_step(), Step::Pull(_)));
    }

    #[test]
    fn test_stale_token_ignored() {
        let mut state = state();
        let old = state.await_pending();
        state.settle(old, Ok(1));
        let current = state.await_pending();

        assert!(!state.settle(old, Ok(2)));
        assert!(state.settle(current, Ok(3)));
        assert_eq!(state.held, VecDeque::from(vec![Held::Item(1), Held::Item(3)]));
    }

    #[test]
    fn test_failure_discards_remaining_emission() {
        let mut state = state();
        state.emission = Some(Emission::from_outputs(vec![Output::Item(9)]));
        let token = state.await_pending();

        state.settle(token, Err(FlowError::resolution("lost")));
        assert!(state.emission.is_none());

        match state.next_step() {
            Step::Fail(terminal, err) => {
                assert_eq!(err, FlowError::resolution("lost"));
                assert!(terminal.downstream.is_some());
            }
            _ => panic!("expected failure"),
        }
        assert!(state.terminated);
        assert!(state.downstream.is_none());
    }

    #[test]
    fn test_next_input_waits_for_idle() {
        let mut state = state();
        state.paused = true;
        state.held.push_back(Held::Item(1));
        state.inputs.push_back(7);

        assert!(matches!(state.next_step(), Step::Rest(_)));

        state.paused = false;
        assert_eq!(delivered(state.next_step()), Some(1));
        assert!(matches!(state.next_step(), Step::Invoke(7)));
    }

    #[test]
    fn test_stop_after_inputs() {
        let mut state = state();
        state.inputs.push_back(1);
        state.upstream_stop = Some(StopReason::Finished);

        assert!(matches!(state.next_step(), Step::Invoke(1)));
        assert!(matches!(state.next_step(), Step::Stop(StopReason::Finished)));
        assert!(matches!(state.next_step(), Step::Finish(_, StopReason::Finished)));
        assert!(state.terminated);
        assert!(state.downstream.is_none() && state.upstream.is_none());
    }
}
