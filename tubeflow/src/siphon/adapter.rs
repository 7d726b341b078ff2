//! The siphon: a tube wrapped with ordering and backpressure.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::SiphonConfig;
use super::state::{DeliveryState, Held, Rest, Step, Terminal};
use crate::core::{Deferred, Emission, Output, StopReason};
use crate::errors::{FlowError, FlowResult};
use crate::events::{EventSink, FlowEvent, FlowMetrics, NoOpEventSink};
use crate::flow::{Drain, Fount, Pause, Pauser};
use crate::tubes::Tube;

/// A tube placed in a flow.
///
/// As a [`Drain`] it receives inputs and runs the tube on them one at a time.
/// As a [`Fount`] it delivers the tube's outputs in the order the tube
/// produced them. Pending outputs are awaited in place: nothing behind a
/// pending output is pulled or delivered until it resolves. While the
/// downstream drain holds a pause, resolved outputs are buffered and flushed
/// in order when the last pause is released.
///
/// Upstream is paused while outputs are outstanding and while downstream is
/// paused, so a well behaved fount never delivers a second input before the
/// first one is fully delivered.
pub struct Siphon<Tb: Tube> {
    id: Uuid,
    name: String,
    config: SiphonConfig,
    tube: Mutex<Tb>,
    state: Mutex<DeliveryState<Tb::Input, Tb::Output>>,
    pauser: Pauser,
    metrics: FlowMetrics,
    events: Arc<dyn EventSink>,
    me: Weak<Self>,
}

impl<Tb: Tube> Siphon<Tb> {
    /// Creates a siphon with default settings.
    pub fn new(tube: Tb) -> Arc<Self> {
        Self::with_config(tube, SiphonConfig::default(), Arc::new(NoOpEventSink))
    }

    /// Creates a siphon with explicit settings and event sink.
    pub fn with_config(tube: Tb, config: SiphonConfig, events: Arc<dyn EventSink>) -> Arc<Self> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| tube.name().to_string());
        Arc::new_cyclic(|me: &Weak<Self>| {
            let on_pause = me.clone();
            let on_resume = me.clone();
            Self {
                id: Uuid::new_v4(),
                name,
                config,
                tube: Mutex::new(tube),
                state: Mutex::new(DeliveryState::default()),
                pauser: Pauser::new(
                    move || {
                        if let Some(siphon) = on_pause.upgrade() {
                            siphon.downstream_paused();
                        }
                    },
                    move || {
                        if let Some(siphon) = on_resume.upgrade() {
                            siphon.downstream_resumed();
                        }
                    },
                ),
                metrics: FlowMetrics::default(),
                events,
                me: me.clone(),
            }
        })
    }

    /// Returns the siphon's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the siphon's instance id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the siphon's counters.
    pub fn metrics(&self) -> &FlowMetrics {
        &self.metrics
    }

    /// Returns true while the downstream drain holds a pause.
    pub fn is_paused(&self) -> bool {
        self.pauser.is_paused()
    }

    /// Returns true while waiting for a pending output.
    pub fn is_awaiting(&self) -> bool {
        self.state.lock().awaiting.is_some()
    }

    /// Returns the number of results waiting to be delivered.
    pub fn held_len(&self) -> usize {
        self.state.lock().held.len()
    }

    /// Returns true once the flow through this siphon has ended.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        if self.config.emit_events {
            self.events
                .try_emit(FlowEvent::new(event_type, self.name.as_str(), self.id, data));
        }
    }

    /// Runs steps until nothing is left to do.
    ///
    /// Re-entrant calls return immediately; the running loop picks up
    /// whatever they changed.
    fn pump(&self) {
        {
            let mut state = self.state.lock();
            if state.pumping {
                return;
            }
            state.pumping = true;
        }
        loop {
            let step = self.state.lock().next_step();
            match step {
                Step::Deliver(drain, item) => {
                    drain.receive(item);
                    self.metrics.record_delivered();
                    self.emit("siphon.delivered", serde_json::Value::Null);
                }
                Step::Pull(emission) => self.pull(emission),
                Step::Invoke(input) => {
                    let emission = self.tube.lock().received(input);
                    self.state.lock().emission = Some(emission);
                }
                Step::Stop(reason) => {
                    debug!(siphon = %self.name, %reason, "Upstream stopped");
                    let emission = self.tube.lock().stopped(&reason);
                    self.state.lock().emission = Some(emission);
                }
                Step::Fail(terminal, err) => {
                    self.fail(terminal, err);
                    return;
                }
                Step::Finish(terminal, reason) => {
                    self.finish(terminal, reason);
                    return;
                }
                Step::Rest(rest) => {
                    self.rest(rest);
                    return;
                }
            }
        }
    }

    /// Pulls one unit out of `emission`.
    fn pull(&self, mut emission: Emission<Tb::Output>) {
        let unit = emission.next();
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        match unit {
            None => {}
            Some(Ok(Output::Item(value))) => {
                state.emission = Some(emission);
                self.hold(&mut state, Held::Item(value));
            }
            Some(Ok(Output::Pending(deferred))) => {
                state.emission = Some(emission);
                let token = state.await_pending();
                drop(state);
                self.observe(token, &deferred);
            }
            Some(Err(err)) => {
                warn!(siphon = %self.name, error = %err, "Tube failed");
                self.hold(&mut state, Held::Failure(err));
            }
        }
    }

    fn hold(&self, state: &mut DeliveryState<Tb::Input, Tb::Output>, held: Held<Tb::Output>) {
        let blocked = state.paused || state.downstream.is_none() || !state.held.is_empty();
        state.held.push_back(held);
        if blocked {
            let len = state.held.len();
            self.metrics.record_held(len);
            if self.config.buffer_warn_threshold.checked_add(1) == Some(len) {
                warn!(
                    siphon = %self.name,
                    held = len,
                    threshold = self.config.buffer_warn_threshold,
                    "Siphon buffer above threshold"
                );
            }
            self.emit("siphon.held", serde_json::json!({ "held": len }));
        }
    }

    /// Registers the resolution callback for the pending unit `token`.
    fn observe(&self, token: u64, deferred: &Deferred<Tb::Output>) {
        let me = self.me.clone();
        let registered = deferred.on_resolved(move |result| {
            if let Some(siphon) = me.upgrade() {
                siphon.resolved(token, result);
            }
        });
        if let Err(err) = registered {
            self.resolved(token, Err(err));
        }
    }

    fn resolved(&self, token: u64, result: FlowResult<Tb::Output>) {
        let accepted = {
            let mut state = self.state.lock();
            let blocked = state.paused || state.downstream.is_none() || !state.held.is_empty();
            let accepted = state.settle(token, result);
            if accepted && blocked {
                let len = state.held.len();
                self.metrics.record_held(len);
                self.emit("siphon.held", serde_json::json!({ "held": len }));
            }
            accepted
        };
        if accepted {
            self.metrics.record_resolved();
            self.pump();
        } else {
            debug!(siphon = %self.name, token, "Ignoring stale resolution");
        }
    }

    fn fail(&self, terminal: Terminal<Tb::Input, Tb::Output>, err: FlowError) {
        warn!(siphon = %self.name, siphon_id = %self.id, error = %err, "Flow failed");
        self.metrics.record_failed();
        self.emit("siphon.failed", serde_json::json!({ "error": err.to_dict() }));
        if let Some(upstream) = &terminal.upstream {
            upstream.stop_flow();
        }
        if let Some(downstream) = &terminal.downstream {
            downstream.flow_stopped(StopReason::Failed(err));
        }
        drop(terminal.pauses);
    }

    fn finish(&self, terminal: Terminal<Tb::Input, Tb::Output>, reason: StopReason) {
        debug!(siphon = %self.name, %reason, "Flow finished");
        self.emit("siphon.finished", serde_json::json!({ "reason": reason.to_string() }));
        if let Some(downstream) = &terminal.downstream {
            downstream.flow_stopped(reason);
        }
        drop(terminal.pauses);
    }

    fn rest(&self, rest: Rest<Tb::Input>) {
        drop(rest.release);
        let Some(upstream) = rest.acquire else {
            return;
        };
        let pause = upstream.pause_flow();
        let unused = {
            let mut state = self.state.lock();
            let busy = !state.is_idle() || !state.inputs.is_empty();
            if busy && !state.terminated && state.busy_pause.is_none() {
                state.busy_pause = Some(pause);
                None
            } else {
                Some(pause)
            }
        };
        drop(unused);
    }

    fn downstream_paused(&self) {
        let upstream = {
            let mut state = self.state.lock();
            state.paused = true;
            if state.downstream_pause.is_none() && !state.terminated {
                state.upstream.clone()
            } else {
                None
            }
        };
        debug!(siphon = %self.name, "Downstream paused");
        if let Some(upstream) = upstream {
            self.forward_pause(&upstream);
        }
    }

    fn forward_pause(&self, upstream: &Arc<dyn Fount<Tb::Input>>) {
        let pause = upstream.pause_flow();
        let unused = {
            let mut state = self.state.lock();
            if state.paused && !state.terminated && state.downstream_pause.is_none() {
                state.downstream_pause = Some(pause);
                None
            } else {
                Some(pause)
            }
        };
        drop(unused);
    }

    fn downstream_resumed(&self) {
        self.state.lock().paused = false;
        debug!(siphon = %self.name, "Downstream resumed");
        self.pump();
        let released = {
            let mut state = self.state.lock();
            if state.paused {
                None
            } else {
                state.downstream_pause.take()
            }
        };
        drop(released);
    }
}

impl<Tb: Tube> Drain<Tb::Input> for Siphon<Tb> {
    fn flowing_from(&self, fount: Arc<dyn Fount<Tb::Input>>) {
        let (first, forward) = {
            let mut state = self.state.lock();
            if state.terminated {
                debug!(siphon = %self.name, "Ignoring upstream connected after the flow ended");
                return;
            }
            state.upstream = Some(Arc::clone(&fount));
            let first = !std::mem::replace(&mut state.started, true);
            (first, state.paused && state.downstream_pause.is_none())
        };
        if forward {
            self.forward_pause(&fount);
        }
        if first {
            let started = self.tube.lock().started();
            let mut state = self.state.lock();
            state.emission = Some(match state.emission.take() {
                Some(current) => current.then(move || started),
                None => started,
            });
        }
        self.pump();
    }

    fn receive(&self, item: Tb::Input) {
        {
            let mut state = self.state.lock();
            if state.terminated {
                warn!(siphon = %self.name, "Input received after the flow ended; dropping it");
                return;
            }
            state.inputs.push_back(item);
        }
        self.pump();
    }

    fn flow_stopped(&self, reason: StopReason) {
        {
            let mut state = self.state.lock();
            if state.terminated || state.upstream_stop.is_some() || state.stopping.is_some() {
                return;
            }
            state.upstream_stop = Some(reason);
        }
        self.pump();
    }
}

impl<Tb: Tube> Fount<Tb::Output> for Siphon<Tb> {
    fn flow_to(self: Arc<Self>, drain: Arc<dyn Drain<Tb::Output>>) {
        {
            let mut state = self.state.lock();
            if state.terminated {
                debug!(siphon = %self.name, "Ignoring downstream connected after the flow ended");
                return;
            }
            state.downstream = Some(Arc::clone(&drain));
        }
        drain.flowing_from(Arc::clone(&self) as Arc<dyn Fount<Tb::Output>>);
        self.pump();
    }

    fn pause_flow(&self) -> Pause {
        self.pauser.pause()
    }

    fn stop_flow(&self) {
        let terminal = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.terminate()
        };
        debug!(siphon = %self.name, "Stopped by downstream");
        self.emit("siphon.stopped", serde_json::Value::Null);
        if let Some(upstream) = &terminal.upstream {
            upstream.stop_flow();
        }
        drop(terminal.pauses);
    }
}
