//! Event sink trait and implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, Level};
use uuid::Uuid;

/// Something a siphon did.
#[derive(Debug, Clone, Serialize)]
pub struct FlowEvent {
    /// Event type, e.g. `siphon.delivered`.
    pub event_type: String,
    /// Name of the siphon that emitted the event.
    pub siphon: String,
    /// Identity of the siphon instance.
    pub siphon_id: Uuid,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Event specific fields.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl FlowEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        siphon: impl Into<String>,
        siphon_id: Uuid,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            siphon: siphon.into(),
            siphon_id,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Trait for sinks receiving flow events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: FlowEvent);

    /// Emits an event without blocking.
    ///
    /// Siphons call this from inside delivery, so it must never fail or
    /// call back into the pipeline.
    fn try_emit(&self, event: FlowEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: FlowEvent) {}

    fn try_emit(&self, _event: FlowEvent) {}
}

/// A sink that writes events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink for the given level.
    ///
    /// Levels other than `INFO` log at `DEBUG`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    fn log_event(&self, event: &FlowEvent) {
        if self.level == Level::INFO {
            info!(
                event_type = %event.event_type,
                siphon = %event.siphon,
                siphon_id = %event.siphon_id,
                data = %event.data,
                "Flow event"
            );
        } else {
            debug!(
                event_type = %event.event_type,
                siphon = %event.siphon,
                siphon_id = %event.siphon_id,
                data = %event.data,
                "Flow event"
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }
}

/// A sink that keeps every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<FlowEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Returns events whose type starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<FlowEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }
}
