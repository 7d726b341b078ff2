//! Siphon configuration.

use serde::{Deserialize, Serialize};

/// Per-siphon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiphonConfig {
    /// Name used in logs and events; defaults to the tube's name.
    pub name: Option<String>,
    /// Buffer length above which a warning is logged.
    pub buffer_warn_threshold: usize,
    /// Whether to emit flow events to the event sink.
    pub emit_events: bool,
}

impl Default for SiphonConfig {
    fn default() -> Self {
        Self {
            name: None,
            buffer_warn_threshold: 1024,
            emit_events: true,
        }
    }
}

impl SiphonConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the buffer warning threshold.
    #[must_use]
    pub fn with_buffer_warn_threshold(mut self, threshold: usize) -> Self {
        self.buffer_warn_threshold = threshold;
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SiphonConfig::new()
            .with_name("reverse")
            .with_buffer_warn_threshold(8)
            .with_events(false);

        assert_eq!(config.name.as_deref(), Some("reverse"));
        assert_eq!(config.buffer_warn_threshold, 8);
        assert!(!config.emit_events);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: SiphonConfig =
            serde_json::from_value(serde_json::json!({"name": "fetch"})).unwrap();

        assert_eq!(config.name.as_deref(), Some("fetch"));
        assert_eq!(config.buffer_warn_threshold, 1024);
        assert!(config.emit_events);
    }
}
