//! Error types for the tubeflow framework.
//!
//! Every failure that travels through a pipeline is a [`FlowError`]. It is
//! `Clone` so a single failure can be recorded in metrics, emitted as an
//! event and forwarded downstream as the terminal stop reason.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for tubeflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A tube failed while producing its output sequence.
    #[error("Tube '{tube}' failed: {message}")]
    Tube {
        /// The tube name.
        tube: String,
        /// The failure message.
        message: String,
    },

    /// A pending value resolved with a failure.
    #[error("Pending value failed: {0}")]
    Resolution(String),

    /// A deferred was resolved more than once.
    #[error("Deferred already resolved")]
    AlreadyResolved,

    /// A second resolution callback was registered on a deferred.
    #[error("Deferred already has a resolution callback")]
    AlreadyObserved,

    /// A deferred was dropped by every producer before it resolved.
    #[error("Deferred abandoned before resolution")]
    Abandoned,

    /// The downstream drain asked the flow to stop.
    #[error("Flow stopped by downstream")]
    StopFlowCalled,

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Creates a tube failure.
    #[must_use]
    pub fn tube(tube: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tube {
            tube: tube.into(),
            message: message.into(),
        }
    }

    /// Creates a resolution failure.
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns a short, stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tube { .. } => "TubeFailed",
            Self::Resolution(_) => "ResolutionFailed",
            Self::AlreadyResolved => "AlreadyResolved",
            Self::AlreadyObserved => "AlreadyObserved",
            Self::Abandoned => "Abandoned",
            Self::StopFlowCalled => "StopFlowCalled",
            Self::Internal(_) => "Internal",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        if let Self::Tube { tube, .. } = self {
            map.insert("tube".to_string(), serde_json::json!(tube));
        }
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl From<anyhow::Error> for FlowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Result alias used by tubes and deferreds.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tube_error_display() {
        let err = FlowError::tube("reverse", "bad input");
        assert_eq!(err.to_string(), "Tube 'reverse' failed: bad input");
        assert_eq!(err.kind(), "TubeFailed");
    }

    #[test]
    fn test_error_to_dict() {
        let dict = FlowError::tube("reverse", "boom").to_dict();

        assert_eq!(dict.get("type").unwrap(), "TubeFailed");
        assert_eq!(dict.get("tube").unwrap(), "reverse");

        let dict = FlowError::resolution("timeout").to_dict();
        assert_eq!(dict.get("type").unwrap(), "ResolutionFailed");
        assert!(dict.get("tube").is_none());
    }

    #[test]
    fn test_from_anyhow_keeps_context() {
        let err = anyhow::anyhow!("socket closed").context("fetching page");
        let flow: FlowError = err.into();

        assert_eq!(flow, FlowError::internal("fetching page: socket closed"));
    }
}
