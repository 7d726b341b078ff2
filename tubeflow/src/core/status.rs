//! Flow termination reasons.

use crate::errors::FlowError;
use std::fmt;

/// Why a flow stopped.
///
/// Delivered exactly once to a drain through `Drain::flow_stopped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The fount ran out of data.
    Finished,
    /// The flow failed; nothing further is delivered.
    Failed(FlowError),
}

impl StopReason {
    /// Returns true if the flow ended normally.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&FlowError> {
        match self {
            Self::Finished => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl From<FlowError> for StopReason {
    fn from(err: FlowError) -> Self {
        Self::Failed(err)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_accessors() {
        assert!(StopReason::Finished.is_finished());
        assert!(StopReason::Finished.error().is_none());

        let reason = StopReason::from(FlowError::resolution("lost"));
        assert!(!reason.is_finished());
        assert_eq!(reason.error(), Some(&FlowError::resolution("lost")));
        assert_eq!(reason.to_string(), "failed: Pending value failed: lost");
    }
}
