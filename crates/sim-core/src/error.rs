use crate::Tick;
use thiserror::Error;

/// Recoverable domain failures raised inside action handlers.
///
/// Every variant is surfaced to the caller as an `error` outcome; none of them
/// escapes the public action or advance interface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    /// Referenced entity or event identifier does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Entity exists but becomes available later.
    #[error("{kind} {id} is not available until tick {available}")]
    NotYetAvailable {
        kind: &'static str,
        id: String,
        available: Tick,
    },
    /// Malformed or out-of-domain parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Action would overdraw a bounded resource.
    #[error("insufficient {resource}: need {needed}, have {available}")]
    InsufficientResource {
        resource: &'static str,
        needed: String,
        available: String,
    },
    /// The horizon has been reached.
    #[error("simulation is complete")]
    AlreadyComplete,
}

impl ActionError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ActionError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ActionError::InvalidInput(msg.into())
    }

    pub fn insufficient(
        resource: &'static str,
        needed: impl ToString,
        available: impl ToString,
    ) -> Self {
        ActionError::InsufficientResource {
            resource,
            needed: needed.to_string(),
            available: available.to_string(),
        }
    }
}

/// Contract violations: these are programming errors, not domain outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::CorruptSnapshot(e.to_string())
    }
}
