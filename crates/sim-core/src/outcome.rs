use crate::ActionError;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Success payload: a flat JSON object of action-specific fields.
pub type Payload = serde_json::Map<String, Value>;

/// Converts a JSON object into a payload; any other value lands under `value`.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Payload::new();
            map.insert("value".into(), other);
            map
        }
    }
}

/// Serializes a struct into a payload.
pub fn payload_of<T: Serialize>(value: &T) -> Payload {
    serde_json::to_value(value).map(payload).unwrap_or_default()
}

/// Result of dispatching an action.
///
/// Serializes to exactly one of `{"error": ..}`, `{"blocked": true, "message": ..}`,
/// `{"info": ..}` or the success payload itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Error(String),
    Blocked(String),
    Info(String),
    Success(Payload),
}

impl Outcome {
    pub fn error(msg: impl Into<String>) -> Self {
        Outcome::Error(msg.into())
    }

    pub fn blocked(msg: impl Into<String>) -> Self {
        Outcome::Blocked(msg.into())
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Outcome::Info(msg.into())
    }

    /// Wraps a JSON object as a success payload. Non-object values land under `result`.
    pub fn success(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                debug_assert!(
                    !["error", "blocked", "info"]
                        .iter()
                        .any(|k| map.contains_key(*k)),
                    "success payload uses a reserved outcome key"
                );
                Outcome::Success(map)
            }
            other => {
                let mut map = Payload::new();
                map.insert("result".into(), other);
                Outcome::Success(map)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Error(_) => "error",
            Outcome::Blocked(_) => "blocked",
            Outcome::Info(_) => "info",
            Outcome::Success(_) => "success",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked(_))
    }

    pub fn is_info(&self) -> bool {
        matches!(self, Outcome::Info(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Success(p) => Some(p),
            _ => None,
        }
    }

    /// Field of a success payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload().and_then(|p| p.get(key))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Error(m) | Outcome::Blocked(m) | Outcome::Info(m) => Some(m),
            Outcome::Success(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Outcome::Error(m) => json!({ "error": m }),
            Outcome::Blocked(m) => json!({ "blocked": true, "message": m }),
            Outcome::Info(m) => json!({ "info": m }),
            Outcome::Success(p) => Value::Object(p.clone()),
        }
    }
}

impl From<ActionError> for Outcome {
    fn from(e: ActionError) -> Self {
        Outcome::Error(e.to_string())
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
