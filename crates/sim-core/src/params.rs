//! Typed extraction of action parameters from a JSON parameter map.

use crate::{ActionError, Payload};
use serde_json::Value;

fn missing(key: &str) -> ActionError {
    ActionError::invalid(format!("missing parameter '{key}'"))
}

pub fn string(params: &Payload, key: &str) -> Result<String, ActionError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(ActionError::invalid(format!("'{key}' must be a non-empty string"))),
        None => Err(missing(key)),
    }
}

/// Non-negative integer; numeric strings are accepted.
pub fn uint(params: &Payload, key: &str) -> Result<u64, ActionError> {
    let bad = || ActionError::invalid(format!("'{key}' must be a non-negative integer"));
    match params.get(key) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(bad),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| bad()),
        Some(_) => Err(bad()),
        None => Err(missing(key)),
    }
}

pub fn number(params: &Payload, key: &str) -> Result<f64, ActionError> {
    let bad = || ActionError::invalid(format!("'{key}' must be a number"));
    let x = match params.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(bad)?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| bad())?,
        Some(_) => return Err(bad()),
        None => return Err(missing(key)),
    };
    if x.is_finite() {
        Ok(x)
    } else {
        Err(bad())
    }
}

/// Optional boolean; `"true"`/`"false"`/`"yes"`/`"no"` strings are accepted.
pub fn flag(params: &Payload, key: &str, default: bool) -> Result<bool, ActionError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(ActionError::invalid(format!("'{key}' must be true or false"))),
        },
        Some(_) => Err(ActionError::invalid(format!("'{key}' must be true or false"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(v: Value) -> Payload {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn extracts_typed_values() {
        let params = p(json!({"ticker": " NVX ", "qty": "100", "n": 5, "x": 1.5, "honest": "no"}));
        assert_eq!(string(&params, "ticker").unwrap(), "NVX");
        assert_eq!(uint(&params, "qty").unwrap(), 100);
        assert_eq!(uint(&params, "n").unwrap(), 5);
        assert_eq!(number(&params, "x").unwrap(), 1.5);
        assert!(!flag(&params, "honest", true).unwrap());
        assert!(flag(&params, "absent", true).unwrap());
    }

    #[test]
    fn rejects_malformed_values() {
        let params = p(json!({"qty": -3, "name": "", "ok": 7}));
        assert!(matches!(uint(&params, "qty"), Err(ActionError::InvalidInput(_))));
        assert!(string(&params, "name").is_err());
        assert!(string(&params, "missing").is_err());
        assert!(flag(&params, "ok", false).is_err());
    }
}
