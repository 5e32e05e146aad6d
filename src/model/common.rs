use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Row identifier handed out by the store on insert.
pub type Id = i64;

/// Configuration document attached to an environment or used as a scheme.
pub type JsonObject = Map<String, Value>;

/// Version name that can never be assigned to an application version.
pub const RESERVED_VERSION_NAME: &str = "def";

/// Outcome of a cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    /// Whether the parent row existed and was removed
    pub removed: bool,
    /// Number of application versions removed along with the parent
    pub versions_removed: u64,
}

/// Interpret an incoming JSON value as a configuration document.
///
/// Returns `None` when the value is anything other than a JSON object.
pub fn as_json_object(value: Value) -> Option<JsonObject> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_json_object() {
        assert!(as_json_object(json!({"region": "eu"})).is_some());
        assert!(as_json_object(json!([1, 2, 3])).is_none());
        assert!(as_json_object(json!("text")).is_none());
        assert!(as_json_object(Value::Null).is_none());
    }
}
