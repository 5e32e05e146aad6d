use crate::model::{Id, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A deployable runtime target: where clients discover services, plus the
/// configuration document spliced into every discovery answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub environment_id: Id,
    pub gamespace: String,
    pub name: String,
    pub discovery_base_url: String,
    pub data: JsonObject,
}

/// Input model for creating an environment. Data always starts empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnvironment {
    pub name: String,
    pub discovery_base_url: String,
}

/// Full replacement of an environment's fields.
///
/// `data` is kept as a raw value so that non-object documents can be
/// rejected with a proper error instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentUpdate {
    pub name: String,
    pub discovery_base_url: String,
    #[serde(default = "empty_object")]
    pub data: Value,
}

/// JSON Schema document governing environment data of one gamespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentScheme {
    pub scheme: JsonObject,
}

fn empty_object() -> Value {
    Value::Object(JsonObject::new())
}
