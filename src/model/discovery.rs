use crate::model::{Id, JsonObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of joining application, version and environment for discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEnvironment {
    pub discovery_base_url: String,
    pub api_version: String,
    pub data: JsonObject,
}

/// Document returned to a connecting client: the computed `discovery`
/// address merged with the environment's top-level data keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveryResponse(pub JsonObject);

impl VersionEnvironment {
    /// Address clients use to reach the API version this binding selects.
    pub fn discovery_url(&self) -> String {
        format!("{}/v{}", self.discovery_base_url, self.api_version)
    }
}

impl DiscoveryResponse {
    pub const DISCOVERY_KEY: &'static str = "discovery";

    /// Build the response; the computed address always overrides a
    /// `discovery` key carried in the environment data.
    pub fn from_version_environment(version: VersionEnvironment) -> Self {
        let discovery = version.discovery_url();
        let mut body = version.data;
        body.insert(
            Self::DISCOVERY_KEY.to_string(),
            serde_json::Value::String(discovery),
        );
        Self(body)
    }

    pub fn discovery(&self) -> Option<&str> {
        self.0.get(Self::DISCOVERY_KEY).and_then(|v| v.as_str())
    }
}

/// Internal directory view of one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub id: Id,
    pub name: String,
    pub title: String,
    pub versions: BTreeMap<String, Id>,
}

/// Internal directory listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub app_id: Id,
    pub app_name: String,
    pub app_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(data: serde_json::Value) -> VersionEnvironment {
        VersionEnvironment {
            discovery_base_url: "http://discovery-dev.local".to_string(),
            api_version: "0.1".to_string(),
            data: data.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_discovery_response_merges_data() {
        let response = DiscoveryResponse::from_version_environment(version(json!({"region": "eu"})));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"discovery": "http://discovery-dev.local/v0.1", "region": "eu"})
        );
    }

    #[test]
    fn test_computed_discovery_wins_over_data() {
        let response = DiscoveryResponse::from_version_environment(version(
            json!({"discovery": "http://elsewhere", "region": "us"}),
        ));

        assert_eq!(response.discovery(), Some("http://discovery-dev.local/v0.1"));
        assert_eq!(response.0.get("region"), Some(&json!("us")));
    }
}
