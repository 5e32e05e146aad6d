use crate::model::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: Id,
    pub gamespace: String,
    pub name: String,
    pub title: String,
    pub min_api_version: String,
}

/// Input model for creating an application. Also used as the full
/// replacement on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub name: String,
    pub title: String,
    pub min_api_version: String,
}

pub type ApplicationUpdate = NewApplication;

/// Named binding of an application to one environment and one API version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationVersion {
    pub version_id: Id,
    pub gamespace: String,
    pub application_id: Id,
    pub name: String,
    pub environment_id: Id,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplicationVersion {
    pub name: String,
    pub environment_id: Id,
    pub api_version: String,
}

pub type ApplicationVersionUpdate = NewApplicationVersion;

impl NewApplication {
    pub fn new(name: &str, title: &str, min_api_version: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            min_api_version: min_api_version.to_string(),
        }
    }
}

impl NewApplicationVersion {
    pub fn new(name: &str, environment_id: Id, api_version: &str) -> Self {
        Self {
            name: name.to_string(),
            environment_id,
            api_version: api_version.to_string(),
        }
    }
}
