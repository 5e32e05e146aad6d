use anyhow::{Context, Result};
use log::info;
use serde_json::json;

use crate::error::ServiceError;
use crate::logic::Services;
use crate::model::{Id, NewApplication, NewApplicationVersion, NewEnvironment};
use crate::store::Store;

pub const SEED_ENVIRONMENT: &str = "dev";
pub const SEED_DISCOVERY_URL: &str = "http://discovery-dev.anthill.local";
pub const SEED_APPLICATION: &str = "test";
pub const SEED_VERSION: &str = "1.0";

/// Populate the default gamespace with a development environment, a scheme
/// and a test application bound to it. Records that already exist are kept.
pub async fn load_seed_data<S: Store>(services: &Services<S>) -> Result<()> {
    let gamespace = services.default_gamespace.as_str();

    let environment_id = seed_environment(services, gamespace).await?;
    seed_scheme(services, gamespace).await?;
    let application_id = seed_application(services, gamespace).await?;
    seed_version(services, gamespace, application_id, environment_id).await?;

    info!("Seed data loaded into gamespace '{}'", gamespace);
    Ok(())
}

async fn seed_environment<S: Store>(services: &Services<S>, gamespace: &str) -> Result<Id> {
    let environment = NewEnvironment {
        name: SEED_ENVIRONMENT.to_string(),
        discovery_base_url: SEED_DISCOVERY_URL.to_string(),
    };

    match services.environments.create_environment(gamespace, &environment).await {
        Ok(id) => Ok(id),
        Err(ServiceError::AlreadyExists(_)) => Ok(services
            .environments
            .find_environment(gamespace, SEED_ENVIRONMENT)
            .await?
            .environment_id),
        Err(e) => Err(e).context("Failed to seed environment"),
    }
}

async fn seed_scheme<S: Store>(services: &Services<S>, gamespace: &str) -> Result<()> {
    if !services.environments.get_scheme(gamespace).await?.is_empty() {
        return Ok(());
    }

    let scheme = json!({
        "type": "object",
        "properties": {
            "test-option": { "type": "string" }
        }
    });
    services
        .environments
        .set_scheme(gamespace, scheme)
        .await
        .context("Failed to seed environment scheme")
}

async fn seed_application<S: Store>(services: &Services<S>, gamespace: &str) -> Result<Id> {
    let min_api_version = services.catalog.oldest().unwrap_or("0.1");
    let application = NewApplication::new(SEED_APPLICATION, "Test application", min_api_version);

    match services.applications.create_application(gamespace, &application).await {
        Ok(id) => Ok(id),
        Err(ServiceError::AlreadyExists(_)) => Ok(services
            .applications
            .find_application(gamespace, SEED_APPLICATION)
            .await?
            .application_id),
        Err(e) => Err(e).context("Failed to seed application"),
    }
}

async fn seed_version<S: Store>(
    services: &Services<S>,
    gamespace: &str,
    application_id: Id,
    environment_id: Id,
) -> Result<()> {
    let api_version = services.catalog.oldest().unwrap_or("0.1");
    let version = NewApplicationVersion::new(SEED_VERSION, environment_id, api_version);

    match services
        .applications
        .create_application_version(gamespace, application_id, &version)
        .await
    {
        Ok(_) | Err(ServiceError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e).context("Failed to seed application version"),
    }
}
