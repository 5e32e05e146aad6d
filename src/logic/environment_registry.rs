use log::{debug, error, info};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};
use crate::logic::require_non_empty;
use crate::model::{
    as_json_object, Environment, EnvironmentUpdate, Id, JsonObject, NewEnvironment,
    VersionEnvironment,
};
use crate::store::{EnvironmentReadCache, Store};

/// Owns environments and the per-gamespace scheme their data must satisfy
pub struct EnvironmentRegistry<S: Store> {
    store: Arc<S>,
    cache: Arc<EnvironmentReadCache>,
    enforce_scheme: bool,
}

impl<S: Store> Clone for EnvironmentRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            enforce_scheme: self.enforce_scheme,
        }
    }
}

impl<S: Store> EnvironmentRegistry<S> {
    pub fn new(store: Arc<S>, cache_ttl: Duration, enforce_scheme: bool) -> Self {
        Self {
            store,
            cache: Arc::new(EnvironmentReadCache::new(cache_ttl)),
            enforce_scheme,
        }
    }

    /// Create an environment with empty data
    pub async fn create_environment(
        &self,
        gamespace: &str,
        environment: &NewEnvironment,
    ) -> ServiceResult<Id> {
        require_non_empty("Environment name", &environment.name)?;
        require_non_empty("Discovery URL", &environment.discovery_base_url)?;

        let subject = format!("Environment '{}'", environment.name);
        let id = self
            .store
            .insert_environment(gamespace, &environment.name, &environment.discovery_base_url)
            .await
            .map_err(|e| ServiceError::from_store("create environment", subject, e))?;

        self.cache.invalidate_gamespace(gamespace);
        info!(
            "Created environment '{}' ({}) in gamespace '{}'",
            environment.name, id, gamespace
        );
        Ok(id)
    }

    pub async fn get_environment(&self, gamespace: &str, environment_id: Id) -> ServiceResult<Environment> {
        if let Some(environment) = self.cache.get_by_id(gamespace, environment_id) {
            return Ok(environment);
        }

        let environment = self
            .store
            .get_environment(gamespace, environment_id)
            .await
            .map_err(|e| ServiceError::storage("get environment", e))?
            .ok_or_else(|| ServiceError::NotFound(format!("Environment {}", environment_id)))?;

        self.cache.put(&environment);
        Ok(environment)
    }

    pub async fn find_environment(&self, gamespace: &str, name: &str) -> ServiceResult<Environment> {
        if let Some(environment) = self.cache.get_by_name(gamespace, name) {
            return Ok(environment);
        }

        let environment = self
            .store
            .find_environment(gamespace, name)
            .await
            .map_err(|e| ServiceError::storage("find environment", e))?
            .ok_or_else(|| ServiceError::NotFound(format!("Environment '{}'", name)))?;

        self.cache.put(&environment);
        Ok(environment)
    }

    /// All environments of the gamespace, ordered by name
    pub async fn list_environments(&self, gamespace: &str) -> ServiceResult<Vec<Environment>> {
        if let Some(environments) = self.cache.get_listing(gamespace) {
            return Ok(environments);
        }

        let environments = self
            .store
            .list_environments(gamespace)
            .await
            .map_err(|e| ServiceError::storage("list environments", e))?;

        self.cache.put_listing(gamespace, environments.clone());
        Ok(environments)
    }

    /// Overwrite name, discovery address and data in one go
    pub async fn update_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
        update: EnvironmentUpdate,
    ) -> ServiceResult<()> {
        require_non_empty("Environment name", &update.name)?;
        require_non_empty("Discovery URL", &update.discovery_base_url)?;

        let data = as_json_object(update.data)
            .ok_or_else(|| ServiceError::InvalidData("environment data is not a JSON object".to_string()))?;

        if self.enforce_scheme {
            self.validate_data(gamespace, &data).await?;
        }

        let subject = format!("Environment '{}'", update.name);
        let updated = self
            .store
            .update_environment(
                gamespace,
                environment_id,
                &update.name,
                &update.discovery_base_url,
                &data,
            )
            .await
            .map_err(|e| ServiceError::from_store("update environment", subject, e))?;

        self.cache.invalidate_gamespace(gamespace);

        if !updated {
            return Err(ServiceError::NotFound(format!("Environment {}", environment_id)));
        }

        info!("Updated environment {} in gamespace '{}'", environment_id, gamespace);
        Ok(())
    }

    /// Delete the environment and every application version bound to it.
    /// Deleting an absent environment is a no-op.
    pub async fn delete_environment(&self, gamespace: &str, environment_id: Id) -> ServiceResult<()> {
        let outcome = self
            .store
            .delete_environment_cascade(gamespace, environment_id)
            .await
            .map_err(|e| {
                error!(
                    "Cascading delete of environment {} in gamespace '{}' failed: {}",
                    environment_id, gamespace, e
                );
                ServiceError::storage("delete environment", e)
            })?;

        self.cache.invalidate_gamespace(gamespace);

        if outcome.removed {
            info!(
                "Deleted environment {} in gamespace '{}' along with {} application version(s)",
                environment_id, gamespace, outcome.versions_removed
            );
        } else {
            debug!("Environment {} was already absent", environment_id);
        }
        Ok(())
    }

    /// Current scheme, or an empty document when none was set
    pub async fn get_scheme(&self, gamespace: &str) -> ServiceResult<JsonObject> {
        Ok(self.load_scheme(gamespace).await?.unwrap_or_default())
    }

    /// Store the scheme, replacing any previous one
    pub async fn set_scheme(&self, gamespace: &str, scheme: Value) -> ServiceResult<()> {
        let scheme = as_json_object(scheme)
            .ok_or_else(|| ServiceError::InvalidData("scheme is not a JSON object".to_string()))?;

        jsonschema::validator_for(&Value::Object(scheme.clone())).map_err(|e| {
            ServiceError::InvalidData(format!("scheme is not a valid JSON Schema: {}", e))
        })?;

        self.store
            .upsert_scheme(gamespace, &scheme)
            .await
            .map_err(|e| ServiceError::storage("store scheme", e))?;

        info!("Updated environment scheme of gamespace '{}'", gamespace);
        Ok(())
    }

    /// Join application, version and environment for discovery
    pub async fn resolve_version_environment(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> ServiceResult<VersionEnvironment> {
        self.store
            .find_version_environment(gamespace, application_name, version_name)
            .await
            .map_err(|e| ServiceError::storage("get version environment", e))?
            .ok_or_else(|| ServiceError::EnvironmentNotFound {
                application: application_name.to_string(),
                version: version_name.to_string(),
            })
    }

    async fn load_scheme(&self, gamespace: &str) -> ServiceResult<Option<JsonObject>> {
        self.store
            .get_scheme(gamespace)
            .await
            .map_err(|e| ServiceError::storage("get scheme", e))
    }

    async fn validate_data(&self, gamespace: &str, data: &JsonObject) -> ServiceResult<()> {
        let scheme = self.get_scheme(gamespace).await?;
        if scheme.is_empty() {
            return Ok(());
        }

        let validator = jsonschema::validator_for(&Value::Object(scheme)).map_err(|e| {
            ServiceError::InvalidData(format!("stored scheme is not a valid JSON Schema: {}", e))
        })?;

        let instance = Value::Object(data.clone());
        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidData(format!(
                "environment data does not match the scheme: {}",
                errors.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewApplication, NewApplicationVersion};
    use crate::store::{ApplicationStore, MemoryStore};
    use serde_json::json;

    fn registry() -> (Arc<MemoryStore>, EnvironmentRegistry<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = EnvironmentRegistry::new(Arc::clone(&store), Duration::from_secs(60), true);
        (store, registry)
    }

    fn new_env(name: &str) -> NewEnvironment {
        NewEnvironment {
            name: name.to_string(),
            discovery_base_url: format!("http://discovery-{}.local", name),
        }
    }

    fn update(name: &str, data: Value) -> EnvironmentUpdate {
        EnvironmentUpdate {
            name: name.to_string(),
            discovery_base_url: format!("http://discovery-{}.local", name),
            data,
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_empty_data() {
        let (_, registry) = registry();
        let id = registry.create_environment("root", &new_env("dev")).await.unwrap();

        let env = registry.get_environment("root", id).await.unwrap();
        assert_eq!(env.name, "dev");
        assert!(env.data.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_name() {
        let (_, registry) = registry();
        registry.create_environment("root", &new_env("dev")).await.unwrap();

        let err = registry.create_environment("root", &new_env("dev")).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));

        assert!(registry.create_environment("other", &new_env("dev")).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_and_find_missing() {
        let (_, registry) = registry();
        assert!(matches!(
            registry.get_environment("root", 7).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            registry.find_environment("root", "prod").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name_and_refreshed_after_write() {
        let (_, registry) = registry();
        registry.create_environment("root", &new_env("stage")).await.unwrap();
        registry.create_environment("root", &new_env("dev")).await.unwrap();

        let names: Vec<String> = registry
            .list_environments("root")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["dev", "stage"]);

        registry.create_environment("root", &new_env("live")).await.unwrap();
        assert_eq!(registry.list_environments("root").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let (_, registry) = registry();
        let id = registry.create_environment("root", &new_env("dev")).await.unwrap();
        registry.get_environment("root", id).await.unwrap();

        registry
            .update_environment("root", id, update("qa", json!({"region": "eu"})))
            .await
            .unwrap();

        let env = registry.get_environment("root", id).await.unwrap();
        assert_eq!(env.name, "qa");
        assert_eq!(env.discovery_base_url, "http://discovery-qa.local");
        assert_eq!(env.data.get("region"), Some(&json!("eu")));
    }

    #[tokio::test]
    async fn test_update_rejects_non_object_data() {
        let (_, registry) = registry();
        let id = registry.create_environment("root", &new_env("dev")).await.unwrap();

        let err = registry
            .update_environment("root", id, update("dev", json!(["a", "b"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_update_missing_environment() {
        let (_, registry) = registry();
        let err = registry
            .update_environment("root", 99, update("dev", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_validates_against_scheme() {
        let (_, registry) = registry();
        let id = registry.create_environment("root", &new_env("dev")).await.unwrap();
        registry
            .set_scheme(
                "root",
                json!({"type": "object", "properties": {"test-option": {"type": "string"}}}),
            )
            .await
            .unwrap();

        let err = registry
            .update_environment("root", id, update("dev", json!({"test-option": 5})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));

        registry
            .update_environment("root", id, update("dev", json!({"test-option": "yes"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheme_lifecycle() {
        let (_, registry) = registry();
        assert!(registry.get_scheme("root").await.unwrap().is_empty());

        registry.set_scheme("root", json!({"type": "object"})).await.unwrap();
        registry
            .set_scheme("root", json!({"type": "object", "required": ["region"]}))
            .await
            .unwrap();

        let scheme = registry.get_scheme("root").await.unwrap();
        assert_eq!(scheme.get("required"), Some(&json!(["region"])));
        assert!(registry.get_scheme("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_first_scheme_writes_both_succeed() {
        let (_, registry) = registry();
        let first = registry.clone();
        let second = registry.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                first.set_scheme("fresh", json!({"type": "object"})).await
            }),
            tokio::spawn(async move {
                second
                    .set_scheme("fresh", json!({"type": "object", "required": ["region"]}))
                    .await
            }),
        );
        assert!(a.unwrap().is_ok());
        assert!(b.unwrap().is_ok());

        let scheme = registry.get_scheme("fresh").await.unwrap();
        assert_eq!(scheme.get("type"), Some(&json!("object")));
    }

    #[tokio::test]
    async fn test_set_scheme_rejects_non_object() {
        let (_, registry) = registry();
        let err = registry.set_scheme("root", json!("object")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));

        let err = registry.set_scheme("root", json!({"type": 12})).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_is_idempotent() {
        let (store, registry) = registry();
        let env = registry.create_environment("root", &new_env("dev")).await.unwrap();
        let app = store
            .insert_application("root", &NewApplication::new("test", "Test", "0.1"))
            .await
            .unwrap();
        for name in ["1.0", "1.1"] {
            store
                .insert_application_version("root", app, &NewApplicationVersion::new(name, env, "0.1"))
                .await
                .unwrap();
        }

        registry.delete_environment("root", env).await.unwrap();

        assert!(store.list_application_versions("root", app).await.unwrap().is_empty());
        assert!(matches!(
            registry.get_environment("root", env).await,
            Err(ServiceError::NotFound(_))
        ));
        registry.delete_environment("root", env).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_missing_is_environment_not_found() {
        let (_, registry) = registry();
        let err = registry
            .resolve_version_environment("root", "test", "1.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EnvironmentNotFound { .. }));
    }
}
