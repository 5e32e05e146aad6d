use crate::model::{
    Application, ApplicationUpdate, ApplicationVersion, ApplicationVersionUpdate, CascadeOutcome,
    Environment, Id, JsonObject, NewApplication, NewApplicationVersion, VersionEnvironment,
};
use crate::store::StoreResult;

/// Persistence for environments. Every call is scoped to a gamespace.
#[async_trait::async_trait]
pub trait EnvironmentStore: Send + Sync {
    /// Insert a new environment with empty data and return its id
    async fn insert_environment(
        &self,
        gamespace: &str,
        name: &str,
        discovery_base_url: &str,
    ) -> StoreResult<Id>;
    async fn get_environment(&self, gamespace: &str, environment_id: Id)
        -> StoreResult<Option<Environment>>;
    async fn find_environment(&self, gamespace: &str, name: &str) -> StoreResult<Option<Environment>>;
    /// List environments ordered by name
    async fn list_environments(&self, gamespace: &str) -> StoreResult<Vec<Environment>>;
    /// Overwrite name, discovery address and data. Returns false if absent.
    async fn update_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
        name: &str,
        discovery_base_url: &str,
        data: &JsonObject,
    ) -> StoreResult<bool>;
    /// Remove every version bound to the environment, then the environment,
    /// as one atomic unit.
    async fn delete_environment_cascade(
        &self,
        gamespace: &str,
        environment_id: Id,
    ) -> StoreResult<CascadeOutcome>;
    /// Join application, version and environment by names
    async fn find_version_environment(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> StoreResult<Option<VersionEnvironment>>;
}

/// Persistence for the JSON Schema governing environment data
#[async_trait::async_trait]
pub trait SchemeStore: Send + Sync {
    async fn get_scheme(&self, gamespace: &str) -> StoreResult<Option<JsonObject>>;
    /// Insert the scheme, or replace the existing one atomically
    async fn upsert_scheme(&self, gamespace: &str, scheme: &JsonObject) -> StoreResult<()>;
}

/// Persistence for applications and their versions
#[async_trait::async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert_application(&self, gamespace: &str, application: &NewApplication)
        -> StoreResult<Id>;
    async fn get_application(&self, gamespace: &str, application_id: Id)
        -> StoreResult<Option<Application>>;
    async fn find_application(&self, gamespace: &str, name: &str)
        -> StoreResult<Option<Application>>;
    /// List applications ordered by name
    async fn list_applications(&self, gamespace: &str) -> StoreResult<Vec<Application>>;
    async fn update_application(
        &self,
        gamespace: &str,
        application_id: Id,
        update: &ApplicationUpdate,
    ) -> StoreResult<bool>;
    /// Remove all versions of the application, then the application, as
    /// one atomic unit.
    async fn delete_application_cascade(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<CascadeOutcome>;

    async fn insert_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version: &NewApplicationVersion,
    ) -> StoreResult<Id>;
    async fn get_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<Option<ApplicationVersion>>;
    async fn find_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
    ) -> StoreResult<Option<ApplicationVersion>>;
    /// List versions of an application ordered by name
    async fn list_application_versions(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<Vec<ApplicationVersion>>;
    async fn update_application_version(
        &self,
        gamespace: &str,
        version_id: Id,
        update: &ApplicationVersionUpdate,
    ) -> StoreResult<bool>;
    /// Returns false if the version was already gone or belongs to another
    /// application
    async fn delete_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<bool>;
}

pub trait Store: EnvironmentStore + SchemeStore + ApplicationStore + Send + Sync {}
