use log::{debug, error, info};
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::logic::api_catalog::ApiCatalog;
use crate::logic::environment_registry::EnvironmentRegistry;
use crate::logic::require_non_empty;
use crate::model::{
    Application, ApplicationUpdate, ApplicationVersion, ApplicationVersionUpdate, Id,
    NewApplication, NewApplicationVersion, RESERVED_VERSION_NAME,
};
use crate::store::Store;

/// Owns applications and their versions.
///
/// Environments and the API catalog are consulted only to validate the
/// bindings a version makes.
pub struct ApplicationRegistry<S: Store> {
    store: Arc<S>,
    environments: EnvironmentRegistry<S>,
    catalog: Arc<ApiCatalog>,
}

impl<S: Store> Clone for ApplicationRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            environments: self.environments.clone(),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S: Store> ApplicationRegistry<S> {
    pub fn new(store: Arc<S>, environments: EnvironmentRegistry<S>, catalog: Arc<ApiCatalog>) -> Self {
        Self {
            store,
            environments,
            catalog,
        }
    }

    pub async fn create_application(
        &self,
        gamespace: &str,
        application: &NewApplication,
    ) -> ServiceResult<Id> {
        validate_application(application)?;

        let subject = format!("Application '{}'", application.name);
        if self.lookup_application(gamespace, &application.name).await?.is_some() {
            return Err(ServiceError::AlreadyExists(subject));
        }

        let id = self
            .store
            .insert_application(gamespace, application)
            .await
            .map_err(|e| ServiceError::from_store("create application", subject, e))?;

        info!(
            "Created application '{}' ({}) in gamespace '{}'",
            application.name, id, gamespace
        );
        Ok(id)
    }

    pub async fn update_application(
        &self,
        gamespace: &str,
        application_id: Id,
        update: &ApplicationUpdate,
    ) -> ServiceResult<()> {
        validate_application(update)?;

        let subject = format!("Application '{}'", update.name);
        let updated = self
            .store
            .update_application(gamespace, application_id, update)
            .await
            .map_err(|e| ServiceError::from_store("update application", subject, e))?;

        if !updated {
            return Err(ServiceError::NotFound(format!("Application {}", application_id)));
        }

        info!("Updated application {} in gamespace '{}'", application_id, gamespace);
        Ok(())
    }

    /// Delete the application and all of its versions
    pub async fn delete_application(&self, gamespace: &str, application_id: Id) -> ServiceResult<()> {
        let outcome = self
            .store
            .delete_application_cascade(gamespace, application_id)
            .await
            .map_err(|e| {
                error!(
                    "Cascading delete of application {} in gamespace '{}' failed: {}",
                    application_id, gamespace, e
                );
                ServiceError::storage("delete application", e)
            })?;

        if outcome.removed {
            info!(
                "Deleted application {} in gamespace '{}' along with {} version(s)",
                application_id, gamespace, outcome.versions_removed
            );
        } else {
            debug!("Application {} was already absent", application_id);
        }
        Ok(())
    }

    pub async fn find_application(&self, gamespace: &str, name: &str) -> ServiceResult<Application> {
        self.lookup_application(gamespace, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Application '{}'", name)))
    }

    pub async fn get_application(&self, gamespace: &str, application_id: Id) -> ServiceResult<Application> {
        self.store
            .get_application(gamespace, application_id)
            .await
            .map_err(|e| ServiceError::storage("get application", e))?
            .ok_or_else(|| ServiceError::NotFound(format!("Application {}", application_id)))
    }

    /// Applications of the gamespace ordered by name
    pub async fn list_applications(&self, gamespace: &str) -> ServiceResult<Vec<Application>> {
        self.store
            .list_applications(gamespace)
            .await
            .map_err(|e| ServiceError::storage("list applications", e))
    }

    pub async fn create_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version: &NewApplicationVersion,
    ) -> ServiceResult<Id> {
        check_version_name(&version.name)?;

        let subject = format!("Version '{}'", version.name);
        if self
            .lookup_application_version(gamespace, application_id, &version.name)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyExists(subject));
        }

        let application = self.get_application(gamespace, application_id).await?;
        self.check_binding(gamespace, &application, version).await?;

        let id = self
            .store
            .insert_application_version(gamespace, application_id, version)
            .await
            .map_err(|e| ServiceError::from_store("create application version", subject, e))?;

        info!(
            "Created version '{}' ({}) of application '{}' bound to environment {} with API {}",
            version.name, id, application.name, version.environment_id, version.api_version
        );
        Ok(id)
    }

    /// Overwrite name, environment and API version of an existing version
    pub async fn update_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
        update: &ApplicationVersionUpdate,
    ) -> ServiceResult<()> {
        check_version_name(&update.name)?;

        // existence check first so a missing version reports NotFound
        self.get_application_version(gamespace, application_id, version_id)
            .await?;
        let application = self.get_application(gamespace, application_id).await?;
        self.check_binding(gamespace, &application, update).await?;

        let subject = format!("Version '{}'", update.name);
        let updated = self
            .store
            .update_application_version(gamespace, version_id, update)
            .await
            .map_err(|e| ServiceError::from_store("update application version", subject, e))?;

        if !updated {
            return Err(ServiceError::NotFound(format!("Version {}", version_id)));
        }

        info!(
            "Updated version {} of application '{}' in gamespace '{}'",
            version_id, application.name, gamespace
        );
        Ok(())
    }

    /// Remove a version of the application. Removing an absent version, or
    /// one owned by another application, is a no-op.
    pub async fn delete_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> ServiceResult<()> {
        let removed = self
            .store
            .delete_application_version(gamespace, application_id, version_id)
            .await
            .map_err(|e| ServiceError::storage("delete application version", e))?;

        if removed {
            info!("Deleted application version {} in gamespace '{}'", version_id, gamespace);
        }
        Ok(())
    }

    pub async fn get_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> ServiceResult<ApplicationVersion> {
        self.store
            .get_application_version(gamespace, application_id, version_id)
            .await
            .map_err(|e| ServiceError::storage("get application version", e))?
            .ok_or_else(|| ServiceError::NotFound(format!("Version {}", version_id)))
    }

    pub async fn find_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
    ) -> ServiceResult<ApplicationVersion> {
        self.lookup_application_version(gamespace, application_id, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Version '{}'", name)))
    }

    /// Versions of an application ordered by name
    pub async fn list_application_versions(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> ServiceResult<Vec<ApplicationVersion>> {
        self.store
            .list_application_versions(gamespace, application_id)
            .await
            .map_err(|e| ServiceError::storage("list application versions", e))
    }

    /// API versions a version of `application` may select
    pub fn allowed_api_versions(&self, application: &Application) -> Vec<String> {
        self.catalog
            .list_versions(Some(application.min_api_version.as_str()))
    }

    async fn lookup_application(&self, gamespace: &str, name: &str) -> ServiceResult<Option<Application>> {
        self.store
            .find_application(gamespace, name)
            .await
            .map_err(|e| ServiceError::storage("find application", e))
    }

    async fn lookup_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
    ) -> ServiceResult<Option<ApplicationVersion>> {
        self.store
            .find_application_version(gamespace, application_id, name)
            .await
            .map_err(|e| ServiceError::storage("find application version", e))
    }

    /// The environment must exist and the API version must be offered at
    /// or above the application's floor.
    async fn check_binding(
        &self,
        gamespace: &str,
        application: &Application,
        version: &NewApplicationVersion,
    ) -> ServiceResult<()> {
        self.environments
            .get_environment(gamespace, version.environment_id)
            .await?;

        if !self
            .catalog
            .allows(&version.api_version, Some(application.min_api_version.as_str()))
        {
            return Err(ServiceError::InvalidData(format!(
                "API version '{}' is not offered for application '{}' (minimum '{}')",
                version.api_version, application.name, application.min_api_version
            )));
        }
        Ok(())
    }
}

fn validate_application(application: &NewApplication) -> ServiceResult<()> {
    require_non_empty("Application name", &application.name)?;
    require_non_empty("Application title", &application.title)
}

fn check_version_name(name: &str) -> ServiceResult<()> {
    if name == RESERVED_VERSION_NAME {
        return Err(ServiceError::ReservedName(name.to_string()));
    }
    require_non_empty("Version name", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewEnvironment;
    use crate::store::MemoryStore;
    use std::time::Duration;

    struct Fixture {
        applications: ApplicationRegistry<MemoryStore>,
        environments: EnvironmentRegistry<MemoryStore>,
        env_id: Id,
        app_id: Id,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let environments = EnvironmentRegistry::new(Arc::clone(&store), Duration::from_secs(60), true);
        let catalog = Arc::new(ApiCatalog::new(["0.1", "0.2", "0.3"]));
        let applications = ApplicationRegistry::new(store, environments.clone(), catalog);

        let env_id = environments
            .create_environment(
                "root",
                &NewEnvironment {
                    name: "dev".to_string(),
                    discovery_base_url: "http://discovery-dev.local".to_string(),
                },
            )
            .await
            .unwrap();
        let app_id = applications
            .create_application("root", &NewApplication::new("test", "Test application", "0.2"))
            .await
            .unwrap();

        Fixture {
            applications,
            environments,
            env_id,
            app_id,
        }
    }

    #[tokio::test]
    async fn test_application_name_unique_per_gamespace() {
        let f = fixture().await;
        let err = f
            .applications
            .create_application("root", &NewApplication::new("test", "Again", "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));

        assert!(f
            .applications
            .create_application("other", &NewApplication::new("test", "Again", "0.1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rename_collision() {
        let f = fixture().await;
        let other = f
            .applications
            .create_application("root", &NewApplication::new("other", "Other", "0.1"))
            .await
            .unwrap();

        let err = f
            .applications
            .update_application("root", other, &NewApplication::new("test", "Other", "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_update_missing_application() {
        let f = fixture().await;
        let err = f
            .applications
            .update_application("root", 404, &NewApplication::new("x", "X", "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_applications_sorted() {
        let f = fixture().await;
        f.applications
            .create_application("root", &NewApplication::new("alpha", "Alpha", "0.1"))
            .await
            .unwrap();

        let names: Vec<String> = f
            .applications
            .list_applications("root")
            .await
            .unwrap()
            .into_iter()
            .map(|app| app.name)
            .collect();
        assert_eq!(names, vec!["alpha", "test"]);
    }

    #[tokio::test]
    async fn test_reserved_version_name() {
        let f = fixture().await;
        let err = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("def", f.env_id, "0.2"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::ReservedName("def".to_string()));

        // rejected even when the binding itself is invalid
        let err = f
            .applications
            .create_application_version("root", 999, &NewApplicationVersion::new("def", 999, "9.9"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::ReservedName("def".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_version_name() {
        let f = fixture().await;
        let version = NewApplicationVersion::new("1.0", f.env_id, "0.2");
        f.applications
            .create_application_version("root", f.app_id, &version)
            .await
            .unwrap();

        let err = f
            .applications
            .create_application_version("root", f.app_id, &version)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_version_requires_environment_and_allowed_api() {
        let f = fixture().await;
        let err = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("1.0", 77, "0.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("1.0", f.env_id, "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));

        let err = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("1.0", f.env_id, "5.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_update_version() {
        let f = fixture().await;
        let version_id = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("1.0", f.env_id, "0.2"))
            .await
            .unwrap();

        f.applications
            .update_application_version(
                "root",
                f.app_id,
                version_id,
                &NewApplicationVersion::new("1.1", f.env_id, "0.3"),
            )
            .await
            .unwrap();

        let version = f
            .applications
            .get_application_version("root", f.app_id, version_id)
            .await
            .unwrap();
        assert_eq!(version.name, "1.1");
        assert_eq!(version.api_version, "0.3");

        let err = f
            .applications
            .update_application_version(
                "root",
                f.app_id,
                version_id,
                &NewApplicationVersion::new("def", f.env_id, "0.3"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ReservedName(_)));

        let err = f
            .applications
            .update_application_version("root", f.app_id, 555, &NewApplicationVersion::new("2.0", f.env_id, "0.3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_versions_listed_by_name() {
        let f = fixture().await;
        for name in ["2.0", "1.0", "1.5"] {
            f.applications
                .create_application_version("root", f.app_id, &NewApplicationVersion::new(name, f.env_id, "0.2"))
                .await
                .unwrap();
        }

        let names: Vec<String> = f
            .applications
            .list_application_versions("root", f.app_id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["1.0", "1.5", "2.0"]);

        let found = f
            .applications
            .find_application_version("root", f.app_id, "1.5")
            .await
            .unwrap();
        assert_eq!(found.name, "1.5");
    }

    #[tokio::test]
    async fn test_delete_application_cascades() {
        let f = fixture().await;
        for name in ["1.0", "1.1", "1.2"] {
            f.applications
                .create_application_version("root", f.app_id, &NewApplicationVersion::new(name, f.env_id, "0.2"))
                .await
                .unwrap();
        }

        f.applications.delete_application("root", f.app_id).await.unwrap();

        assert!(f
            .applications
            .list_application_versions("root", f.app_id)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            f.applications.get_application("root", f.app_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.environments.get_environment("root", f.env_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_version_idempotent() {
        let f = fixture().await;
        let version_id = f
            .applications
            .create_application_version("root", f.app_id, &NewApplicationVersion::new("1.0", f.env_id, "0.2"))
            .await
            .unwrap();

        f.applications.delete_application_version("root", f.app_id, version_id).await.unwrap();
        f.applications.delete_application_version("root", f.app_id, version_id).await.unwrap();

        assert!(matches!(
            f.applications.find_application_version("root", f.app_id, "1.0").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_version_of_other_application_is_noop() {
        let f = fixture().await;
        let other_app = f
            .applications
            .create_application("root", &NewApplication::new("other", "Other application", "0.2"))
            .await
            .unwrap();
        let version_id = f
            .applications
            .create_application_version("root", other_app, &NewApplicationVersion::new("1.0", f.env_id, "0.2"))
            .await
            .unwrap();

        f.applications
            .delete_application_version("root", f.app_id, version_id)
            .await
            .unwrap();

        let version = f
            .applications
            .get_application_version("root", other_app, version_id)
            .await
            .unwrap();
        assert_eq!(version.name, "1.0");
    }

    #[tokio::test]
    async fn test_allowed_api_versions() {
        let f = fixture().await;
        let app = f.applications.get_application("root", f.app_id).await.unwrap();
        assert_eq!(f.applications.allowed_api_versions(&app), vec!["0.2", "0.3"]);
    }
}
