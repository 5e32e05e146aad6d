use crate::error::ServiceResult;
use crate::logic::application_registry::ApplicationRegistry;
use crate::model::{ApplicationInfo, ApplicationSummary};
use crate::store::Store;

/// Read-only projections of the application registry for other platform
/// services
pub struct Directory<S: Store> {
    applications: ApplicationRegistry<S>,
}

impl<S: Store> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            applications: self.applications.clone(),
        }
    }
}

impl<S: Store> Directory<S> {
    pub fn new(applications: ApplicationRegistry<S>) -> Self {
        Self { applications }
    }

    /// One application with its version name → id map
    pub async fn application_info(&self, gamespace: &str, name: &str) -> ServiceResult<ApplicationInfo> {
        let application = self.applications.find_application(gamespace, name).await?;
        let versions = self
            .applications
            .list_application_versions(gamespace, application.application_id)
            .await?;

        Ok(ApplicationInfo {
            id: application.application_id,
            name: application.name,
            title: application.title,
            versions: versions
                .into_iter()
                .map(|version| (version.name, version.version_id))
                .collect(),
        })
    }

    pub async fn list_applications(&self, gamespace: &str) -> ServiceResult<Vec<ApplicationSummary>> {
        Ok(self
            .applications
            .list_applications(gamespace)
            .await?
            .into_iter()
            .map(|app| ApplicationSummary {
                app_id: app.application_id,
                app_name: app.name,
                app_title: app.title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::logic::api_catalog::ApiCatalog;
    use crate::logic::environment_registry::EnvironmentRegistry;
    use crate::model::{NewApplication, NewApplicationVersion, NewEnvironment};
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_application_info_and_listing() {
        let store = Arc::new(MemoryStore::new());
        let environments = EnvironmentRegistry::new(Arc::clone(&store), Duration::from_secs(60), true);
        let applications =
            ApplicationRegistry::new(store, environments.clone(), Arc::new(ApiCatalog::new(["0.1"])));
        let directory = Directory::new(applications.clone());

        let env = environments
            .create_environment(
                "root",
                &NewEnvironment {
                    name: "dev".to_string(),
                    discovery_base_url: "http://dev".to_string(),
                },
            )
            .await
            .unwrap();
        let app = applications
            .create_application("root", &NewApplication::new("test", "Test application", "0.1"))
            .await
            .unwrap();
        let v1 = applications
            .create_application_version("root", app, &NewApplicationVersion::new("1.0", env, "0.1"))
            .await
            .unwrap();

        let info = directory.application_info("root", "test").await.unwrap();
        assert_eq!(info.id, app);
        assert_eq!(info.title, "Test application");
        assert_eq!(info.versions.get("1.0"), Some(&v1));

        let listing = directory.list_applications("root").await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].app_name, "test");

        assert!(matches!(
            directory.application_info("root", "unknown").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
