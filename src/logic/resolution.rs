use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ServiceError, ServiceResult};
use crate::logic::environment_registry::EnvironmentRegistry;
use crate::model::DiscoveryResponse;
use crate::store::Store;

/// Why a discovery lookup found nothing. Only used for logging; callers
/// always see `EnvironmentNotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMiss {
    UnknownApplication,
    UnknownVersion,
    DanglingEnvironment,
}

/// Answers where and how a client should connect for an application version
pub struct ResolutionService<S: Store> {
    store: Arc<S>,
    environments: EnvironmentRegistry<S>,
    timeout: Duration,
}

impl<S: Store> Clone for ResolutionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            environments: self.environments.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: Store> ResolutionService<S> {
    pub fn new(store: Arc<S>, environments: EnvironmentRegistry<S>, timeout: Duration) -> Self {
        Self {
            store,
            environments,
            timeout,
        }
    }

    /// Resolve `(application, version)` into the discovery document
    pub async fn resolve(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> ServiceResult<DiscoveryResponse> {
        let lookup = self
            .environments
            .resolve_version_environment(gamespace, application_name, version_name);

        // lookup and miss diagnosis share one time budget
        let deadline = Instant::now() + self.timeout;

        match with_deadline(deadline, self.timeout, lookup).await {
            Ok(version) => Ok(DiscoveryResponse::from_version_environment(version)),
            Err(err @ ServiceError::EnvironmentNotFound { .. }) => {
                let diagnosis =
                    within_budget(deadline, self.diagnose(gamespace, application_name, version_name))
                        .await;
                match diagnosis {
                    Some(Some(miss)) => debug!(
                        "Discovery miss for {}/{} in gamespace '{}': {:?}",
                        application_name, version_name, gamespace, miss
                    ),
                    Some(None) => {}
                    None => debug!(
                        "Discovery miss for {}/{} in gamespace '{}': diagnosis skipped, budget spent",
                        application_name, version_name, gamespace
                    ),
                }
                Err(err)
            }
            Err(err) => {
                warn!(
                    "Discovery of {}/{} in gamespace '{}' failed: {}",
                    application_name, version_name, gamespace, err
                );
                Err(err)
            }
        }
    }

    /// Work out which link of the join was missing
    async fn diagnose(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> Option<ResolutionMiss> {
        let application = self.store.find_application(gamespace, application_name).await.ok()?;
        let Some(application) = application else {
            return Some(ResolutionMiss::UnknownApplication);
        };

        let version = self
            .store
            .find_application_version(gamespace, application.application_id, version_name)
            .await
            .ok()?;
        match version {
            None => Some(ResolutionMiss::UnknownVersion),
            Some(_) => Some(ResolutionMiss::DanglingEnvironment),
        }
    }
}

/// Fail closed: a lookup that does not finish by `deadline` is a storage
/// error, never a miss.
async fn with_deadline<T>(
    deadline: Instant,
    timeout: Duration,
    future: impl Future<Output = ServiceResult<T>>,
) -> ServiceResult<T> {
    match tokio::time::timeout_at(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Storage(format!(
            "Failed to get version environment: timed out after {:?}",
            timeout
        ))),
    }
}

/// Run best-effort work only while the deadline has not passed
async fn within_budget<T>(deadline: Instant, future: impl Future<Output = T>) -> Option<T> {
    if Instant::now() >= deadline {
        return None;
    }
    tokio::time::timeout_at(deadline, future).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::api_catalog::ApiCatalog;
    use crate::logic::application_registry::ApplicationRegistry;
    use crate::model::{EnvironmentUpdate, NewApplication, NewApplicationVersion, NewEnvironment};
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn service() -> ResolutionService<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let environments = EnvironmentRegistry::new(Arc::clone(&store), Duration::from_secs(60), true);
        let applications = ApplicationRegistry::new(
            Arc::clone(&store),
            environments.clone(),
            Arc::new(ApiCatalog::new(["0.1", "0.2"])),
        );

        let env = environments
            .create_environment(
                "root",
                &NewEnvironment {
                    name: "dev".to_string(),
                    discovery_base_url: "http://discovery-dev.local".to_string(),
                },
            )
            .await
            .unwrap();
        environments
            .update_environment(
                "root",
                env,
                EnvironmentUpdate {
                    name: "dev".to_string(),
                    discovery_base_url: "http://discovery-dev.local".to_string(),
                    data: json!({"region": "eu"}),
                },
            )
            .await
            .unwrap();
        let app = applications
            .create_application("root", &NewApplication::new("test", "Test application", "0.1"))
            .await
            .unwrap();
        applications
            .create_application_version("root", app, &NewApplicationVersion::new("1.0", env, "0.1"))
            .await
            .unwrap();

        ResolutionService::new(store, environments, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_resolve_end_to_end() {
        let service = service().await;
        let response = service.resolve("root", "test", "1.0").await.unwrap();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"discovery": "http://discovery-dev.local/v0.1", "region": "eu"})
        );
    }

    #[tokio::test]
    async fn test_unknown_application_or_version() {
        let service = service().await;
        for (app, version) in [("missing", "1.0"), ("test", "9.9")] {
            let err = service.resolve("root", app, version).await.unwrap_err();
            assert!(matches!(err, ServiceError::EnvironmentNotFound { .. }));
        }
        assert_eq!(
            service.diagnose("root", "missing", "1.0").await,
            Some(ResolutionMiss::UnknownApplication)
        );
        assert_eq!(
            service.diagnose("root", "test", "9.9").await,
            Some(ResolutionMiss::UnknownVersion)
        );
    }

    #[tokio::test]
    async fn test_resolution_is_gamespace_scoped() {
        let service = service().await;
        let err = service.resolve("other", "test", "1.0").await.unwrap_err();
        assert!(matches!(err, ServiceError::EnvironmentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let timeout = Duration::from_millis(5);
        let result: ServiceResult<()> = with_deadline(Instant::now() + timeout, timeout, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Storage(_))));
    }

    #[tokio::test]
    async fn test_diagnosis_stops_at_deadline() {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(20);
        let slow = within_budget(deadline, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ResolutionMiss::UnknownVersion
        })
        .await;
        assert_eq!(slow, None);
        assert!(started.elapsed() < Duration::from_secs(1));

        let spent = within_budget(started, async { ResolutionMiss::UnknownApplication }).await;
        assert_eq!(spent, None);

        let in_time = within_budget(Instant::now() + Duration::from_secs(5), async {
            ResolutionMiss::DanglingEnvironment
        })
        .await;
        assert_eq!(in_time, Some(ResolutionMiss::DanglingEnvironment));
    }
}
