use std::sync::Arc;

use crate::config::AppConfig;
use crate::logic::{
    ApiCatalog, ApplicationRegistry, Directory, EnvironmentRegistry, ResolutionService,
};
use crate::store::Store;

/// Registries and services wired over one store
pub struct Services<S: Store> {
    pub catalog: Arc<ApiCatalog>,
    pub environments: EnvironmentRegistry<S>,
    pub applications: ApplicationRegistry<S>,
    pub resolution: ResolutionService<S>,
    pub directory: Directory<S>,
    /// Gamespace used by discovery and by requests that name none
    pub default_gamespace: String,
}

impl<S: Store> Services<S> {
    pub fn new(store: Arc<S>, config: &AppConfig) -> Self {
        let catalog = Arc::new(ApiCatalog::new(config.api.versions.iter().cloned()));
        let environments = EnvironmentRegistry::new(
            Arc::clone(&store),
            config.cache_ttl(),
            config.environment.enforce_scheme,
        );
        let applications =
            ApplicationRegistry::new(Arc::clone(&store), environments.clone(), Arc::clone(&catalog));
        let resolution =
            ResolutionService::new(store, environments.clone(), config.resolution_timeout());
        let directory = Directory::new(applications.clone());

        Self {
            catalog,
            environments,
            applications,
            resolution,
            directory,
            default_gamespace: config.discovery.gamespace.clone(),
        }
    }
}
