use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Application, ApplicationUpdate, ApplicationVersion, ApplicationVersionUpdate, CascadeOutcome,
    Environment, Id, JsonObject, NewApplication, NewApplicationVersion, VersionEnvironment,
};
use crate::store::traits::{ApplicationStore, EnvironmentStore, SchemeStore, Store};
use crate::store::{StoreError, StoreResult};

/// In-process store with the same constraints as the Postgres schema:
/// per-gamespace unique names, version→environment references, and
/// cascades applied under a single write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    environments: BTreeMap<Id, Environment>,
    schemes: HashMap<String, JsonObject>,
    applications: BTreeMap<Id, Application>,
    versions: BTreeMap<Id, ApplicationVersion>,
    last_environment_id: Id,
    last_application_id: Id,
    last_version_id: Id,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn environment_name_taken(&self, gamespace: &str, name: &str, except: Option<Id>) -> bool {
        self.environments.values().any(|env| {
            env.gamespace == gamespace && env.name == name && Some(env.environment_id) != except
        })
    }

    fn application_name_taken(&self, gamespace: &str, name: &str, except: Option<Id>) -> bool {
        self.applications.values().any(|app| {
            app.gamespace == gamespace && app.name == name && Some(app.application_id) != except
        })
    }

    fn version_name_taken(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
        except: Option<Id>,
    ) -> bool {
        self.versions.values().any(|version| {
            version.gamespace == gamespace
                && version.application_id == application_id
                && version.name == name
                && Some(version.version_id) != except
        })
    }

    fn has_environment(&self, gamespace: &str, environment_id: Id) -> bool {
        self.environments
            .get(&environment_id)
            .is_some_and(|env| env.gamespace == gamespace)
    }

    fn has_application(&self, gamespace: &str, application_id: Id) -> bool {
        self.applications
            .get(&application_id)
            .is_some_and(|app| app.gamespace == gamespace)
    }
}

fn duplicate(constraint: &str) -> StoreError {
    StoreError::DuplicateKey(constraint.to_string())
}

fn missing_reference(what: &str, id: Id) -> StoreError {
    StoreError::Backend(format!("foreign key violation: {} {} does not exist", what, id))
}

#[async_trait::async_trait]
impl EnvironmentStore for MemoryStore {
    async fn insert_environment(
        &self,
        gamespace: &str,
        name: &str,
        discovery_base_url: &str,
    ) -> StoreResult<Id> {
        let mut tables = self.tables.write();
        if tables.environment_name_taken(gamespace, name, None) {
            return Err(duplicate("environments_gamespace_environment_name_key"));
        }

        tables.last_environment_id += 1;
        let environment_id = tables.last_environment_id;
        tables.environments.insert(
            environment_id,
            Environment {
                environment_id,
                gamespace: gamespace.to_string(),
                name: name.to_string(),
                discovery_base_url: discovery_base_url.to_string(),
                data: JsonObject::new(),
            },
        );
        Ok(environment_id)
    }

    async fn get_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
    ) -> StoreResult<Option<Environment>> {
        let tables = self.tables.read();
        Ok(tables
            .environments
            .get(&environment_id)
            .filter(|env| env.gamespace == gamespace)
            .cloned())
    }

    async fn find_environment(&self, gamespace: &str, name: &str) -> StoreResult<Option<Environment>> {
        let tables = self.tables.read();
        Ok(tables
            .environments
            .values()
            .find(|env| env.gamespace == gamespace && env.name == name)
            .cloned())
    }

    async fn list_environments(&self, gamespace: &str) -> StoreResult<Vec<Environment>> {
        let tables = self.tables.read();
        Ok(tables
            .environments
            .values()
            .filter(|env| env.gamespace == gamespace)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect())
    }

    async fn update_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
        name: &str,
        discovery_base_url: &str,
        data: &JsonObject,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.has_environment(gamespace, environment_id) {
            return Ok(false);
        }
        if tables.environment_name_taken(gamespace, name, Some(environment_id)) {
            return Err(duplicate("environments_gamespace_environment_name_key"));
        }

        if let Some(env) = tables.environments.get_mut(&environment_id) {
            env.name = name.to_string();
            env.discovery_base_url = discovery_base_url.to_string();
            env.data = data.clone();
        }
        Ok(true)
    }

    async fn delete_environment_cascade(
        &self,
        gamespace: &str,
        environment_id: Id,
    ) -> StoreResult<CascadeOutcome> {
        let mut tables = self.tables.write();

        let before = tables.versions.len();
        tables.versions.retain(|_, version| {
            !(version.gamespace == gamespace && version.environment_id == environment_id)
        });
        let versions_removed = (before - tables.versions.len()) as u64;

        let removed = tables.has_environment(gamespace, environment_id)
            && tables.environments.remove(&environment_id).is_some();

        Ok(CascadeOutcome {
            removed,
            versions_removed,
        })
    }

    async fn find_version_environment(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> StoreResult<Option<VersionEnvironment>> {
        let tables = self.tables.read();

        let joined = tables
            .applications
            .values()
            .filter(|app| app.gamespace == gamespace && app.name == application_name)
            .flat_map(|app| {
                tables.versions.values().filter(move |version| {
                    version.application_id == app.application_id && version.name == version_name
                })
            })
            .find_map(|version| {
                tables
                    .environments
                    .get(&version.environment_id)
                    .map(|env| VersionEnvironment {
                        discovery_base_url: env.discovery_base_url.clone(),
                        api_version: version.api_version.clone(),
                        data: env.data.clone(),
                    })
            });

        Ok(joined)
    }
}

#[async_trait::async_trait]
impl SchemeStore for MemoryStore {
    async fn get_scheme(&self, gamespace: &str) -> StoreResult<Option<JsonObject>> {
        Ok(self.tables.read().schemes.get(gamespace).cloned())
    }

    async fn upsert_scheme(&self, gamespace: &str, scheme: &JsonObject) -> StoreResult<()> {
        self.tables
            .write()
            .schemes
            .insert(gamespace.to_string(), scheme.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ApplicationStore for MemoryStore {
    async fn insert_application(
        &self,
        gamespace: &str,
        application: &NewApplication,
    ) -> StoreResult<Id> {
        let mut tables = self.tables.write();
        if tables.application_name_taken(gamespace, &application.name, None) {
            return Err(duplicate("applications_gamespace_application_name_key"));
        }

        tables.last_application_id += 1;
        let application_id = tables.last_application_id;
        tables.applications.insert(
            application_id,
            Application {
                application_id,
                gamespace: gamespace.to_string(),
                name: application.name.clone(),
                title: application.title.clone(),
                min_api_version: application.min_api_version.clone(),
            },
        );
        Ok(application_id)
    }

    async fn get_application(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<Option<Application>> {
        let tables = self.tables.read();
        Ok(tables
            .applications
            .get(&application_id)
            .filter(|app| app.gamespace == gamespace)
            .cloned())
    }

    async fn find_application(&self, gamespace: &str, name: &str) -> StoreResult<Option<Application>> {
        let tables = self.tables.read();
        Ok(tables
            .applications
            .values()
            .find(|app| app.gamespace == gamespace && app.name == name)
            .cloned())
    }

    async fn list_applications(&self, gamespace: &str) -> StoreResult<Vec<Application>> {
        let tables = self.tables.read();
        Ok(tables
            .applications
            .values()
            .filter(|app| app.gamespace == gamespace)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect())
    }

    async fn update_application(
        &self,
        gamespace: &str,
        application_id: Id,
        update: &ApplicationUpdate,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.has_application(gamespace, application_id) {
            return Ok(false);
        }
        if tables.application_name_taken(gamespace, &update.name, Some(application_id)) {
            return Err(duplicate("applications_gamespace_application_name_key"));
        }

        if let Some(app) = tables.applications.get_mut(&application_id) {
            app.name = update.name.clone();
            app.title = update.title.clone();
            app.min_api_version = update.min_api_version.clone();
        }
        Ok(true)
    }

    async fn delete_application_cascade(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<CascadeOutcome> {
        let mut tables = self.tables.write();

        let before = tables.versions.len();
        tables.versions.retain(|_, version| {
            !(version.gamespace == gamespace && version.application_id == application_id)
        });
        let versions_removed = (before - tables.versions.len()) as u64;

        let removed = tables.has_application(gamespace, application_id)
            && tables.applications.remove(&application_id).is_some();

        Ok(CascadeOutcome {
            removed,
            versions_removed,
        })
    }

    async fn insert_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version: &NewApplicationVersion,
    ) -> StoreResult<Id> {
        let mut tables = self.tables.write();
        if !tables.has_application(gamespace, application_id) {
            return Err(missing_reference("application", application_id));
        }
        if !tables.environments.contains_key(&version.environment_id) {
            return Err(missing_reference("environment", version.environment_id));
        }
        if tables.version_name_taken(gamespace, application_id, &version.name, None) {
            return Err(duplicate("application_versions_gamespace_application_id_version_name_key"));
        }

        tables.last_version_id += 1;
        let version_id = tables.last_version_id;
        tables.versions.insert(
            version_id,
            ApplicationVersion {
                version_id,
                gamespace: gamespace.to_string(),
                application_id,
                name: version.name.clone(),
                environment_id: version.environment_id,
                api_version: version.api_version.clone(),
            },
        );
        Ok(version_id)
    }

    async fn get_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<Option<ApplicationVersion>> {
        let tables = self.tables.read();
        Ok(tables
            .versions
            .get(&version_id)
            .filter(|version| {
                version.gamespace == gamespace && version.application_id == application_id
            })
            .cloned())
    }

    async fn find_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
    ) -> StoreResult<Option<ApplicationVersion>> {
        let tables = self.tables.read();
        Ok(tables
            .versions
            .values()
            .find(|version| {
                version.gamespace == gamespace
                    && version.application_id == application_id
                    && version.name == name
            })
            .cloned())
    }

    async fn list_application_versions(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<Vec<ApplicationVersion>> {
        let tables = self.tables.read();
        Ok(tables
            .versions
            .values()
            .filter(|version| {
                version.gamespace == gamespace && version.application_id == application_id
            })
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect())
    }

    async fn update_application_version(
        &self,
        gamespace: &str,
        version_id: Id,
        update: &ApplicationVersionUpdate,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let Some(application_id) = tables
            .versions
            .get(&version_id)
            .filter(|version| version.gamespace == gamespace)
            .map(|version| version.application_id)
        else {
            return Ok(false);
        };

        if !tables.environments.contains_key(&update.environment_id) {
            return Err(missing_reference("environment", update.environment_id));
        }
        if tables.version_name_taken(gamespace, application_id, &update.name, Some(version_id)) {
            return Err(duplicate("application_versions_gamespace_application_id_version_name_key"));
        }

        if let Some(version) = tables.versions.get_mut(&version_id) {
            version.name = update.name.clone();
            version.environment_id = update.environment_id;
            version.api_version = update.api_version.clone();
        }
        Ok(true)
    }

    async fn delete_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let owned = tables.versions.get(&version_id).is_some_and(|version| {
            version.gamespace == gamespace && version.application_id == application_id
        });
        Ok(owned && tables.versions.remove(&version_id).is_some())
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_names_unique_per_gamespace() {
        let store = MemoryStore::new();
        store.insert_environment("root", "dev", "http://a").await.unwrap();

        let err = store.insert_environment("root", "dev", "http://b").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));

        assert!(store.insert_environment("other", "dev", "http://b").await.is_ok());
    }

    #[tokio::test]
    async fn test_version_requires_existing_environment() {
        let store = MemoryStore::new();
        let app = store
            .insert_application("root", &NewApplication::new("test", "Test", "0.1"))
            .await
            .unwrap();

        let err = store
            .insert_application_version("root", app, &NewApplicationVersion::new("1.0", 42, "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_join_ignores_other_gamespaces() {
        let store = MemoryStore::new();
        let env = store.insert_environment("root", "dev", "http://dev").await.unwrap();
        let app = store
            .insert_application("root", &NewApplication::new("test", "Test", "0.1"))
            .await
            .unwrap();
        store
            .insert_application_version("root", app, &NewApplicationVersion::new("1.0", env, "0.1"))
            .await
            .unwrap();

        assert!(store
            .find_version_environment("root", "test", "1.0")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_version_environment("other", "test", "1.0")
            .await
            .unwrap()
            .is_none());
    }
}
