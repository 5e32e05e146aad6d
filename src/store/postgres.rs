use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::model::{
    Application, ApplicationUpdate, ApplicationVersion, ApplicationVersionUpdate, CascadeOutcome,
    Environment, Id, JsonObject, NewApplication, NewApplicationVersion, VersionEnvironment,
};
use crate::store::traits::{ApplicationStore, EnvironmentStore, SchemeStore, Store};
use crate::store::StoreResult;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

fn environment_from_row(row: &PgRow) -> StoreResult<Environment> {
    let data: Json<JsonObject> = row.try_get("environment_data")?;
    Ok(Environment {
        environment_id: row.try_get("environment_id")?,
        gamespace: row.try_get("gamespace")?,
        name: row.try_get("environment_name")?,
        discovery_base_url: row.try_get("environment_discovery")?,
        data: data.0,
    })
}

fn application_from_row(row: &PgRow) -> StoreResult<Application> {
    Ok(Application {
        application_id: row.try_get("application_id")?,
        gamespace: row.try_get("gamespace")?,
        name: row.try_get("application_name")?,
        title: row.try_get("application_title")?,
        min_api_version: row.try_get("min_api_version")?,
    })
}

fn version_from_row(row: &PgRow) -> StoreResult<ApplicationVersion> {
    Ok(ApplicationVersion {
        version_id: row.try_get("version_id")?,
        gamespace: row.try_get("gamespace")?,
        application_id: row.try_get("application_id")?,
        name: row.try_get("version_name")?,
        environment_id: row.try_get("version_environment")?,
        api_version: row.try_get("api_version")?,
    })
}

const ENVIRONMENT_COLUMNS: &str =
    "environment_id, gamespace, environment_name, environment_discovery, environment_data";
const APPLICATION_COLUMNS: &str =
    "application_id, gamespace, application_name, application_title, min_api_version";
const VERSION_COLUMNS: &str =
    "version_id, gamespace, application_id, version_name, version_environment, api_version";

#[async_trait::async_trait]
impl EnvironmentStore for PostgresStore {
    async fn insert_environment(
        &self,
        gamespace: &str,
        name: &str,
        discovery_base_url: &str,
    ) -> StoreResult<Id> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO environments (gamespace, environment_name, environment_discovery, environment_data)
            VALUES ($1, $2, $3, '{}'::jsonb)
            RETURNING environment_id
            "#,
        )
        .bind(gamespace)
        .bind(name)
        .bind(discovery_base_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
    ) -> StoreResult<Option<Environment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM environments WHERE gamespace = $1 AND environment_id = $2",
            ENVIRONMENT_COLUMNS
        ))
        .bind(gamespace)
        .bind(environment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(environment_from_row).transpose()
    }

    async fn find_environment(&self, gamespace: &str, name: &str) -> StoreResult<Option<Environment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM environments WHERE gamespace = $1 AND environment_name = $2",
            ENVIRONMENT_COLUMNS
        ))
        .bind(gamespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(environment_from_row).transpose()
    }

    async fn list_environments(&self, gamespace: &str) -> StoreResult<Vec<Environment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM environments WHERE gamespace = $1 ORDER BY environment_name ASC",
            ENVIRONMENT_COLUMNS
        ))
        .bind(gamespace)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(environment_from_row).collect()
    }

    async fn update_environment(
        &self,
        gamespace: &str,
        environment_id: Id,
        name: &str,
        discovery_base_url: &str,
        data: &JsonObject,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE environments
            SET environment_name = $1, environment_discovery = $2, environment_data = $3
            WHERE gamespace = $4 AND environment_id = $5
            "#,
        )
        .bind(name)
        .bind(discovery_base_url)
        .bind(Json(data))
        .bind(gamespace)
        .bind(environment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_environment_cascade(
        &self,
        gamespace: &str,
        environment_id: Id,
    ) -> StoreResult<CascadeOutcome> {
        let mut tx = self.pool.begin().await?;

        let versions = sqlx::query(
            "DELETE FROM application_versions WHERE gamespace = $1 AND version_environment = $2",
        )
        .bind(gamespace)
        .bind(environment_id)
        .execute(&mut *tx)
        .await?;

        let environments =
            sqlx::query("DELETE FROM environments WHERE gamespace = $1 AND environment_id = $2")
                .bind(gamespace)
                .bind(environment_id)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(CascadeOutcome {
            removed: environments.rows_affected() > 0,
            versions_removed: versions.rows_affected(),
        })
    }

    async fn find_version_environment(
        &self,
        gamespace: &str,
        application_name: &str,
        version_name: &str,
    ) -> StoreResult<Option<VersionEnvironment>> {
        let row = sqlx::query(
            r#"
            SELECT e.environment_discovery, e.environment_data, v.api_version
            FROM applications a
            JOIN application_versions v ON v.application_id = a.application_id
            JOIN environments e ON e.environment_id = v.version_environment
            WHERE a.gamespace = $1 AND a.application_name = $2 AND v.version_name = $3
            "#,
        )
        .bind(gamespace)
        .bind(application_name)
        .bind(version_name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: Json<JsonObject> = row.try_get("environment_data")?;
        Ok(Some(VersionEnvironment {
            discovery_base_url: row.try_get("environment_discovery")?,
            api_version: row.try_get("api_version")?,
            data: data.0,
        }))
    }
}

#[async_trait::async_trait]
impl SchemeStore for PostgresStore {
    async fn get_scheme(&self, gamespace: &str) -> StoreResult<Option<JsonObject>> {
        let data: Option<Json<JsonObject>> =
            sqlx::query_scalar("SELECT data FROM environment_schemes WHERE gamespace = $1")
                .bind(gamespace)
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(|json| json.0))
    }

    async fn upsert_scheme(&self, gamespace: &str, scheme: &JsonObject) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO environment_schemes (gamespace, data)
            VALUES ($1, $2)
            ON CONFLICT (gamespace) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(gamespace)
        .bind(Json(scheme))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ApplicationStore for PostgresStore {
    async fn insert_application(
        &self,
        gamespace: &str,
        application: &NewApplication,
    ) -> StoreResult<Id> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO applications (gamespace, application_name, application_title, min_api_version)
            VALUES ($1, $2, $3, $4)
            RETURNING application_id
            "#,
        )
        .bind(gamespace)
        .bind(&application.name)
        .bind(&application.title)
        .bind(&application.min_api_version)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_application(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<Option<Application>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM applications WHERE gamespace = $1 AND application_id = $2",
            APPLICATION_COLUMNS
        ))
        .bind(gamespace)
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(application_from_row).transpose()
    }

    async fn find_application(&self, gamespace: &str, name: &str) -> StoreResult<Option<Application>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM applications WHERE gamespace = $1 AND application_name = $2",
            APPLICATION_COLUMNS
        ))
        .bind(gamespace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(application_from_row).transpose()
    }

    async fn list_applications(&self, gamespace: &str) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM applications WHERE gamespace = $1 ORDER BY application_name ASC",
            APPLICATION_COLUMNS
        ))
        .bind(gamespace)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(application_from_row).collect()
    }

    async fn update_application(
        &self,
        gamespace: &str,
        application_id: Id,
        update: &ApplicationUpdate,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET application_name = $1, application_title = $2, min_api_version = $3
            WHERE gamespace = $4 AND application_id = $5
            "#,
        )
        .bind(&update.name)
        .bind(&update.title)
        .bind(&update.min_api_version)
        .bind(gamespace)
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_application_cascade(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<CascadeOutcome> {
        let mut tx = self.pool.begin().await?;

        let versions = sqlx::query(
            "DELETE FROM application_versions WHERE gamespace = $1 AND application_id = $2",
        )
        .bind(gamespace)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        let applications =
            sqlx::query("DELETE FROM applications WHERE gamespace = $1 AND application_id = $2")
                .bind(gamespace)
                .bind(application_id)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(CascadeOutcome {
            removed: applications.rows_affected() > 0,
            versions_removed: versions.rows_affected(),
        })
    }

    async fn insert_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version: &NewApplicationVersion,
    ) -> StoreResult<Id> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO application_versions
                (gamespace, application_id, version_name, version_environment, api_version)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING version_id
            "#,
        )
        .bind(gamespace)
        .bind(application_id)
        .bind(&version.name)
        .bind(version.environment_id)
        .bind(&version.api_version)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<Option<ApplicationVersion>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM application_versions WHERE gamespace = $1 AND application_id = $2 AND version_id = $3",
            VERSION_COLUMNS
        ))
        .bind(gamespace)
        .bind(application_id)
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(version_from_row).transpose()
    }

    async fn find_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        name: &str,
    ) -> StoreResult<Option<ApplicationVersion>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM application_versions WHERE gamespace = $1 AND application_id = $2 AND version_name = $3",
            VERSION_COLUMNS
        ))
        .bind(gamespace)
        .bind(application_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(version_from_row).transpose()
    }

    async fn list_application_versions(
        &self,
        gamespace: &str,
        application_id: Id,
    ) -> StoreResult<Vec<ApplicationVersion>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM application_versions WHERE gamespace = $1 AND application_id = $2 ORDER BY version_name ASC",
            VERSION_COLUMNS
        ))
        .bind(gamespace)
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(version_from_row).collect()
    }

    async fn update_application_version(
        &self,
        gamespace: &str,
        version_id: Id,
        update: &ApplicationVersionUpdate,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE application_versions
            SET version_name = $1, version_environment = $2, api_version = $3
            WHERE gamespace = $4 AND version_id = $5
            "#,
        )
        .bind(&update.name)
        .bind(update.environment_id)
        .bind(&update.api_version)
        .bind(gamespace)
        .bind(version_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_application_version(
        &self,
        gamespace: &str,
        application_id: Id,
        version_id: Id,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM application_versions
            WHERE gamespace = $1 AND application_id = $2 AND version_id = $3
            "#,
        )
        .bind(gamespace)
        .bind(application_id)
        .bind(version_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl Store for PostgresStore {}
