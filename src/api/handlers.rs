use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::logic::Services;
use crate::model::{
    Application, ApplicationInfo, ApplicationSummary, ApplicationUpdate, ApplicationVersion,
    ApplicationVersionUpdate, DiscoveryResponse, Environment, EnvironmentScheme,
    EnvironmentUpdate, Gamespace, Id, NewApplication, NewApplicationVersion, NewEnvironment,
};
use crate::store::Store;

pub type AppState<S> = Arc<Services<S>>;

type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type CreatedResult = Result<(StatusCode, Json<CreatedResponse>), ApiError>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Id,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: String) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

/// Application with its versions and the API versions they may select
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub versions: Vec<ApplicationVersion>,
    pub api_versions: Vec<String>,
}

/// Everything needed to bind a new or existing version
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionForm {
    pub application: Application,
    pub version: Option<ApplicationVersion>,
    pub environments: Vec<Environment>,
    pub api_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVersionsQuery {
    pub min: Option<String>,
}

/// Map a service error onto an HTTP status and error body
pub fn error_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::NotFound(_) | ServiceError::EnvironmentNotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
        ServiceError::ReservedName(_) | ServiceError::InvalidData(_) => StatusCode::BAD_REQUEST,
        ServiceError::Storage(_) => {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

fn created(id: Id) -> (StatusCode, Json<CreatedResponse>) {
    (StatusCode::CREATED, Json(CreatedResponse { id }))
}

// Discovery

/// GET /{application_name}/{version_name}
/// Resolve where a client of this application version should connect
pub async fn discover<S: Store>(
    Path((application_name, version_name)): Path<(String, String)>,
    State(services): State<AppState<S>>,
) -> ApiResult<DiscoveryResponse> {
    services
        .resolution
        .resolve(&services.default_gamespace, &application_name, &version_name)
        .await
        .map(Json)
        .map_err(error_response)
}

// Internal directory

/// GET /internal/apps/{application_name}
pub async fn get_app_info<S: Store>(
    Path(application_name): Path<String>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<ApplicationInfo> {
    services
        .directory
        .application_info(gamespace.as_str(), &application_name)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /internal/apps
pub async fn get_apps<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<Vec<ApplicationSummary>> {
    services
        .directory
        .list_applications(gamespace.as_str())
        .await
        .map(Json)
        .map_err(error_response)
}

// Admin: applications

pub async fn list_applications<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<Vec<Application>> {
    services
        .applications
        .list_applications(gamespace.as_str())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn create_application<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(application): RequestJson<NewApplication>,
) -> CreatedResult {
    services
        .applications
        .create_application(gamespace.as_str(), &application)
        .await
        .map(created)
        .map_err(error_response)
}

pub async fn get_application<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<ApplicationDetail> {
    let applications = &services.applications;
    let application = applications
        .get_application(gamespace.as_str(), application_id)
        .await
        .map_err(error_response)?;
    let versions = applications
        .list_application_versions(gamespace.as_str(), application_id)
        .await
        .map_err(error_response)?;
    let api_versions = applications.allowed_api_versions(&application);

    Ok(Json(ApplicationDetail {
        application,
        versions,
        api_versions,
    }))
}

pub async fn update_application<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(update): RequestJson<ApplicationUpdate>,
) -> ApiResult<Application> {
    let applications = &services.applications;
    applications
        .update_application(gamespace.as_str(), application_id, &update)
        .await
        .map_err(error_response)?;

    applications
        .get_application(gamespace.as_str(), application_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_application<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<MessageResponse> {
    services
        .applications
        .delete_application(gamespace.as_str(), application_id)
        .await
        .map_err(error_response)?;

    Ok(MessageResponse::ok(format!(
        "Application {} has been deleted",
        application_id
    )))
}

// Admin: application versions

pub async fn list_application_versions<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<Vec<ApplicationVersion>> {
    let applications = &services.applications;
    applications
        .get_application(gamespace.as_str(), application_id)
        .await
        .map_err(error_response)?;

    applications
        .list_application_versions(gamespace.as_str(), application_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /admin/apps/{app_id}/versions/new
/// Environments and API versions a new version can be bound to
pub async fn new_application_version_form<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<VersionForm> {
    version_form(&services, &gamespace, application_id, None)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn create_application_version<S: Store>(
    Path(application_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(version): RequestJson<NewApplicationVersion>,
) -> CreatedResult {
    services
        .applications
        .create_application_version(gamespace.as_str(), application_id, &version)
        .await
        .map(created)
        .map_err(error_response)
}

pub async fn get_application_version<S: Store>(
    Path((application_id, version_id)): Path<(Id, Id)>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<VersionForm> {
    version_form(&services, &gamespace, application_id, Some(version_id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_application_version<S: Store>(
    Path((application_id, version_id)): Path<(Id, Id)>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(update): RequestJson<ApplicationVersionUpdate>,
) -> ApiResult<ApplicationVersion> {
    let applications = &services.applications;
    applications
        .update_application_version(gamespace.as_str(), application_id, version_id, &update)
        .await
        .map_err(error_response)?;

    applications
        .get_application_version(gamespace.as_str(), application_id, version_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_application_version<S: Store>(
    Path((application_id, version_id)): Path<(Id, Id)>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<MessageResponse> {
    services
        .applications
        .delete_application_version(gamespace.as_str(), application_id, version_id)
        .await
        .map_err(error_response)?;

    Ok(MessageResponse::ok(format!(
        "Version {} of application {} has been deleted",
        version_id, application_id
    )))
}

async fn version_form<S: Store>(
    services: &Services<S>,
    gamespace: &Gamespace,
    application_id: Id,
    version_id: Option<Id>,
) -> Result<VersionForm, ServiceError> {
    let application = services
        .applications
        .get_application(gamespace.as_str(), application_id)
        .await?;

    let version = match version_id {
        Some(version_id) => Some(
            services
                .applications
                .get_application_version(gamespace.as_str(), application_id, version_id)
                .await?,
        ),
        None => None,
    };

    let environments = services.environments.list_environments(gamespace.as_str()).await?;
    let api_versions = services.applications.allowed_api_versions(&application);

    Ok(VersionForm {
        application,
        version,
        environments,
        api_versions,
    })
}

// Admin: environments

pub async fn list_environments<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<Vec<Environment>> {
    services
        .environments
        .list_environments(gamespace.as_str())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn create_environment<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(environment): RequestJson<NewEnvironment>,
) -> CreatedResult {
    services
        .environments
        .create_environment(gamespace.as_str(), &environment)
        .await
        .map(created)
        .map_err(error_response)
}

pub async fn get_environment<S: Store>(
    Path(environment_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<Environment> {
    services
        .environments
        .get_environment(gamespace.as_str(), environment_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_environment<S: Store>(
    Path(environment_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(update): RequestJson<EnvironmentUpdate>,
) -> ApiResult<Environment> {
    let environments = &services.environments;
    environments
        .update_environment(gamespace.as_str(), environment_id, update)
        .await
        .map_err(error_response)?;

    environments
        .get_environment(gamespace.as_str(), environment_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_environment<S: Store>(
    Path(environment_id): Path<Id>,
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<MessageResponse> {
    services
        .environments
        .delete_environment(gamespace.as_str(), environment_id)
        .await
        .map_err(error_response)?;

    Ok(MessageResponse::ok(format!(
        "Environment {} has been deleted",
        environment_id
    )))
}

// Admin: scheme and API catalog

pub async fn get_scheme<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
) -> ApiResult<EnvironmentScheme> {
    services
        .environments
        .get_scheme(gamespace.as_str())
        .await
        .map(|scheme| Json(EnvironmentScheme { scheme }))
        .map_err(error_response)
}

pub async fn set_scheme<S: Store>(
    gamespace: Gamespace,
    State(services): State<AppState<S>>,
    RequestJson(scheme): RequestJson<Value>,
) -> ApiResult<EnvironmentScheme> {
    let environments = &services.environments;
    environments
        .set_scheme(gamespace.as_str(), scheme)
        .await
        .map_err(error_response)?;

    environments
        .get_scheme(gamespace.as_str())
        .await
        .map(|scheme| Json(EnvironmentScheme { scheme }))
        .map_err(error_response)
}

/// GET /admin/api-versions?min=0.2
pub async fn list_api_versions<S: Store>(
    Query(query): Query<ApiVersionsQuery>,
    State(services): State<AppState<S>>,
) -> Json<Vec<String>> {
    Json(services.catalog.list_versions(query.min.as_deref()))
}
