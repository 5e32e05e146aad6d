use axum::{
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Directory for other platform services
        .route("/internal/apps", get(handlers::get_apps::<S>))
        .route(
            "/internal/apps/:application_name",
            get(handlers::get_app_info::<S>),
        )
        // Applications
        .route(
            "/admin/apps",
            get(handlers::list_applications::<S>).post(handlers::create_application::<S>),
        )
        .route(
            "/admin/apps/:app_id",
            get(handlers::get_application::<S>)
                .put(handlers::update_application::<S>)
                .delete(handlers::delete_application::<S>),
        )
        // Application versions
        .route(
            "/admin/apps/:app_id/versions",
            get(handlers::list_application_versions::<S>)
                .post(handlers::create_application_version::<S>),
        )
        .route(
            "/admin/apps/:app_id/versions/new",
            get(handlers::new_application_version_form::<S>),
        )
        .route(
            "/admin/apps/:app_id/versions/:version_id",
            get(handlers::get_application_version::<S>)
                .put(handlers::update_application_version::<S>)
                .delete(handlers::delete_application_version::<S>),
        )
        // Environments
        .route(
            "/admin/envs",
            get(handlers::list_environments::<S>).post(handlers::create_environment::<S>),
        )
        .route(
            "/admin/envs/:env_id",
            get(handlers::get_environment::<S>)
                .put(handlers::update_environment::<S>)
                .delete(handlers::delete_environment::<S>),
        )
        // Environment scheme
        .route(
            "/admin/scheme",
            get(handlers::get_scheme::<S>)
                .put(handlers::set_scheme::<S>)
                .post(handlers::set_scheme::<S>),
        )
        // API catalog
        .route("/admin/api-versions", get(handlers::list_api_versions::<S>))
        // Public discovery
        .route(
            "/:application_name/:version_name",
            get(handlers::discover::<S>),
        )
        .layer(ServiceBuilder::new().layer(CatchPanicLayer::new()))
}
