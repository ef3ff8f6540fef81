// src/lib.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{
    config::{AppState, CorsConfig},
    docs::ApiDoc,
    middleware::auth::auth_guard,
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match cors {
        CorsConfig::Any => layer.allow_origin(Any),
        CorsConfig::Origins(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "ignoring malformed CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}

/// The full HTTP surface, ready to serve.
pub fn build_router(app_state: AppState, cors: &CorsConfig) -> Router {
    let auth_routes = Router::new().route("/login", post(handlers::auth::login)).merge(
        Router::new()
            .route("/me", get(handlers::auth::get_me))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth_guard,
            )),
    );

    let checkpoint_routes = Router::new()
        .route("/overview", get(handlers::checkpoint::overview))
        .route("/scan", post(handlers::checkpoint::scan))
        .route("/move", post(handlers::checkpoint::move_stage))
        .route("/scan-rack", post(handlers::checkpoint::scan_rack))
        .route("/relocation", post(handlers::checkpoint::relocate))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let master_routes = Router::new()
        .route("/blocks", get(handlers::master::list_blocks))
        .route("/racks", get(handlers::master::list_racks))
        .route(
            "/relaxation-blocks",
            get(handlers::master::list_relaxation_blocks),
        )
        .route(
            "/relaxation-racks",
            get(handlers::master::list_relaxation_racks),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/auth", auth_routes)
        .nest("/check-point/v1", checkpoint_routes)
        .nest("/master", master_routes)
        .with_state(app_state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}
