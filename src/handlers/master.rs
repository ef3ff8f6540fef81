// src/handlers/master.rs

use axum::extract::State;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    models::fabric::{PlacementKind, PlacementRef},
};

async fn list(
    app_state: &AppState,
    kind: PlacementKind,
    message: &str,
) -> Result<ApiResponse<Vec<PlacementRef>>, AppError> {
    let rows = app_state.master_service.list(kind).await?;
    Ok(ApiResponse::success(message, rows))
}

#[utoipa::path(
    get,
    path = "/master/blocks",
    tag = "Master",
    responses((status = 200, description = "Live blocks by name", body = Vec<PlacementRef>)),
    security(("api_jwt" = []))
)]
pub async fn list_blocks(
    State(app_state): State<AppState>,
) -> Result<ApiResponse<Vec<PlacementRef>>, AppError> {
    list(&app_state, PlacementKind::Block, "Successfully fetched blocks.").await
}

#[utoipa::path(
    get,
    path = "/master/racks",
    tag = "Master",
    responses((status = 200, description = "Live racks by name", body = Vec<PlacementRef>)),
    security(("api_jwt" = []))
)]
pub async fn list_racks(
    State(app_state): State<AppState>,
) -> Result<ApiResponse<Vec<PlacementRef>>, AppError> {
    list(&app_state, PlacementKind::Rack, "Successfully fetched racks.").await
}

#[utoipa::path(
    get,
    path = "/master/relaxation-blocks",
    tag = "Master",
    responses((status = 200, description = "Live relaxation blocks by name", body = Vec<PlacementRef>)),
    security(("api_jwt" = []))
)]
pub async fn list_relaxation_blocks(
    State(app_state): State<AppState>,
) -> Result<ApiResponse<Vec<PlacementRef>>, AppError> {
    list(
        &app_state,
        PlacementKind::RelaxationBlock,
        "Successfully fetched relaxation blocks.",
    )
    .await
}

#[utoipa::path(
    get,
    path = "/master/relaxation-racks",
    tag = "Master",
    responses((status = 200, description = "Live relaxation racks by name", body = Vec<PlacementRef>)),
    security(("api_jwt" = []))
)]
pub async fn list_relaxation_racks(
    State(app_state): State<AppState>,
) -> Result<ApiResponse<Vec<PlacementRef>>, AppError> {
    list(
        &app_state,
        PlacementKind::RelaxationRack,
        "Successfully fetched relaxation racks.",
    )
    .await
}
