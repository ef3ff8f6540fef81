// src/handlers/checkpoint.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        fabric::{ScanRackResult, ScanResult},
        stage::{Stage, StageInfo},
    },
    services::stage_engine::{MoveCommand, MoveEntry, MovePlacement},
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "The code field is required."))]
    #[schema(example = "F24120001")]
    pub code: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MoveQuery {
    /// Destination stage, e.g. `inventory`.
    pub stage: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MovePayload {
    pub block_id: Option<i64>,
    pub rack_id: Option<i64>,
    pub relaxation_block_id: Option<i64>,
    pub relaxation_rack_id: Option<i64>,
    #[serde(default)]
    pub entries: Vec<MoveEntry>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RelocationPayload {
    #[validate(required(message = "The current rack id field is required."))]
    pub current_rack_id: Option<i64>,
    #[validate(required(message = "The new rack id field is required."))]
    pub new_rack_id: Option<i64>,
}

fn parse_stage(raw: Option<&str>) -> Result<Stage, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Err(AppError::invalid("stage", "The stage is required.")),
        Some(name) => name
            .parse()
            .map_err(|_| AppError::invalid("stage", "The selected stage is invalid.")),
    }
}

// ---
// Handlers
// ---

#[utoipa::path(
    get,
    path = "/check-point/v1/overview",
    tag = "Checkpoint",
    responses(
        (status = 200, description = "Stages in display order", body = Vec<StageInfo>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("api_jwt" = []))
)]
pub async fn overview(State(app_state): State<AppState>) -> ApiResponse<Vec<StageInfo>> {
    ApiResponse::success(
        "Successfully fetched overview.",
        app_state.checkpoint_service.overview(),
    )
}

#[utoipa::path(
    post,
    path = "/check-point/v1/scan",
    tag = "Checkpoint",
    request_body = ScanPayload,
    responses(
        (status = 200, description = "Scanned roll", body = ScanResult),
        (status = 404, description = "Unknown QR code"),
        (status = 422, description = "Missing code")
    ),
    security(("api_jwt" = []))
)]
pub async fn scan(
    State(app_state): State<AppState>,
    payload: Result<Json<ScanPayload>, JsonRejection>,
) -> Result<ApiResponse<ScanResult>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let result = app_state.checkpoint_service.scan_qr(&payload.code).await?;

    Ok(ApiResponse::success("Successfully founded QR.", result))
}

#[utoipa::path(
    post,
    path = "/check-point/v1/scan-rack",
    tag = "Checkpoint",
    request_body = ScanPayload,
    responses(
        (status = 200, description = "Rolls on the rack with totals", body = ScanRackResult),
        (status = 404, description = "Unknown rack QR"),
        (status = 422, description = "Missing code")
    ),
    security(("api_jwt" = []))
)]
pub async fn scan_rack(
    State(app_state): State<AppState>,
    payload: Result<Json<ScanPayload>, JsonRejection>,
) -> Result<ApiResponse<ScanRackResult>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let result = app_state.checkpoint_service.scan_rack(&payload.code).await?;

    Ok(ApiResponse::success("Successfully founded Rack QR.", result))
}

#[utoipa::path(
    post,
    path = "/check-point/v1/move",
    tag = "Checkpoint",
    params(MoveQuery),
    request_body = MovePayload,
    responses(
        (status = 200, description = "Every entry moved", body = bool),
        (status = 422, description = "Invalid input, or the batch was rolled back")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_stage(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    query: Result<Query<MoveQuery>, QueryRejection>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> Result<ApiResponse<bool>, AppError> {
    let Query(query) = query?;
    let stage = parse_stage(query.stage.as_deref())?;
    let Json(payload) = payload?;

    let placement = MovePlacement {
        block_id: payload.block_id,
        rack_id: payload.rack_id,
        relaxation_block_id: payload.relaxation_block_id,
        relaxation_rack_id: payload.relaxation_rack_id,
    };
    let cmd = MoveCommand::new(stage, placement, payload.entries)?;

    app_state.checkpoint_service.move_stage(&cmd, &actor).await?;

    Ok(ApiResponse::success("Successfully moved items.", true))
}

#[utoipa::path(
    post,
    path = "/check-point/v1/relocation",
    tag = "Checkpoint",
    request_body = RelocationPayload,
    responses(
        (status = 200, description = "Every roll on the rack moved", body = bool),
        (status = 422, description = "Invalid input, same rack, or empty source rack")
    ),
    security(("api_jwt" = []))
)]
pub async fn relocate(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    payload: Result<Json<RelocationPayload>, JsonRejection>,
) -> Result<ApiResponse<bool>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let (Some(current_rack_id), Some(new_rack_id)) = (payload.current_rack_id, payload.new_rack_id)
    else {
        return Err(AppError::invalid("current_rack_id", "The current rack id field is required."));
    };

    app_state
        .checkpoint_service
        .relocate(current_rack_id, new_rack_id, &actor)
        .await?;

    Ok(ApiResponse::success("Successfully relocated items.", true))
}
