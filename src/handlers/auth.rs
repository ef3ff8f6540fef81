// src/handlers/auth.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthContext, LoginResponse, LoginUserPayload},
};

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 401, description = "Wrong email or password"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    payload: Result<Json<LoginUserPayload>, JsonRejection>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let token = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(ApiResponse::success("Successfully logged in.", token))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The authenticated operator", body = AuthContext),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<ApiResponse<AuthContext>, AppError> {
    let user = app_state.auth_service.current_user(&ctx).await?;

    Ok(ApiResponse::success(
        "Successfully fetched user.",
        AuthContext::from(user),
    ))
}
