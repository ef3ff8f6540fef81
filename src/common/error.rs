// src/common/error.rs

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("The given data was invalid.")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    #[error("Username or Password is wrong!")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    NotFound(String),

    // Business-rule failure inside a batch. Reported as 422 to keep the
    // contract the scanner apps already rely on.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Invalid { .. } | AppError::Conflict(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps constraint violations raised by the database onto business errors.
    pub fn from_write(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_foreign_key_violation() {
                return AppError::Conflict(format!("{what} references a missing record"));
            }
            if db_err.is_unique_violation() {
                return AppError::Conflict(format!("{what} already exists"));
            }
        }
        e.into()
    }
}

// Binding failures are input errors, same as failed validation.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid("query", rejection.body_text())
    }
}

fn error_body(status: StatusCode, message: String, errors: Value) -> Response {
    let body = Json(json!({
        "status": "error",
        "error": true,
        "message": message,
        "errors": errors,
    }));
    (status, body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("The {field} field is invalid."))
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let message = details
                    .values()
                    .flatten()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| "The given data was invalid.".to_string());
                error_body(status, message, json!(details))
            }
            AppError::Invalid { field, message } => {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), json!([message.clone()]));
                error_body(status, message, Value::Object(details))
            }
            AppError::NotFound(message) | AppError::Conflict(message) => {
                error_body(status, message.clone(), json!([message]))
            }
            e @ (AppError::InvalidCredentials | AppError::InvalidToken) => {
                error_body(status, e.to_string(), Value::Null)
            }
            // Everything else is a 500; details only go to the log.
            ref e => {
                tracing::error!(error = ?e, "internal server error: {}", e);
                error_body(status, "An unexpected error occurred.".to_string(), Value::Null)
            }
        }
    }
}
