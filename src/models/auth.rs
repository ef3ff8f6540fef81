// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Operator account, as read from `users`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,
}

// Login payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[serde(default)]
    #[validate(email(message = "The email field is required and must be valid."))]
    #[schema(example = "operator@example.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "The password field is required with minimum 6 characters."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

// Claims carried inside the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub exp: usize,
    pub iat: usize,
}

/// Who is performing the request. Inserted by the auth guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthContext {
    #[serde(rename = "id")]
    pub actor_id: i64,
    pub email: String,
    pub name: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            actor_id: claims.user_id,
            email: claims.email,
            name: claims.name,
        }
    }
}

impl From<User> for AuthContext {
    fn from(user: User) -> Self {
        Self {
            actor_id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}
