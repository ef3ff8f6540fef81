// src/services/auth.rs

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::UserStore,
    models::auth::{AuthContext, Claims, LoginResponse, User},
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    expiry_hours: i64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: String, expiry_hours: i64) -> Self {
        Self {
            users,
            jwt_secret,
            expiry_hours,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // bcrypt is CPU bound, keep it off the async workers
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "operator logged in");

        Ok(LoginResponse {
            token_type: "Bearer".to_string(),
            access_token: self.create_token(&user)?,
            expires_in: self.expiry_hours * 3600,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthContext, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(AuthContext::from(token_data.claims))
    }

    /// The live account behind a token. A deleted account no longer
    /// authenticates.
    pub async fn current_user(&self, ctx: &AuthContext) -> Result<User, AppError> {
        self.users
            .find_user_by_id(ctx.actor_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.expiry_hours);

        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
