// src/db/user_repo.rs

use sqlx::PgPool;

use crate::{
    common::{db_utils::live, error::AppError},
    models::auth::User,
};

// Read-only access to the operator accounts in `users`
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT u.id, u.name, u.email, u.password AS password_hash FROM users u WHERE u.email = $1 AND {}",
            live("u")
        );

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT u.id, u.name, u.email, u.password AS password_hash FROM users u WHERE u.id = $1 AND {}",
            live("u")
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }
}
