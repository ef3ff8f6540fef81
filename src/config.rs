// src/config.rs

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::{collections::HashMap, env, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;

use crate::{
    db::{PgStore, UserStore, WarehouseStore},
    services::{
        auth::AuthService, checkpoint_service::CheckpointService, master_service::MasterService,
    },
};

const DEV_JWT_SECRET: &str = "fabric-checkpoint-dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfig {
    Any,
    Origins(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_env: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub cors: CorsConfig,
}

impl Config {
    /// Reads `.env` (when present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let text = |var: &str, default: &str| -> String {
            vars.get(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let app_env = text("APP_ENV", "development");
        let jwt_secret = text("JWT_SECRET", DEV_JWT_SECRET);
        if app_env == "production" && jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let jwt_expiry_hours: i64 = parse(vars, "JWT_EXPIRY_HOURS", 24)?;
        if jwt_expiry_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                var: "JWT_EXPIRY_HOURS",
                value: jwt_expiry_hours.to_string(),
            });
        }

        let cors_raw = text("CORS_ALLOWED_ORIGINS", "*");
        let cors = if cors_raw == "*" {
            CorsConfig::Any
        } else {
            CorsConfig::Origins(
                cors_raw
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        };

        Ok(Self {
            port: parse(vars, "APP_PORT", 8080)?,
            database: DatabaseConfig {
                host: text("DB_HOST", "localhost"),
                port: parse(vars, "DB_PORT", 5432)?,
                user: text("DB_USER", "postgres"),
                // An empty password is a valid local setup
                password: vars.get("DB_PASSWORD").cloned().unwrap_or_default(),
                name: text("DB_NAME", "dppiops"),
                max_open_conns: parse(vars, "DB_MAX_OPEN_CONNS", 25)?,
                max_idle_conns: parse(vars, "DB_MAX_IDLE_CONNS", 5)?,
                conn_max_lifetime: Duration::from_secs(parse(
                    vars,
                    "DB_CONN_MAX_LIFETIME_SECS",
                    300,
                )?),
            },
            app_env,
            jwt_secret,
            jwt_expiry_hours,
            cors,
        })
    }
}

fn parse<T: FromStr>(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(var).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
        }),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WarehouseStore>,
    pub checkpoint_service: CheckpointService,
    pub master_service: MasterService,
    pub auth_service: AuthService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db = &config.database;
        let options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name);

        let db_pool = PgPoolOptions::new()
            .max_connections(db.max_open_conns)
            .min_connections(db.max_idle_conns.min(db.max_open_conns))
            .max_lifetime(db.conn_max_lifetime)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        tracing::info!(host = %db.host, database = %db.name, "database connection established");

        let store = Arc::new(PgStore::new(db_pool));
        Ok(Self::with_stores(
            store.clone(),
            store,
            config.jwt_secret.clone(),
            config.jwt_expiry_hours,
        ))
    }

    /// Wires the services over any store implementation.
    pub fn with_stores(
        store: Arc<dyn WarehouseStore>,
        users: Arc<dyn UserStore>,
        jwt_secret: String,
        jwt_expiry_hours: i64,
    ) -> Self {
        Self {
            checkpoint_service: CheckpointService::new(store.clone()),
            master_service: MasterService::new(store.clone()),
            auth_service: AuthService::new(users, jwt_secret, jwt_expiry_hours),
            store,
        }
    }
}
