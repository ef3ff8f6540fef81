#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fabric_checkpoint::{
    build_router,
    config::{AppState, CorsConfig},
    db::{MemoryStore, WarehouseState},
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only";
pub const OPERATOR_EMAIL: &str = "operator@example.com";
pub const OPERATOR_PASSWORD: &str = "secret123";

/// The fixture every checkpoint scenario starts from: fabric `F001` with no
/// inventory, racks `R1`/`R2`, block `B1`, one relaxation block and rack,
/// every movement type, and one operator account.
pub fn seed_state() -> WarehouseState {
    let mut state = WarehouseState::default();
    state.register_movement_types();
    state.add_block("B1");
    state.add_rack("R1");
    state.add_rack("R2");
    state.add_relaxation_block("RB1");
    state.add_relaxation_rack("RR1");
    state.add_fabric("F001", "10", "2.5");
    // Low cost keeps login tests fast
    let hash = bcrypt::hash(OPERATOR_PASSWORD, 4).expect("hash operator password");
    state.add_user("Operator", OPERATOR_EMAIL, &hash);
    state
}

/// Router over an in-memory store, plus a bearer token for the seeded operator.
pub struct TestApp {
    router: Router,
    pub store: MemoryStore,
    pub state: AppState,
    token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_state(seed_state())
    }

    pub fn with_state(seed: WarehouseState) -> Self {
        let operator = seed
            .users
            .first()
            .map(|row| row.user.clone())
            .expect("seed has an operator");
        let store = MemoryStore::new(seed);
        let shared = Arc::new(store.clone());
        let state = AppState::with_stores(shared.clone(), shared, JWT_SECRET.to_string(), 1);
        let token = state
            .auth_service
            .create_token(&operator)
            .expect("encode access token");
        let router = build_router(state.clone(), &CorsConfig::Any);

        Self {
            router,
            store,
            state,
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {tok}"));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, Some(self.token())).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), Some(self.token()))
            .await
    }

    pub async fn snapshot(&self) -> WarehouseState {
        self.store.snapshot().await
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is json")
}
