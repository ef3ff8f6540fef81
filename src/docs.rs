// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Checkpoint ---
        handlers::checkpoint::overview,
        handlers::checkpoint::scan,
        handlers::checkpoint::scan_rack,
        handlers::checkpoint::move_stage,
        handlers::checkpoint::relocate,

        // --- Master ---
        handlers::master::list_blocks,
        handlers::master::list_racks,
        handlers::master::list_relaxation_blocks,
        handlers::master::list_relaxation_racks,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginUserPayload,
            models::auth::LoginResponse,
            models::auth::AuthContext,

            // --- Checkpoint ---
            models::stage::Stage,
            models::stage::StageInfo,
            models::stage::QcResult,
            models::fabric::Fabric,
            models::fabric::RackFabric,
            models::fabric::ScanResult,
            models::fabric::RackSummary,
            models::fabric::ScanRackResult,
            models::fabric::PlacementRef,

            // --- Payloads ---
            handlers::checkpoint::ScanPayload,
            handlers::checkpoint::MovePayload,
            handlers::checkpoint::RelocationPayload,
            services::stage_engine::MoveEntry,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Operator login"),
        (name = "Checkpoint", description = "Scanning and stage transitions"),
        (name = "Master", description = "Blocks and racks")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
