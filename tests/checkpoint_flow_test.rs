mod common;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use serde_json::json;

use common::{body_json, seed_state, TestApp, OPERATOR_EMAIL, OPERATOR_PASSWORD};
use fabric_checkpoint::{
    db::memory::RelocationRow,
    models::stage::{EntryType, MovementStatus, QcResult},
};

const MOVE: &str = "/check-point/v1/move";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn move_ok(app: &TestApp, stage: &str, body: serde_json::Value) {
    let response = app.post(&format!("{MOVE}?stage={stage}"), body).await;
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, StatusCode::OK, "move to {stage} failed: {json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], true);
    assert_eq!(json["message"], "Successfully moved items.");
}

async fn move_to_inventory(app: &TestApp) {
    move_ok(
        app,
        "inventory",
        json!({"block_id": 1, "rack_id": 1, "entries": [{"code": "F001", "yard": 12.5}]}),
    )
    .await;
}

// ---
// Scenarios
// ---

#[tokio::test]
async fn first_move_to_inventory_places_the_roll() {
    let app = TestApp::new();
    move_to_inventory(&app).await;

    let state = app.snapshot().await;
    let fabric = state.fabric("F001").unwrap();
    assert_eq!(fabric.rack_id, Some(1));
    assert_eq!(fabric.block_id, Some(1));
    assert_eq!(fabric.yard, "12.5");
    assert_eq!(state.live_inventory(fabric.id).unwrap().stage, "inventory");

    let movements = state.movements_of(fabric.id);
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].status, MovementStatus::Starting);
    assert_eq!(movements[0].remarks, "From ");
    assert_eq!(movements[0].actor_id, 1);

    assert_eq!(state.storages.len(), 1);
    assert_eq!(state.storages[0].movement_id, Some(movements[0].id));
    assert_eq!((state.storages[0].block_id, state.storages[0].rack_id), (1, 1));

    let entries = state.entries_of(movements[0].id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, EntryType::Out);
    assert_eq!(entries[0].from_stage, "");
    assert_eq!(entries[0].to_stage, "inventory");
}

#[tokio::test]
async fn relaxation_closes_the_inventory_movement() {
    let app = TestApp::new();
    move_to_inventory(&app).await;
    move_ok(
        &app,
        "relaxation",
        json!({
            "relaxation_block_id": 1,
            "relaxation_rack_id": 1,
            "entries": [{"code": "F001", "finish_date": "2025-01-10"}]
        }),
    )
    .await;

    let state = app.snapshot().await;
    let fabric = state.fabric("F001").unwrap();
    assert_eq!(fabric.finish_date, Some(date("2025-01-10")));
    assert_eq!(fabric.relaxation_block_id, Some(1));
    assert_eq!(fabric.relaxation_rack_id, Some(1));

    let movements = state.movements_of(fabric.id);
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].status, MovementStatus::Finished);
    let closed = state.time_of(movements[0].id).unwrap();
    assert!(closed.finish_date.is_some() && closed.finish_time.is_some());
    assert_eq!(movements[1].status, MovementStatus::Starting);
    assert_eq!(movements[1].remarks, "From inventory");

    assert_eq!(state.relaxations.len(), 1);
    assert_eq!(state.relaxations[0].movement_id, Some(movements[1].id));
    assert_eq!(state.relaxations[0].finish_date, date("2025-01-10"));

    let entries = state.entries_of(movements[1].id);
    assert_eq!(entries[0].entry_type, EntryType::Out);
    assert_eq!(
        (entries[0].from_stage.as_str(), entries[0].to_stage.as_str()),
        ("inventory", "relaxation")
    );
    assert_eq!(state.live_inventory(fabric.id).unwrap().stage, "relaxation");
}

#[tokio::test]
async fn same_stage_rescan_is_recorded_as_a_return() {
    let app = TestApp::new();
    let body = json!({"entries": [{"code": "F001"}]});
    move_ok(&app, "cutting_wip", body.clone()).await;
    move_ok(&app, "cutting_wip", body).await;

    let state = app.snapshot().await;
    let movements = state.movements_of(1);
    assert_eq!(movements.len(), 2);
    assert!(movements[1].remarks.starts_with("Return "));
    assert_eq!(movements[1].remarks, "Return cutting_wip");
    let entries = state.entries_of(movements[1].id);
    assert_eq!(entries[0].entry_type, EntryType::Actual);
    assert_eq!(entries[0].from_stage, "cutting_wip");
    assert_eq!(
        state
            .movements
            .iter()
            .filter(|m| m.status == MovementStatus::Starting)
            .count(),
        1
    );
}

#[tokio::test]
async fn qc_move_records_a_failing_result() {
    let app = TestApp::new();
    move_ok(
        &app,
        "qc_fabric",
        json!({"entries": [{"code": "F001", "qc_result": "fail"}]}),
    )
    .await;

    let state = app.snapshot().await;
    let fabric = state.fabric("F001").unwrap();
    assert_eq!(fabric.qc_result.as_deref(), Some("fail"));
    let movement = *state.movements_of(fabric.id).last().unwrap();
    assert_eq!(state.controls.len(), 1);
    assert_eq!(state.controls[0].result, QcResult::Fail);
    assert_eq!(state.controls[0].movement_id, Some(movement.id));
}

#[tokio::test]
async fn qc_result_defaults_to_pass() {
    let app = TestApp::new();
    move_ok(&app, "qc_fabric", json!({"entries": [{"code": "F001"}]})).await;

    let state = app.snapshot().await;
    assert_eq!(state.fabric("F001").unwrap().qc_result.as_deref(), Some("pass"));
    assert_eq!(state.controls[0].result, QcResult::Pass);
}

#[tokio::test]
async fn unknown_code_aborts_the_whole_batch() {
    let app = TestApp::new();
    let before = app.snapshot().await;

    let response = app
        .post(
            &format!("{MOVE}?stage=washing"),
            json!({"entries": [{"code": "F001"}, {"code": "F404"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert_eq!(json["message"], "QR code F404 is not found");

    assert_eq!(app.snapshot().await, before);
}

#[tokio::test]
async fn relocation_moves_every_roll_and_archives_old_rows() {
    let mut seed = seed_state();
    seed.add_fabric("F002", "5", "1");
    seed.add_fabric("F003", "5", "1");
    for code in ["F001", "F002", "F003"] {
        seed.fabric_mut(code).unwrap().rack_id = Some(1);
    }
    seed.relocations.push(RelocationRow {
        id: 1,
        fabric_id: 1,
        current_rack_id: 2,
        new_rack_id: 1,
        is_archived: None,
        actor_id: 1,
        deleted: false,
    });
    let app = TestApp::with_state(seed);

    let response = app
        .post(
            "/check-point/v1/relocation",
            json!({"current_rack_id": 1, "new_rack_id": 2}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Successfully relocated items.");

    let state = app.snapshot().await;
    for code in ["F001", "F002", "F003"] {
        assert_eq!(state.fabric(code).unwrap().rack_id, Some(2));
    }
    assert_eq!(state.relocations.len(), 4);
    assert_eq!(state.relocations[0].is_archived, Some(1));
    let fresh: Vec<_> = state.relocations[1..]
        .iter()
        .map(|r| (r.fabric_id, r.current_rack_id, r.new_rack_id, r.is_archived))
        .collect();
    assert_eq!(fresh, vec![(1, 1, 2, None), (2, 1, 2, None), (3, 1, 2, None)]);
    // Relocation never opens movements
    assert!(state.movements.is_empty());
}

#[tokio::test]
async fn relocation_from_an_empty_rack_writes_nothing() {
    let app = TestApp::new();
    let before = app.snapshot().await;

    let response = app
        .post(
            "/check-point/v1/relocation",
            json!({"current_rack_id": 1, "new_rack_id": 2}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["message"], "no fabric found in the selected current rack");
    assert_eq!(app.snapshot().await, before);
}

// ---
// Facade rules
// ---

#[tokio::test]
async fn scan_discloses_stage_specific_fields_only() {
    let app = TestApp::new();

    let plain = body_json(app.post("/check-point/v1/scan", json!({"code": "F001"})).await).await;
    assert_eq!(plain["message"], "Successfully founded QR.");
    assert_eq!(plain["data"]["qr_code"], "F001");
    assert_eq!(plain["data"]["yard"], "10");
    assert!(plain["data"].get("qc_result").is_none());
    assert!(plain["data"].get("finish_date").is_none());

    move_ok(
        &app,
        "relaxation",
        json!({
            "relaxation_block_id": 1,
            "relaxation_rack_id": 1,
            "entries": [{"code": "F001", "finish_date": "2025-01-10"}]
        }),
    )
    .await;
    let relaxing = body_json(app.post("/check-point/v1/scan", json!({"code": "F001"})).await).await;
    assert_eq!(relaxing["data"]["finish_date"], "2025-01-10");
    assert!(relaxing["data"].get("qc_result").is_none());

    move_ok(&app, "qc_fabric", json!({"entries": [{"code": "F001", "qc_result": "fail"}]})).await;
    let in_qc = body_json(app.post("/check-point/v1/scan", json!({"code": "F001"})).await).await;
    assert_eq!(in_qc["data"]["qc_result"], "fail");
    assert!(in_qc["data"].get("finish_date").is_none());
}

#[tokio::test]
async fn repeated_scans_return_identical_output() {
    let app = TestApp::new();
    move_to_inventory(&app).await;

    let first = body_json(app.post("/check-point/v1/scan", json!({"code": "F001"})).await).await;
    let second = body_json(app.post("/check-point/v1/scan", json!({"code": "F001"})).await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn scan_of_unknown_code_is_404() {
    let app = TestApp::new();
    let response = app.post("/check-point/v1/scan", json!({"code": "F404"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let missing = app.post("/check-point/v1/scan", json!({})).await;
    assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(missing).await;
    assert_eq!(json["errors"]["code"][0], "The code field is required.");
}

#[tokio::test]
async fn scan_rack_lists_rolls_with_a_summary() {
    let app = TestApp::new();
    move_to_inventory(&app).await;

    let response = app.post("/check-point/v1/scan-rack", json!({"code": "R1"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Successfully founded Rack QR.");
    assert_eq!(json["data"]["result"][0]["code"], "F001");
    assert_eq!(json["data"]["result"][0]["block_name"], "B1");
    assert_eq!(json["data"]["summary"]["total_items"], 1);
    assert_eq!(json["data"]["summary"]["total_yard"], 12.5);
    assert_eq!(json["data"]["summary"]["total_weight"], 2.5);
    assert_eq!(json["data"]["summary"]["block_name"], "B1");
    assert_eq!(json["data"]["summary"]["rack_number"], "R1");

    let empty = body_json(app.post("/check-point/v1/scan-rack", json!({"code": "R2"})).await).await;
    assert_eq!(empty["data"]["summary"]["total_items"], 0);
    assert_eq!(empty["data"]["summary"]["block_name"], "-");

    let unknown = app.post("/check-point/v1/scan-rack", json!({"code": "R9"})).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_input_is_validated_before_any_write() {
    let app = TestApp::new();
    let before = app.snapshot().await;

    let cases = [
        (MOVE.to_string(), json!({"entries": [{"code": "F001"}]}), "stage"),
        (format!("{MOVE}?stage=warehouse"), json!({"entries": [{"code": "F001"}]}), "stage"),
        (format!("{MOVE}?stage=washing"), json!({"entries": []}), "entries"),
        (format!("{MOVE}?stage=inventory"), json!({"rack_id": 1, "entries": [{"code": "F001"}]}), "block_id"),
        (
            format!("{MOVE}?stage=relaxation"),
            json!({"relaxation_block_id": 1, "entries": [{"code": "F001", "finish_date": "2025-01-10"}]}),
            "relaxation_rack_id",
        ),
        (
            format!("{MOVE}?stage=relaxation"),
            json!({"relaxation_block_id": 1, "relaxation_rack_id": 1, "entries": [{"code": "F001"}]}),
            "entries",
        ),
    ];

    for (uri, body, field) in cases {
        let response = app.post(&uri, body).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        let json = body_json(response).await;
        assert!(json["errors"].get(field).is_some(), "{uri}: {json}");
    }

    assert_eq!(app.snapshot().await, before);
}

#[tokio::test]
async fn move_to_a_missing_rack_is_rejected() {
    let app = TestApp::new();
    let response = app
        .post(
            &format!("{MOVE}?stage=inventory"),
            json!({"block_id": 1, "rack_id": 99, "entries": [{"code": "F001"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["message"], "rack 99 is not found");
}

#[tokio::test]
async fn same_rack_relocation_is_invalid() {
    let app = TestApp::new();
    let response = app
        .post(
            "/check-point/v1/relocation",
            json!({"current_rack_id": 1, "new_rack_id": 1}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["errors"].get("new_rack_id").is_some());
}

#[tokio::test]
async fn overview_lists_stages_with_fixed_ids() {
    let app = TestApp::new();
    let response = app.get("/check-point/v1/overview").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let names: Vec<(i64, String)> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["id"].as_i64().unwrap(), s["name"].as_str().unwrap().to_string()))
        .collect();
    let expected = [
        "inventory",
        "cutting_wip",
        "stock_fabric",
        "cncm",
        "washing",
        "return_supplier",
        "destroy",
        "relaxation",
        "qc_fabric",
    ];
    for (i, name) in expected.iter().enumerate() {
        assert_eq!(names[i], (i as i64 + 1, name.to_string()));
    }
}

// ---
// Auth and the rest of the surface
// ---

#[tokio::test]
async fn checkpoint_routes_require_a_bearer_token() {
    let app = TestApp::new();
    let response = app
        .request(Method::GET, "/check-point/v1/overview", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            &format!("{MOVE}?stage=washing"),
            Some(json!({"entries": [{"code": "F001"}]})),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_me_returns_the_operator() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"email": OPERATOR_EMAIL, "password": OPERATOR_PASSWORD})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["token_type"], "Bearer");
    let token = json["data"]["access_token"].as_str().unwrap().to_string();

    let me = app.request(Method::GET, "/auth/me", None, Some(&token)).await;
    assert_eq!(me.status(), StatusCode::OK);
    let me = body_json(me).await;
    assert_eq!(me["data"]["id"], 1);
    assert_eq!(me["data"]["email"], OPERATOR_EMAIL);

    let wrong = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"email": OPERATOR_EMAIL, "password": "wrong-password"})),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn master_data_health_and_docs_are_served() {
    let app = TestApp::new();

    let racks = body_json(app.get("/master/racks").await).await;
    assert_eq!(racks["data"], json!([{"id": 1, "name": "R1"}, {"id": 2, "name": "R2"}]));
    let relaxation = body_json(app.get("/master/relaxation-racks").await).await;
    assert_eq!(relaxation["data"][0]["name"], "RR1");

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "healthy");

    let docs = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(docs.status(), StatusCode::OK);
    assert!(body_json(docs).await["paths"].get("/check-point/v1/move").is_some());
}
