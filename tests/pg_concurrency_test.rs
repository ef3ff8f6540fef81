//! Checks that need real Postgres row locks. They run when `DATABASE_URL`
//! points at a database the test user may create schemas in, and are
//! skipped otherwise.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use fabric_checkpoint::{
    common::db_utils::now,
    db::{FabricRepository, PgStore, WarehouseStore},
    models::{auth::AuthContext, stage::Stage},
    services::{
        checkpoint_service::CheckpointService,
        stage_engine::{apply_move, MoveCommand, MoveEntry, MovePlacement},
    },
};

const SCHEMA_SQL: &str = include_str!("fixtures/checkpoint_schema.sql");

/// A freshly seeded schema, dropped again by [`TestDb::drop_schema`].
struct TestDb {
    admin: PgPool,
    pool: PgPool,
    schema: String,
}

impl TestDb {
    async fn connect(tag: &str) -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL is not set, skipping {tag}");
            return None;
        };

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .subsec_nanos();
        let schema = format!("checkpoint_{tag}_{}_{nanos}", std::process::id());

        let admin = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
        sqlx::raw_sql(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("create test schema");

        let options: PgConnectOptions = url.parse().expect("parse DATABASE_URL");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options.options([("search_path", schema.as_str())]))
            .await
            .expect("connect to test schema");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .expect("load checkpoint schema");

        Some(Self {
            admin,
            pool,
            schema,
        })
    }

    async fn drop_schema(self) {
        self.pool.close().await;
        sqlx::raw_sql(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .expect("drop test schema");
    }
}

fn actor() -> AuthContext {
    AuthContext {
        actor_id: 1,
        email: "operator@example.com".into(),
        name: "Operator".into(),
    }
}

fn plain_move(stage: Stage) -> MoveCommand {
    let entry = MoveEntry {
        code: "F001".to_string(),
        yard: None,
        finish_date: None,
        qc_result: None,
    };
    MoveCommand::new(stage, MovePlacement::default(), vec![entry]).unwrap()
}

#[tokio::test]
async fn waiting_move_sees_the_stage_committed_before_it() {
    let Some(db) = TestDb::connect("waiting_move").await else {
        return;
    };
    let store = Arc::new(PgStore::new(db.pool.clone()));
    let service = CheckpointService::new(store.clone());

    service
        .move_stage(&plain_move(Stage::CuttingWip), &actor())
        .await
        .unwrap();

    // First operator holds the roll while moving it to washing
    let mut first = store.begin().await.unwrap();
    apply_move(first.as_mut(), &plain_move(Stage::Washing), 1)
        .await
        .unwrap();

    // Second operator scans the same roll into washing and has to wait
    let waiting = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .move_stage(&plain_move(Stage::Washing), &actor())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!waiting.is_finished(), "second move did not wait for the lock");

    first.commit().await.unwrap();
    waiting.await.unwrap().unwrap();

    let chain: Vec<(String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT e.from_stage, e.to_stage, e.type, m.remarks, m.status
        FROM inventory_entries e
        JOIN inventory_movements m ON m.id = e.inventory_movement_id
        ORDER BY m.id ASC
        "#,
    )
    .fetch_all(&db.pool)
    .await
    .unwrap();

    let expected = [
        ("", "cutting_wip", "out", "From ", "finished"),
        ("cutting_wip", "washing", "out", "From cutting_wip", "finished"),
        ("washing", "washing", "actual", "Return washing", "starting"),
    ];
    assert_eq!(chain.len(), expected.len());
    for (row, want) in chain.iter().zip(expected) {
        let got = (
            row.0.as_str(),
            row.1.as_str(),
            row.2.as_str(),
            row.3.as_str(),
            row.4.as_str(),
        );
        assert_eq!(got, want);
    }

    let stage: String = sqlx::query_scalar("SELECT stage FROM inventories WHERE fabric_id = 1")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(stage, "washing");

    db.drop_schema().await;
}

#[tokio::test]
async fn rack_update_skips_deleted_fabrics() {
    let Some(db) = TestDb::connect("deleted_rack").await else {
        return;
    };

    let fabric_id: i64 = sqlx::query_scalar(
        "INSERT INTO fabrics (code, weight, yard, rack_id, deleted_at) VALUES ('F900', '1', '1', 1, NOW()) RETURNING id",
    )
    .fetch_one(&db.pool)
    .await
    .unwrap();

    FabricRepository::new(db.pool.clone())
        .update_rack(&db.pool, fabric_id, 2, now())
        .await
        .unwrap();

    let rack_id: Option<i64> = sqlx::query_scalar("SELECT rack_id FROM fabrics WHERE id = $1")
        .bind(fabric_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(rack_id, Some(1));

    db.drop_schema().await;
}
