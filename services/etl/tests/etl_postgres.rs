//! End-to-end pipeline test against live Postgres databases.
//!
//! Seeds an operational snapshot, drives the compiled `etl` binary and
//! asserts the warehouse contents. Needs two reachable databases:
//!   ETL_TEST_OLTP_URL - operational side (tables created/truncated here)
//!   ETL_TEST_DWH_URL  - warehouse side (the dwh schema is dropped here)
//! Skipped when either variable is unset.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::process::Command;

async fn connect(url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(url)
        .await
        .expect("failed to connect to test database")
}

/// Plain operational tables, no foreign keys: the pipeline never relies on
/// source-side constraints, and the drop-policy scenario needs a movement
/// whose product id matches nothing.
async fn reset_oltp(pool: &PgPool) {
    for ddl in [
        r#"
        CREATE TABLE IF NOT EXISTS product (
            id           INTEGER PRIMARY KEY,
            sku          VARCHAR(50) NOT NULL,
            name         VARCHAR(200) NOT NULL,
            category     VARCHAR(100),
            min_quantity INTEGER,
            max_quantity INTEGER,
            supplier_id  INTEGER
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS warehouse (
            id           INTEGER PRIMARY KEY,
            code         VARCHAR(20) NOT NULL,
            name         VARCHAR(100) NOT NULL,
            location     VARCHAR(200),
            max_capacity INTEGER
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS supplier (
            id             INTEGER PRIMARY KEY,
            name           VARCHAR(200) NOT NULL,
            contact_person VARCHAR(100),
            phone          VARCHAR(50),
            rating         NUMERIC(3,1)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS inventory_movement (
            id            INTEGER PRIMARY KEY,
            product_id    INTEGER NOT NULL,
            warehouse_id  INTEGER NOT NULL,
            movement_type VARCHAR(50) NOT NULL,
            quantity      INTEGER NOT NULL,
            unit_price    NUMERIC(10,2),
            total_value   NUMERIC(10,2),
            movement_date TIMESTAMP
        )
        "#,
    ] {
        sqlx::query(ddl).execute(pool).await.expect("oltp ddl failed");
    }

    for table in ["inventory_movement", "product", "warehouse", "supplier"] {
        sqlx::query(&format!("TRUNCATE {}", table))
            .execute(pool)
            .await
            .expect("oltp truncate failed");
    }
}

async fn reset_dwh(pool: &PgPool) {
    sqlx::query("DROP SCHEMA IF EXISTS dwh CASCADE")
        .execute(pool)
        .await
        .expect("dwh reset failed");
}

/// Snapshot from the end-to-end scenario: 3 products, 1 warehouse, movement A
/// on product 1 and movement B on nonexistent product 99.
async fn seed_snapshot(oltp: &PgPool) {
    sqlx::query(
        "INSERT INTO supplier (id, name, contact_person, phone, rating) \
         VALUES (1, 'Acme Components', 'R. Ortiz', '+56 2 2345 6789', 4.5)",
    )
    .execute(oltp)
    .await
    .unwrap();

    for (id, sku, name, category, supplier_id) in [
        (1, "SKU-001", "Hex bolts M8", Some("fasteners"), Some(1)),
        (2, "SKU-002", "Packing tape", Some("consumables"), None),
        (3, "SKU-003", "Pallet jack", None, Some(1)),
    ] {
        sqlx::query(
            "INSERT INTO product (id, sku, name, category, min_quantity, max_quantity, supplier_id) \
             VALUES ($1, $2, $3, $4, 5, 50, $5)",
        )
        .bind(id)
        .bind(sku)
        .bind(name)
        .bind(category)
        .bind(supplier_id)
        .execute(oltp)
        .await
        .unwrap();
    }

    sqlx::query(
        "INSERT INTO warehouse (id, code, name, location, max_capacity) \
         VALUES (10, 'W10', 'Central', 'Santiago', 1000)",
    )
    .execute(oltp)
    .await
    .unwrap();

    // Movement A: resolvable. Movement B: product 99 has no dimension row.
    sqlx::query(
        "INSERT INTO inventory_movement \
         (id, product_id, warehouse_id, movement_type, quantity, unit_price, total_value, movement_date) \
         VALUES (100, 1, 10, 'in', 5, 12.50, 62.50, '2024-03-15 10:30:00')",
    )
    .execute(oltp)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO inventory_movement \
         (id, product_id, warehouse_id, movement_type, quantity, unit_price, total_value, movement_date) \
         VALUES (101, 99, 10, 'in', 3, 1.00, 3.00, '2024-03-15 11:00:00')",
    )
    .execute(oltp)
    .await
    .unwrap();
}

fn run_etl_binary(oltp_url: &str, dwh_url: &str) {
    let status = Command::new(env!("CARGO_BIN_EXE_etl"))
        .env("OLTP_DB_URL", oltp_url)
        .env("DWH_DB_URL", dwh_url)
        .status()
        .expect("failed to launch etl binary");
    assert!(status.success(), "etl run failed");
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT count(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

#[tokio::test]
async fn full_pipeline_round_trip() {
    // Skip if the test databases are not set (CI condition)
    let oltp_url = std::env::var("ETL_TEST_OLTP_URL").unwrap_or_default();
    let dwh_url = std::env::var("ETL_TEST_DWH_URL").unwrap_or_default();
    if oltp_url.is_empty() || dwh_url.is_empty() {
        eprintln!("ETL_TEST_OLTP_URL / ETL_TEST_DWH_URL not set; skipping integration test");
        return;
    }

    let oltp = connect(&oltp_url).await;
    let dwh = connect(&dwh_url).await;

    reset_oltp(&oltp).await;
    reset_dwh(&dwh).await;
    seed_snapshot(&oltp).await;

    // --- Run 1: the scenario snapshot ---------------------------------------
    run_etl_binary(&oltp_url, &dwh_url);

    assert_eq!(count(&dwh, "dwh.dim_product").await, 3);
    assert_eq!(count(&dwh, "dwh.dim_warehouse").await, 1);
    assert_eq!(count(&dwh, "dwh.dim_supplier").await, 1);

    // Movement B was dropped (no product key), movement A survived
    assert_eq!(count(&dwh, "dwh.fact_inventory_movement").await, 1);

    let (quantity, source_id, date_key, supplier_key, unit_price): (
        i32,
        i32,
        i32,
        Option<i32>,
        Option<Decimal>,
    ) = sqlx::query_as(
        "SELECT quantity, source_movement_id, date_key, supplier_key, unit_price \
         FROM dwh.fact_inventory_movement",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert_eq!(quantity, 5);
    assert_eq!(source_id, 100);
    assert_eq!(date_key, 20240315);
    assert!(supplier_key.is_some(), "product 1 has a supplier");
    assert_eq!(unit_price, Some(Decimal::new(1250, 2)));

    // The fact references the 'in' label registered by the dimension pass
    let (label,): (String,) = sqlx::query_as(
        "SELECT mt.movement_type \
         FROM dwh.fact_inventory_movement f \
         JOIN dwh.dim_movement_type mt ON mt.movement_type_key = f.movement_type_key",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert_eq!(label, "in");

    // dim_date row is fully decomposed
    let (year, month, day, quarter): (i32, i32, i32, i32) = sqlx::query_as(
        "SELECT year, month, day, quarter FROM dwh.dim_date WHERE date_key = 20240315",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert_eq!((year, month, day, quarter), (2024, 3, 15, 1));

    let (product_key_run1,): (i32,) =
        sqlx::query_as("SELECT product_key FROM dwh.dim_product WHERE product_id = 1")
            .fetch_one(&dwh)
            .await
            .unwrap();

    // --- Run 2: unchanged snapshot - idempotence ----------------------------
    run_etl_binary(&oltp_url, &dwh_url);

    assert_eq!(count(&dwh, "dwh.dim_product").await, 3);
    assert_eq!(count(&dwh, "dwh.fact_inventory_movement").await, 1);
    assert_eq!(count(&dwh, "dwh.dim_date").await, 1);

    let (product_key_run2,): (i32,) =
        sqlx::query_as("SELECT product_key FROM dwh.dim_product WHERE product_id = 1")
            .fetch_one(&dwh)
            .await
            .unwrap();
    assert_eq!(product_key_run1, product_key_run2);

    // --- Run 3: attribute change - surrogate key stays, attributes move -----
    sqlx::query("UPDATE product SET name = 'Hex bolts M8 zinc' WHERE id = 1")
        .execute(&oltp)
        .await
        .unwrap();

    run_etl_binary(&oltp_url, &dwh_url);

    let (product_key_run3, name): (i32, String) =
        sqlx::query_as("SELECT product_key, name FROM dwh.dim_product WHERE product_id = 1")
            .fetch_one(&dwh)
            .await
            .unwrap();
    assert_eq!(product_key_run1, product_key_run3);
    assert_eq!(name, "Hex bolts M8 zinc");

    // --- Run 4: supplier-less product, fresh label, null timestamp ----------
    let key_before = Utc::now().naive_utc().date();
    sqlx::query(
        "INSERT INTO inventory_movement \
         (id, product_id, warehouse_id, movement_type, quantity, unit_price, total_value, movement_date) \
         VALUES (102, 2, 10, 'adjustment', -2, NULL, NULL, NULL)",
    )
    .execute(&oltp)
    .await
    .unwrap();

    run_etl_binary(&oltp_url, &dwh_url);
    let key_after = Utc::now().naive_utc().date();

    assert_eq!(count(&dwh, "dwh.fact_inventory_movement").await, 2);

    let (supplier_key, date_key): (Option<i32>, i32) = sqlx::query_as(
        "SELECT supplier_key, date_key FROM dwh.fact_inventory_movement \
         WHERE source_movement_id = 102",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert!(supplier_key.is_none(), "product 2 has no supplier");

    // Null movement_date takes the load instant; allow a midnight rollover
    // between the two observations
    let expected_keys = [
        key_before.year() * 10_000 + key_before.month() as i32 * 100 + key_before.day() as i32,
        key_after.year() * 10_000 + key_after.month() as i32 * 100 + key_after.day() as i32,
    ];
    assert!(expected_keys.contains(&date_key));

    // Exactly one dimension row for the new label, referenced by the fact
    let (label_count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM dwh.dim_movement_type WHERE movement_type = 'adjustment'",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert_eq!(label_count, 1);

    let (label,): (String,) = sqlx::query_as(
        "SELECT mt.movement_type \
         FROM dwh.fact_inventory_movement f \
         JOIN dwh.dim_movement_type mt ON mt.movement_type_key = f.movement_type_key \
         WHERE f.source_movement_id = 102",
    )
    .fetch_one(&dwh)
    .await
    .unwrap();
    assert_eq!(label, "adjustment");

    // Audit trail: every live run recorded and finished ok
    let (ok_runs,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM dwh.etl_run WHERE status = 'ok'")
            .fetch_one(&dwh)
            .await
            .unwrap();
    assert_eq!(ok_runs, 4);
}
