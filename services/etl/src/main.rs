//! ETL Service - Loads operational inventory data into the dimensional warehouse
//!
//! Responsibilities:
//! - Mirror products, warehouses and suppliers into their dimension tables (upsert)
//! - Register every distinct movement-type label in dim_movement_type
//! - Maintain the calendar dimension lazily, one row per referenced date
//! - Full-reload fact_inventory_movement from the operational movement ledger
//! - Track each live run in dwh.etl_run for auditing
//!
//! CRITICAL: the whole pipeline runs inside one transaction per database.
//! Nothing is committed unless every dimension and every fact loaded cleanly.
//!
//! Usage:
//!   # Nightly load:
//!   cargo run --bin etl
//!
//!   # Rehearsal against live data - runs everything, then rolls back:
//!   cargo run --bin etl -- --dry-run

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "etl", about = "Loads the inventory star schema from the operational database")]
struct Args {
    /// Dry run - execute the full pipeline, then roll back instead of committing
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Debug, Clone)]
struct Config {
    oltp_db_url: String,
    dwh_db_url: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Self {
            oltp_db_url: std::env::var("OLTP_DB_URL").context("OLTP_DB_URL env var missing")?,
            dwh_db_url: std::env::var("DWH_DB_URL").context("DWH_DB_URL env var missing")?,
        })
    }
}

/// Operational product row, as read from the OLTP side
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    sku: String,
    name: String,
    category: Option<String>,
    min_quantity: Option<i32>,
    max_quantity: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct WarehouseRow {
    id: i32,
    code: String,
    name: String,
    location: Option<String>,
    max_capacity: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: i32,
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    rating: Option<Decimal>,
}

/// Operational movement joined with its product. The supplier reference is
/// denormalized from the product's CURRENT supplier, not the supplier that
/// was current when the movement occurred - movements don't carry their own.
#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: i32,
    product_id: i32,
    warehouse_id: i32,
    supplier_id: Option<i32>,
    movement_type: String,
    quantity: i32,
    unit_price: Option<Decimal>,
    total_value: Option<Decimal>,
    movement_date: Option<NaiveDateTime>,
}

/// Per-row outcomes of one fact-load pass
#[derive(Debug, Default, Clone, Copy)]
struct FactLoadStats {
    read: u64,
    inserted: u64,
    skipped_missing_product: u64,
    skipped_missing_warehouse: u64,
    healed_movement_types: u64,
}

/// Counts reported by a completed pipeline run
#[derive(Debug)]
struct EtlSummary {
    products: u64,
    warehouses: u64,
    suppliers: u64,
    movement_types: u64,
    facts: FactLoadStats,
}

// =============================================================================
// WAREHOUSE SCHEMA - idempotent bootstrap, applied once on startup
// =============================================================================

/// Create the dwh schema and every table the pipeline writes.
///
/// Safe to call on every startup; no-op if objects already exist. The ETL
/// exclusively owns the warehouse write path, so it owns this DDL too.
async fn ensure_warehouse_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("CREATE SCHEMA IF NOT EXISTS dwh")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.dim_product (
            product_key   SERIAL PRIMARY KEY,
            product_id    INTEGER UNIQUE NOT NULL,
            sku           VARCHAR(50) NOT NULL,
            name          VARCHAR(200) NOT NULL,
            category      VARCHAR(100),
            min_quantity  INTEGER,
            max_quantity  INTEGER
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.dim_warehouse (
            warehouse_key SERIAL PRIMARY KEY,
            warehouse_id  INTEGER UNIQUE NOT NULL,
            code          VARCHAR(20) NOT NULL,
            name          VARCHAR(100) NOT NULL,
            location      VARCHAR(200),
            max_capacity  INTEGER
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.dim_supplier (
            supplier_key   SERIAL PRIMARY KEY,
            supplier_id    INTEGER UNIQUE NOT NULL,
            name           VARCHAR(200) NOT NULL,
            contact_person VARCHAR(100),
            phone          VARCHAR(50),
            rating         NUMERIC(3,1)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.dim_movement_type (
            movement_type_key SERIAL PRIMARY KEY,
            movement_type     VARCHAR(50) UNIQUE NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.dim_date (
            date_key  INTEGER PRIMARY KEY,
            full_date DATE NOT NULL,
            year      INTEGER NOT NULL,
            month     INTEGER NOT NULL,
            day       INTEGER NOT NULL,
            quarter   INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.fact_inventory_movement (
            fact_key           SERIAL PRIMARY KEY,
            date_key           INTEGER NOT NULL REFERENCES dwh.dim_date (date_key),
            product_key        INTEGER NOT NULL REFERENCES dwh.dim_product (product_key),
            warehouse_key      INTEGER NOT NULL REFERENCES dwh.dim_warehouse (warehouse_key),
            supplier_key       INTEGER REFERENCES dwh.dim_supplier (supplier_key),
            movement_type_key  INTEGER NOT NULL REFERENCES dwh.dim_movement_type (movement_type_key),
            quantity           INTEGER NOT NULL,
            unit_price         NUMERIC(10,2),
            total_value        NUMERIC(10,2),
            source_movement_id INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_fact_inventory_movement_date
            ON dwh.fact_inventory_movement (date_key)
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_fact_inventory_movement_product
            ON dwh.fact_inventory_movement (product_key)
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dwh.etl_run (
            run_id      UUID PRIMARY KEY,
            started_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            finished_at TIMESTAMPTZ,
            status      VARCHAR(20) NOT NULL,
            error       TEXT,
            detail      JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

// =============================================================================
// DIMENSION CONFORMANCE - Type 1 mirrors of the operational reference tables
// =============================================================================

/// Mirror the operational product table into dwh.dim_product.
///
/// Upsert keyed on the natural product id: existing rows get every
/// descriptive column overwritten, new rows get a fresh surrogate key.
/// Rows are never deleted, even if the source row disappears.
async fn load_dim_products(oltp: &mut PgConnection, dwh: &mut PgConnection) -> Result<u64> {
    let products: Vec<ProductRow> = sqlx::query_as(
        "SELECT id, sku, name, category, min_quantity, max_quantity FROM product",
    )
    .fetch_all(&mut *oltp)
    .await
    .context("Failed to read operational products")?;

    for p in &products {
        sqlx::query(
            r#"
            INSERT INTO dwh.dim_product (product_id, sku, name, category, min_quantity, max_quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id) DO UPDATE
            SET sku = EXCLUDED.sku,
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                min_quantity = EXCLUDED.min_quantity,
                max_quantity = EXCLUDED.max_quantity
            "#,
        )
        .bind(p.id)
        .bind(&p.sku)
        .bind(&p.name)
        .bind(&p.category)
        .bind(p.min_quantity)
        .bind(p.max_quantity)
        .execute(&mut *dwh)
        .await?;
    }

    Ok(products.len() as u64)
}

/// Mirror the operational warehouse table into dwh.dim_warehouse.
async fn load_dim_warehouses(oltp: &mut PgConnection, dwh: &mut PgConnection) -> Result<u64> {
    let warehouses: Vec<WarehouseRow> =
        sqlx::query_as("SELECT id, code, name, location, max_capacity FROM warehouse")
            .fetch_all(&mut *oltp)
            .await
            .context("Failed to read operational warehouses")?;

    for w in &warehouses {
        sqlx::query(
            r#"
            INSERT INTO dwh.dim_warehouse (warehouse_id, code, name, location, max_capacity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (warehouse_id) DO UPDATE
            SET code = EXCLUDED.code,
                name = EXCLUDED.name,
                location = EXCLUDED.location,
                max_capacity = EXCLUDED.max_capacity
            "#,
        )
        .bind(w.id)
        .bind(&w.code)
        .bind(&w.name)
        .bind(&w.location)
        .bind(w.max_capacity)
        .execute(&mut *dwh)
        .await?;
    }

    Ok(warehouses.len() as u64)
}

/// Mirror the operational supplier table into dwh.dim_supplier.
async fn load_dim_suppliers(oltp: &mut PgConnection, dwh: &mut PgConnection) -> Result<u64> {
    let suppliers: Vec<SupplierRow> =
        sqlx::query_as("SELECT id, name, contact_person, phone, rating FROM supplier")
            .fetch_all(&mut *oltp)
            .await
            .context("Failed to read operational suppliers")?;

    for s in &suppliers {
        sqlx::query(
            r#"
            INSERT INTO dwh.dim_supplier (supplier_id, name, contact_person, phone, rating)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (supplier_id) DO UPDATE
            SET name = EXCLUDED.name,
                contact_person = EXCLUDED.contact_person,
                phone = EXCLUDED.phone,
                rating = EXCLUDED.rating
            "#,
        )
        .bind(s.id)
        .bind(&s.name)
        .bind(&s.contact_person)
        .bind(&s.phone)
        .bind(s.rating)
        .execute(&mut *dwh)
        .await?;
    }

    Ok(suppliers.len() as u64)
}

/// Insert a movement-type label if absent. The label is the entire payload,
/// so existing rows are never updated.
async fn insert_movement_type(dwh: &mut PgConnection, label: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dwh.dim_movement_type (movement_type)
        VALUES ($1)
        ON CONFLICT (movement_type) DO NOTHING
        "#,
    )
    .bind(label)
    .execute(&mut *dwh)
    .await?;
    Ok(())
}

/// Register every distinct movement-type label present in the ledger so the
/// fact loader's lookups can find them pre-seeded.
async fn ensure_movement_types(oltp: &mut PgConnection, dwh: &mut PgConnection) -> Result<u64> {
    let labels: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT movement_type FROM inventory_movement")
            .fetch_all(&mut *oltp)
            .await
            .context("Failed to read distinct movement types")?;

    for (label,) in &labels {
        insert_movement_type(dwh, label).await?;
    }

    Ok(labels.len() as u64)
}

// =============================================================================
// DATE DIMENSION - deterministic surrogate keys, lazily materialized rows
// =============================================================================

/// Surrogate key for a calendar date: year*10000 + month*100 + day.
fn date_key_for(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Calendar quarter (1-4) for a month (1-12).
fn quarter_of(month: u32) -> i32 {
    (month as i32 - 1) / 3 + 1
}

/// Movements with no timestamp are stamped with the load instant. This
/// fabricates history for malformed source rows; the operational side owns
/// the data-quality problem.
fn effective_movement_date(
    movement_date: Option<NaiveDateTime>,
    load_time: NaiveDateTime,
) -> NaiveDateTime {
    movement_date.unwrap_or(load_time)
}

/// Make sure dim_date has a row for the timestamp's date, returning its key.
///
/// Presence check before insert rather than ON CONFLICT: the same date shows
/// up on many fact rows per run and a dim_date row is immutable once written.
/// Not atomic across concurrent runs - single-run-at-a-time is the only
/// supported mode.
async fn ensure_date(dwh: &mut PgConnection, ts: NaiveDateTime) -> Result<i32> {
    let date = ts.date();
    let date_key = date_key_for(date);

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT date_key FROM dwh.dim_date WHERE date_key = $1")
            .bind(date_key)
            .fetch_optional(&mut *dwh)
            .await?;

    if existing.is_none() {
        sqlx::query(
            r#"
            INSERT INTO dwh.dim_date (date_key, full_date, year, month, day, quarter)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(date_key)
        .bind(date)
        .bind(date.year())
        .bind(date.month() as i32)
        .bind(date.day() as i32)
        .bind(quarter_of(date.month()))
        .execute(&mut *dwh)
        .await?;
    }

    Ok(date_key)
}

// =============================================================================
// KEY RESOLUTION - natural id -> surrogate key; None means no dimension row
// =============================================================================

/// Surrogate key for a natural product id. None is an expected condition
/// (the dimension has no row for it), not an error.
async fn get_product_key(dwh: &mut PgConnection, product_id: i32) -> Result<Option<i32>> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT product_key FROM dwh.dim_product WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&mut *dwh)
            .await?;
    Ok(row.map(|r| r.0))
}

async fn get_warehouse_key(dwh: &mut PgConnection, warehouse_id: i32) -> Result<Option<i32>> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT warehouse_key FROM dwh.dim_warehouse WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .fetch_optional(&mut *dwh)
            .await?;
    Ok(row.map(|r| r.0))
}

/// A null supplier id is valid input (products may have no supplier) and
/// short-circuits to None without touching the store.
async fn get_supplier_key(
    dwh: &mut PgConnection,
    supplier_id: Option<i32>,
) -> Result<Option<i32>> {
    let supplier_id = match supplier_id {
        Some(id) => id,
        None => return Ok(None),
    };
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT supplier_key FROM dwh.dim_supplier WHERE supplier_id = $1")
            .bind(supplier_id)
            .fetch_optional(&mut *dwh)
            .await?;
    Ok(row.map(|r| r.0))
}

async fn get_movement_type_key(dwh: &mut PgConnection, label: &str) -> Result<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT movement_type_key FROM dwh.dim_movement_type WHERE movement_type = $1",
    )
    .bind(label)
    .fetch_optional(&mut *dwh)
    .await?;
    Ok(row.map(|r| r.0))
}

// =============================================================================
// FACT LOADER - full reload of fact_inventory_movement
// =============================================================================

/// Load the fact table from the operational movement ledger.
///
/// full_reload clears the table first; this is the only supported mode.
/// Per row: rows whose product or warehouse key does not resolve are
/// counted and skipped, a missing supplier key is stored as NULL, and an
/// unregistered movement-type label is inserted on the spot and re-resolved.
async fn load_fact_movements(
    oltp: &mut PgConnection,
    dwh: &mut PgConnection,
    full_reload: bool,
) -> Result<FactLoadStats> {
    if full_reload {
        println!("Clearing fact_inventory_movement...");
        sqlx::query("DELETE FROM dwh.fact_inventory_movement")
            .execute(&mut *dwh)
            .await?;
    }

    let movements: Vec<MovementRow> = sqlx::query_as(
        r#"
        SELECT im.id,
               im.product_id,
               im.warehouse_id,
               p.supplier_id,
               im.movement_type,
               im.quantity,
               im.unit_price,
               im.total_value,
               im.movement_date
        FROM inventory_movement im
        JOIN product p ON p.id = im.product_id
        "#,
    )
    .fetch_all(&mut *oltp)
    .await
    .context("Failed to read operational movements")?;

    println!("Movements to load: {}", movements.len());

    let load_time = Utc::now().naive_utc();
    let mut stats = FactLoadStats {
        read: movements.len() as u64,
        ..Default::default()
    };

    for m in &movements {
        let movement_date = effective_movement_date(m.movement_date, load_time);
        let date_key = ensure_date(dwh, movement_date).await?;

        let product_key = match get_product_key(dwh, m.product_id).await? {
            Some(key) => key,
            None => {
                stats.skipped_missing_product += 1;
                continue;
            }
        };

        let warehouse_key = match get_warehouse_key(dwh, m.warehouse_id).await? {
            Some(key) => key,
            None => {
                stats.skipped_missing_warehouse += 1;
                continue;
            }
        };

        // Legitimately absent when the product carries no supplier
        let supplier_key = get_supplier_key(dwh, m.supplier_id).await?;

        let movement_type_key = match get_movement_type_key(dwh, &m.movement_type).await? {
            Some(key) => key,
            None => {
                // Label the dimension pass never saw; register it on the spot
                stats.healed_movement_types += 1;
                insert_movement_type(dwh, &m.movement_type).await?;
                get_movement_type_key(dwh, &m.movement_type)
                    .await?
                    .context("movement type missing after insert")?
            }
        };

        sqlx::query(
            r#"
            INSERT INTO dwh.fact_inventory_movement
                (date_key, product_key, warehouse_key, supplier_key,
                 movement_type_key, quantity, unit_price, total_value, source_movement_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(date_key)
        .bind(product_key)
        .bind(warehouse_key)
        .bind(supplier_key)
        .bind(movement_type_key)
        .bind(m.quantity)
        .bind(m.unit_price)
        .bind(m.total_value)
        .bind(m.id)
        .execute(&mut *dwh)
        .await?;

        stats.inserted += 1;
    }

    Ok(stats)
}

// =============================================================================
// ORCHESTRATOR - dimensions first, then facts, one transaction per database
// =============================================================================

/// Run the whole pipeline. Dimensions load before facts so key resolution
/// finds every reference pre-seeded; both transactions commit only after
/// every step returned Ok. On any error the transactions roll back on drop
/// and nothing persists on either side.
async fn run_etl(oltp_pool: &PgPool, dwh_pool: &PgPool, dry_run: bool) -> Result<EtlSummary> {
    let mut oltp_tx = oltp_pool
        .begin()
        .await
        .context("Failed to open operational transaction")?;
    let mut dwh_tx = dwh_pool
        .begin()
        .await
        .context("Failed to open warehouse transaction")?;

    println!("\nLoading dimensions...");
    let products = load_dim_products(&mut oltp_tx, &mut dwh_tx).await?;
    println!("  dim_product: {} source rows mirrored", products);
    let warehouses = load_dim_warehouses(&mut oltp_tx, &mut dwh_tx).await?;
    println!("  dim_warehouse: {} source rows mirrored", warehouses);
    let suppliers = load_dim_suppliers(&mut oltp_tx, &mut dwh_tx).await?;
    println!("  dim_supplier: {} source rows mirrored", suppliers);
    let movement_types = ensure_movement_types(&mut oltp_tx, &mut dwh_tx).await?;
    println!("  dim_movement_type: {} distinct labels", movement_types);

    println!("\nLoading facts...");
    let facts = load_fact_movements(&mut oltp_tx, &mut dwh_tx, true).await?;

    if dry_run {
        println!("\nDry run - rolling back both transactions");
        dwh_tx.rollback().await?;
        oltp_tx.rollback().await?;
    } else {
        dwh_tx
            .commit()
            .await
            .context("Failed to commit warehouse transaction")?;
        // The operational side is read-only but still committed explicitly
        // to release its snapshot.
        oltp_tx
            .commit()
            .await
            .context("Failed to commit operational transaction")?;
    }

    Ok(EtlSummary {
        products,
        warehouses,
        suppliers,
        movement_types,
        facts,
    })
}

// =============================================================================
// RUN AUDIT - written through the pool, outside the pipeline transactions;
// the trail survives a pipeline rollback
// =============================================================================

async fn create_etl_run(pool: &PgPool) -> Result<Uuid> {
    let run_id = Uuid::new_v4();
    sqlx::query("INSERT INTO dwh.etl_run (run_id, status, detail) VALUES ($1, 'running', '{}')")
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(run_id)
}

async fn finish_etl_run(
    pool: &PgPool,
    run_id: Uuid,
    status: &str,
    error: Option<&str>,
    summary: Option<&EtlSummary>,
) -> Result<()> {
    let detail = match summary {
        Some(s) => serde_json::json!({
            "products": s.products,
            "warehouses": s.warehouses,
            "suppliers": s.suppliers,
            "movement_types": s.movement_types,
            "facts_read": s.facts.read,
            "facts_inserted": s.facts.inserted,
            "facts_skipped_missing_product": s.facts.skipped_missing_product,
            "facts_skipped_missing_warehouse": s.facts.skipped_missing_warehouse,
            "movement_types_healed": s.facts.healed_movement_types,
        }),
        None => serde_json::json!({}),
    };

    sqlx::query(
        r#"
        UPDATE dwh.etl_run
        SET finished_at = now(), status = $2, error = $3, detail = detail || $4
        WHERE run_id = $1
        "#,
    )
    .bind(run_id)
    .bind(status)
    .bind(error)
    .bind(detail)
    .execute(pool)
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env()?;

    println!("=== Inventory Warehouse ETL ===");
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let oltp_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.oltp_db_url)
        .await
        .context("Failed to connect to operational database")?;
    let dwh_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.dwh_db_url)
        .await
        .context("Failed to connect to warehouse database")?;

    ensure_warehouse_schema(&dwh_pool)
        .await
        .context("Failed to bootstrap warehouse schema")?;

    // Dry runs leave no trace, so they get no audit row either
    let run_id = if !args.dry_run {
        Some(create_etl_run(&dwh_pool).await?)
    } else {
        None
    };

    let result = run_etl(&oltp_pool, &dwh_pool, args.dry_run).await;

    if let Some(run_id) = run_id {
        match &result {
            Ok(summary) => finish_etl_run(&dwh_pool, run_id, "ok", None, Some(summary)).await?,
            Err(e) => {
                finish_etl_run(&dwh_pool, run_id, "failed", Some(&e.to_string()), None).await?
            }
        }
    }

    let summary = result?;

    println!("\n=== ETL Complete ===");
    println!("dim_product:        {} rows mirrored", summary.products);
    println!("dim_warehouse:      {} rows mirrored", summary.warehouses);
    println!("dim_supplier:       {} rows mirrored", summary.suppliers);
    println!("dim_movement_type:  {} labels", summary.movement_types);
    println!("Facts read:         {}", summary.facts.read);
    println!("Facts inserted:     {}", summary.facts.inserted);
    println!(
        "Skipped (no product key):   {}",
        summary.facts.skipped_missing_product
    );
    println!(
        "Skipped (no warehouse key): {}",
        summary.facts.skipped_missing_warehouse
    );
    if summary.facts.healed_movement_types > 0 {
        println!(
            "Movement types registered during fact load: {}",
            summary.facts.healed_movement_types
        );
    }

    Ok(())
}

// =============================================================================
// TESTS - the key derivations must be DETERMINISTIC
// =============================================================================
