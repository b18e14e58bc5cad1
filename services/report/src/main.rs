//! Report Service - Analytical summaries over the dimensional warehouse
//!
//! Read-only star-schema queries, printed as plain tables:
//! - Top products by total moved value
//! - Warehouse activity (quantity moved, share of total)
//! - Movement trend by calendar date
//!
//! Usage:
//!   cargo run --bin report
//!   cargo run --bin report -- --limit 20

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Parser, Debug)]
#[command(name = "report", about = "Prints analytical reports from the inventory warehouse")]
struct Args {
    /// How many products the top-products report shows
    #[arg(long, default_value = "10")]
    limit: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductValueRow {
    name: String,
    total_value: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct WarehouseActivityRow {
    name: String,
    quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
    full_date: NaiveDate,
    quantity: i64,
}

/// Percentage share of a total; 0.0 when the total is zero.
fn share_pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Aggregated money value for display. A group can be all-NULL when none of
/// its source movements carried a total_value.
fn format_value(value: Option<Decimal>) -> String {
    match value {
        Some(v) => v.round_dp(2).to_string(),
        None => "-".to_string(),
    }
}

async fn report_top_products(pool: &PgPool, limit: i64) -> Result<()> {
    let rows: Vec<ProductValueRow> = sqlx::query_as(
        r#"
        SELECT dp.name, SUM(f.total_value) AS total_value
        FROM dwh.fact_inventory_movement f
        JOIN dwh.dim_product dp ON dp.product_key = f.product_key
        GROUP BY dp.name
        ORDER BY total_value DESC NULLS LAST
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Top-products query failed")?;

    println!("\nTop products by moved value (top {})", limit);
    println!("{:-<60}", "");
    if rows.is_empty() {
        println!("  (no facts loaded)");
    }
    for (i, row) in rows.iter().enumerate() {
        println!(
            "  {:>3}. {:<40} {:>12}",
            i + 1,
            row.name,
            format_value(row.total_value)
        );
    }
    Ok(())
}

async fn report_warehouse_activity(pool: &PgPool) -> Result<()> {
    let rows: Vec<WarehouseActivityRow> = sqlx::query_as(
        r#"
        SELECT dw.name, SUM(f.quantity)::bigint AS quantity
        FROM dwh.fact_inventory_movement f
        JOIN dwh.dim_warehouse dw ON dw.warehouse_key = f.warehouse_key
        GROUP BY dw.name
        ORDER BY quantity DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Warehouse-activity query failed")?;

    let total: i64 = rows.iter().map(|r| r.quantity).sum();

    println!("\nWarehouse activity (quantity moved)");
    println!("{:-<60}", "");
    if rows.is_empty() {
        println!("  (no facts loaded)");
    }
    for row in &rows {
        println!(
            "  {:<40} {:>8}  {:>5.1}%",
            row.name,
            row.quantity,
            share_pct(row.quantity, total)
        );
    }
    Ok(())
}

async fn report_movement_trend(pool: &PgPool) -> Result<()> {
    let rows: Vec<TrendRow> = sqlx::query_as(
        r#"
        SELECT dd.full_date, SUM(f.quantity)::bigint AS quantity
        FROM dwh.fact_inventory_movement f
        JOIN dwh.dim_date dd ON dd.date_key = f.date_key
        GROUP BY dd.full_date
        ORDER BY dd.full_date
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Movement-trend query failed")?;

    println!("\nMovement trend by date");
    println!("{:-<60}", "");
    if rows.is_empty() {
        println!("  (no facts loaded)");
    }
    for row in &rows {
        println!("  {}  {:>8}", row.full_date.format("%Y-%m-%d"), row.quantity);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let dwh_db_url = std::env::var("DWH_DB_URL").context("DWH_DB_URL env var missing")?;

    println!("=== Inventory Warehouse Reports ===");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dwh_db_url)
        .await
        .context("Failed to connect to warehouse database")?;

    report_top_products(&pool, args.limit).await?;
    report_warehouse_activity(&pool).await?;
    report_movement_trend(&pool).await?;

    println!();
    Ok(())
}
