//! Database module
//!
//! Connectivity and schema checks. Migrations live as raw SQL files in
//! `migrations/` and are applied out of band.

use sqlx::PgPool;

/// Tables the ledger reads and writes
const REQUIRED_TABLES: &[&str] = &["accounts", "products", "orders"];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for &table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    // the invoice index is what turns a sequencing race into a retryable conflict
    let has_invoice_index: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_indexes
            WHERE schemaname = 'public' AND tablename = 'orders'
              AND indexdef ILIKE 'CREATE UNIQUE INDEX%(account_id, invoice)%'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !has_invoice_index {
        tracing::error!("Unique index on orders(account_id, invoice) is missing");
        return Ok(false);
    }

    Ok(true)
}
