//! Catalog schema bootstrap for Postgres.
//!
//! Every statement is idempotent, so bootstrapping an existing database is a
//! no-op. On-delete rules carry the cascade semantics the engine relies on.

use sqlx::PgPool;
use tracing::instrument;

use super::postgres::map_sqlx_error;
use super::r#trait::StoreResult;

/// Tables in dependency order.
pub const CATALOG_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS org_units (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE CHECK (LENGTH(name) > 0),
        short_name TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS value_types (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE CHECK (LENGTH(name) > 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS params (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE CHECK (LENGTH(name) > 0),
        value_type_id BIGINT NOT NULL REFERENCES value_types(id) ON DELETE CASCADE,
        unit_id BIGINT REFERENCES org_units(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS classes (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE CHECK (LENGTH(name) > 0),
        parent_id BIGINT REFERENCES classes(id) ON DELETE CASCADE,
        unit_id BIGINT NOT NULL REFERENCES org_units(id) ON DELETE CASCADE,
        UNIQUE (id, parent_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS class_params (
        id BIGSERIAL PRIMARY KEY,
        class_id BIGINT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
        param_id BIGINT NOT NULL REFERENCES params(id) ON DELETE CASCADE,
        UNIQUE (class_id, param_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE CHECK (LENGTH(name) > 0),
        class_id BIGINT NOT NULL REFERENCES classes(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_param_values (
        product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        class_param_id BIGINT NOT NULL REFERENCES class_params(id) ON DELETE CASCADE,
        value TEXT NOT NULL,
        UNIQUE (product_id, class_param_id)
    )
    "#,
];

/// Create all catalog tables inside one transaction.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| map_sqlx_error("begin_schema", e))?;
    for ddl in CATALOG_TABLES {
        sqlx::query(ddl)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_table", e))?;
    }
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_schema", e))?;
    tracing::info!(tables = CATALOG_TABLES.len(), "catalog schema ready");
    Ok(())
}
