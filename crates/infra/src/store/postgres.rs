//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `MissingReference` |
//! | Database (check / not-null violation) | `23514` / `23502` | `CheckViolation` |
//! | Anything else | | `Backend` |
//!
//! Cascades are declared in the schema (see [`super::schema`]), so deletes are
//! single statements.

use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use taxonomy_core::{
    ClassId, ClassParamId, ClassParamRow, ClassRow, OrganizationalUnit, ParamId, ParamRow,
    ProductId, ProductRow, ProductValueRow, UnitId, ValueType, ValueTypeId,
};

use super::r#trait::{CatalogStore, CatalogTx, StoreError, StoreResult};

/// Postgres catalog store over a SQLx connection pool.
///
/// Each unit of work is one database transaction; isolation is whatever the
/// server's default level provides. No extra locking is done here.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool of at most `max_connections`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        super::schema::ensure_schema(&self.pool).await
    }
}

/// Unit of work over a [`PostgresCatalogStore`].
#[derive(Debug)]
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> StoreResult<PostgresTx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresTx { tx })
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} in {}", db_err.message(), operation);
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::MissingReference(msg),
                Some("23514") | Some("23502") => StoreError::CheckViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("{} failed: {}", operation, other)),
    }
}

fn decode(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {}: {}", operation, err))
}

fn unit_from_row(row: &PgRow) -> Result<OrganizationalUnit, sqlx::Error> {
    Ok(OrganizationalUnit {
        id: UnitId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        short_name: row.try_get("short_name")?,
    })
}

fn value_type_from_row(row: &PgRow) -> Result<ValueType, sqlx::Error> {
    Ok(ValueType {
        id: ValueTypeId::new(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn param_from_row(row: &PgRow) -> Result<ParamRow, sqlx::Error> {
    Ok(ParamRow {
        id: ParamId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        value_type_id: ValueTypeId::new(row.try_get("value_type_id")?),
        unit_id: row.try_get::<Option<i64>, _>("unit_id")?.map(UnitId::new),
    })
}

fn class_from_row(row: &PgRow) -> Result<ClassRow, sqlx::Error> {
    Ok(ClassRow {
        id: ClassId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        parent: row.try_get::<Option<i64>, _>("parent_id")?.map(ClassId::new),
        unit_id: UnitId::new(row.try_get("unit_id")?),
    })
}

fn class_param_from_row(row: &PgRow) -> Result<ClassParamRow, sqlx::Error> {
    Ok(ClassParamRow {
        id: ClassParamId::new(row.try_get("id")?),
        class_id: ClassId::new(row.try_get("class_id")?),
        param_id: ParamId::new(row.try_get("param_id")?),
    })
}

fn product_from_row(row: &PgRow) -> Result<ProductRow, sqlx::Error> {
    Ok(ProductRow {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        class_id: ClassId::new(row.try_get("class_id")?),
    })
}

fn decode_all<T>(
    operation: &str,
    rows: Vec<PgRow>,
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|r| f(r).map_err(|e| decode(operation, e)))
        .collect()
}

fn decode_one<T>(
    operation: &str,
    row: Option<PgRow>,
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<Option<T>> {
    row.as_ref()
        .map(f)
        .transpose()
        .map_err(|e| decode(operation, e))
}

const CLASS_COLUMNS: &str = "id, name, parent_id, unit_id";

#[async_trait::async_trait]
impl CatalogTx for PostgresTx {
    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }

    async fn find_unit_by_name(&mut self, name: &str) -> StoreResult<Option<OrganizationalUnit>> {
        let row = sqlx::query("SELECT id, name, short_name FROM org_units WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_unit_by_name", e))?;
        decode_one("find_unit_by_name", row, unit_from_row)
    }

    async fn get_unit(&mut self, id: UnitId) -> StoreResult<Option<OrganizationalUnit>> {
        let row = sqlx::query("SELECT id, name, short_name FROM org_units WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_unit", e))?;
        decode_one("get_unit", row, unit_from_row)
    }

    async fn insert_unit(&mut self, name: &str, short_name: &str) -> StoreResult<UnitId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO org_units (name, short_name) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(short_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_unit", e))?;
        Ok(UnitId::new(id))
    }

    async fn list_units(&mut self, name: Option<&str>) -> StoreResult<Vec<OrganizationalUnit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, short_name
            FROM org_units
            WHERE ($1::text IS NULL OR name = $1)
            ORDER BY id
            "#,
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_units", e))?;
        decode_all("list_units", rows, unit_from_row)
    }

    async fn delete_unit(&mut self, id: UnitId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM org_units WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_unit", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_value_type_by_name(&mut self, name: &str) -> StoreResult<Option<ValueType>> {
        let row = sqlx::query("SELECT id, name FROM value_types WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_value_type_by_name", e))?;
        decode_one("find_value_type_by_name", row, value_type_from_row)
    }

    async fn get_value_type(&mut self, id: ValueTypeId) -> StoreResult<Option<ValueType>> {
        let row = sqlx::query("SELECT id, name FROM value_types WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_value_type", e))?;
        decode_one("get_value_type", row, value_type_from_row)
    }

    async fn insert_value_type(&mut self, name: &str) -> StoreResult<ValueTypeId> {
        let id: i64 = sqlx::query_scalar("INSERT INTO value_types (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_value_type", e))?;
        Ok(ValueTypeId::new(id))
    }

    async fn list_value_types(&mut self, name: Option<&str>) -> StoreResult<Vec<ValueType>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name
            FROM value_types
            WHERE ($1::text IS NULL OR name = $1)
            ORDER BY id
            "#,
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_value_types", e))?;
        decode_all("list_value_types", rows, value_type_from_row)
    }

    async fn delete_value_type(&mut self, id: ValueTypeId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM value_types WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_value_type", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_param_by_name(&mut self, name: &str) -> StoreResult<Option<ParamRow>> {
        let row = sqlx::query("SELECT id, name, value_type_id, unit_id FROM params WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_param_by_name", e))?;
        decode_one("find_param_by_name", row, param_from_row)
    }

    async fn get_param(&mut self, id: ParamId) -> StoreResult<Option<ParamRow>> {
        let row = sqlx::query("SELECT id, name, value_type_id, unit_id FROM params WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_param", e))?;
        decode_one("get_param", row, param_from_row)
    }

    async fn insert_param(
        &mut self,
        name: &str,
        value_type: ValueTypeId,
        unit: UnitId,
    ) -> StoreResult<ParamId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO params (name, value_type_id, unit_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(value_type.get())
        .bind(unit.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_param", e))?;
        Ok(ParamId::new(id))
    }

    async fn list_params(&mut self, name: Option<&str>) -> StoreResult<Vec<ParamRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, value_type_id, unit_id
            FROM params
            WHERE ($1::text IS NULL OR name = $1)
            ORDER BY id
            "#,
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_params", e))?;
        decode_all("list_params", rows, param_from_row)
    }

    async fn insert_class(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        unit: UnitId,
    ) -> StoreResult<ClassId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO classes (name, parent_id, unit_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(parent.map(ClassId::get))
        .bind(unit.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_class", e))?;
        Ok(ClassId::new(id))
    }

    async fn get_class(&mut self, id: ClassId) -> StoreResult<Option<ClassRow>> {
        let row = sqlx::query(&format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_class", e))?;
        decode_one("get_class", row, class_from_row)
    }

    async fn find_class_by_name(&mut self, name: &str) -> StoreResult<Option<ClassRow>> {
        let row = sqlx::query(&format!("SELECT {CLASS_COLUMNS} FROM classes WHERE name = $1"))
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_class_by_name", e))?;
        decode_one("find_class_by_name", row, class_from_row)
    }

    async fn list_classes(&mut self) -> StoreResult<Vec<ClassRow>> {
        let rows = sqlx::query(&format!("SELECT {CLASS_COLUMNS} FROM classes ORDER BY id"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_classes", e))?;
        decode_all("list_classes", rows, class_from_row)
    }

    async fn children_of(&mut self, id: ClassId) -> StoreResult<Vec<ClassRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("children_of", e))?;
        decode_all("children_of", rows, class_from_row)
    }

    async fn delete_class(&mut self, id: ClassId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_class", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_class_param(
        &mut self,
        class: ClassId,
        param: ParamId,
    ) -> StoreResult<ClassParamId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO class_params (class_id, param_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(class.get())
        .bind(param.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_class_param", e))?;
        Ok(ClassParamId::new(id))
    }

    async fn class_params_of(&mut self, classes: &[ClassId]) -> StoreResult<Vec<ClassParamRow>> {
        let ids: Vec<i64> = classes.iter().map(|c| c.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, class_id, param_id
            FROM class_params
            WHERE class_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("class_params_of", e))?;
        decode_all("class_params_of", rows, class_param_from_row)
    }

    async fn get_class_param(&mut self, id: ClassParamId) -> StoreResult<Option<ClassParamRow>> {
        let row = sqlx::query("SELECT id, class_id, param_id FROM class_params WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_class_param", e))?;
        decode_one("get_class_param", row, class_param_from_row)
    }

    async fn insert_product(&mut self, name: &str, class: ClassId) -> StoreResult<ProductId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, class_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(class.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(ProductId::new(id))
    }

    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<ProductRow>> {
        let row = sqlx::query("SELECT id, name, class_id FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        decode_one("get_product", row, product_from_row)
    }

    async fn find_product_by_name(&mut self, name: &str) -> StoreResult<Option<ProductRow>> {
        let row = sqlx::query("SELECT id, name, class_id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_name", e))?;
        decode_one("find_product_by_name", row, product_from_row)
    }

    async fn products_of_class(&mut self, class: ClassId) -> StoreResult<Vec<ProductId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE class_id = $1 ORDER BY id")
                .bind(class.get())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("products_of_class", e))?;
        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_product_value(
        &mut self,
        product: ProductId,
        class_param: ClassParamId,
        value: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_param_values (product_id, class_param_id, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(product.get())
        .bind(class_param.get())
        .bind(value)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product_value", e))?;
        Ok(())
    }

    async fn product_values_of(&mut self, product: ProductId) -> StoreResult<Vec<ProductValueRow>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, class_param_id, value
            FROM product_param_values
            WHERE product_id = $1
            ORDER BY class_param_id
            "#,
        )
        .bind(product.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product_values_of", e))?;

        rows.iter()
            .map(|row| -> Result<ProductValueRow, sqlx::Error> {
                Ok(ProductValueRow {
                    product_id: ProductId::new(row.try_get("product_id")?),
                    class_param_id: ClassParamId::new(row.try_get("class_param_id")?),
                    value: row.try_get("value")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode("product_values_of", e))
    }
}
