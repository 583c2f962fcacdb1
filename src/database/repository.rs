use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::store::Table;

/// Read access to one table. All queries skip soft-deleted rows.
pub struct Repository<'a, T> {
    table: Table,
    pool: &'a PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> Repository<'a, T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table: Table, pool: &'a PgPool) -> Self {
        Self {
            table,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all(&self) -> Result<Vec<T>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} WHERE deleted_at IS NULL ORDER BY id",
            self.table.name()
        );
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn select_404(&self, id: i64) -> Result<T, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL",
            self.table.name()
        );
        match sqlx::query_as::<_, T>(&sql).bind(id).fetch_one(self.pool).await {
            Ok(row) => Ok(row),
            Err(sqlx::Error::RowNotFound) => Err(self.table.not_found()),
            Err(other) => Err(other.into()),
        }
    }

    /// Equality filter on a foreign-key column
    pub async fn select_by(&self, column: &'static str, value: i64) -> Result<Vec<T>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 AND deleted_at IS NULL ORDER BY id",
            self.table.name(),
            column
        );
        let rows = sqlx::query_as::<_, T>(&sql).bind(value).fetch_all(self.pool).await?;
        Ok(rows)
    }

    /// Eager-load helper: every live row whose `column` is one of `ids`
    pub async fn select_in(&self, column: &'static str, ids: &[i64]) -> Result<Vec<T>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ANY($1) AND deleted_at IS NULL ORDER BY id",
            self.table.name(),
            column
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(ids.to_vec())
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}
