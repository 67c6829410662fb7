//! SQLite-backed store.
//!
//! Every statement goes through one of three calls (`execute`, `fetch_one`,
//! `fetch_all`) with positional `?` parameters given as JSON scalars. Rows come
//! back as JSON objects keyed by column name, which is the only record shape the
//! rest of the service deals with.

use serde_json::{Map, Number, Value as JsonValue};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

/// A row as returned to callers: column name to scalar value.
pub type Record = Map<String, JsonValue>;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Cheap-to-clone handle over the shared connection pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::info!(database_url, "Connected to SQLite store");
        Ok(Self { pool })
    }

    /// Private in-memory database.
    ///
    /// The pool is pinned to a single long-lived connection because every new
    /// SQLite connection to `:memory:` would otherwise see an empty database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Runs a statement and returns the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[JsonValue]) -> Result<u64, sqlx::Error> {
        let query = bind_all(sqlx::query(sql), params);
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Returns the first row, if any.
    pub async fn fetch_one(
        &self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<Option<Record>, sqlx::Error> {
        let query = bind_all(sqlx::query(sql), params);
        match query.fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_all(
        &self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<Vec<Record>, sqlx::Error> {
        let query = bind_all(sqlx::query(sql), params);
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Runs a single-column integer query such as `SELECT COUNT(*) ...`.
    /// A missing row or a NULL value reads as zero.
    pub async fn fetch_count(&self, sql: &str, params: &[JsonValue]) -> Result<i64, sqlx::Error> {
        let record = self.fetch_one(sql, params).await?;
        Ok(record
            .and_then(|r| r.values().next().and_then(JsonValue::as_i64))
            .unwrap_or(0))
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, sqlx::Error> {
        let count = self
            .fetch_count(
                "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[JsonValue::from(table_name)],
            )
            .await?;
        Ok(count > 0)
    }

    /// Executes DDL statements in order (each is expected to be idempotent).
    pub async fn apply_ddl<'a, I>(&self, statements: I) -> Result<(), sqlx::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for sql in statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &[JsonValue]) -> SqliteQuery<'q> {
    for value in params {
        query = bind_value(query, value);
    }
    query
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &JsonValue) -> SqliteQuery<'q> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(b) => query.bind(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        JsonValue::String(s) => query.bind(s.clone()),
        // Nested structures are persisted as their JSON text.
        other => query.bind(other.to_string()),
    }
}

fn row_to_record(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            JsonValue::Null
        } else {
            let type_name = raw.type_info().name().to_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                    JsonValue::from(row.try_get::<i64, _>(idx)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    let f: f64 = row.try_get(idx)?;
                    Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null)
                }
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(idx)?;
                    JsonValue::from(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => JsonValue::from(row.try_get::<String, _>(idx)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}
