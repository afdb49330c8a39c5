//! # Database Module
//!
//! Async database connectivity with SQLx for SQLite and PostgreSQL.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles statement execution and row decoding
//! - **O**: DatabasePool enum extensible for new backends
//! - **D**: Models depend on `Database`, not on a concrete driver
//!
//! A [`Database`] is a cheap, cloneable handle. The underlying connection is
//! opened on first use and memoized for the life of the handle; every
//! statement is a single autocommit call with bound parameters.

use crate::error::{Error, Result};
use crate::value::{Row, Value};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// SQL flavour spoken by the configured backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite (`?` placeholders, `last_insert_rowid`)
    Sqlite,
    /// PostgreSQL (`$n` placeholders, `RETURNING`)
    Postgres,
}

impl Dialect {
    /// Pick the dialect from a connection URL
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an unsupported scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else {
            Err(Error::configuration(format!(
                "unsupported database url '{url}': expected sqlite: or postgres://"
            )))
        }
    }

    /// Placeholder for the 1-based parameter `index`
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${index}"),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL (e.g. `sqlite:flipmeet.db`, `postgres://localhost/flipmeet`)
    pub url: String,
    /// Connection cap; 1 means a single memoized connection
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

impl DatabaseConfig {
    /// Config for a URL with the default connection cap
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether the URL names a private in-memory SQLite database
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Connection cap actually used
    ///
    /// Each in-memory SQLite connection opens its own empty database, so
    /// those are held to one connection.
    #[must_use]
    pub fn effective_max_connections(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}

/// Open connection, per backend
#[derive(Clone)]
enum DatabasePool {
    /// SQLite connection pool
    Sqlite(SqlitePool),
    /// PostgreSQL connection pool
    Postgres(PgPool),
}

impl DatabasePool {
    async fn connect(config: &DatabaseConfig, dialect: Dialect) -> Result<Self> {
        let connect_err = |e: sqlx::Error| Error::DataAccess {
            message: format!("connection failed: {e}"),
        };

        let max_connections = config.effective_max_connections();
        if max_connections != config.max_connections {
            warn!(
                requested = config.max_connections,
                max_connections, "Connection cap adjusted"
            );
        }

        let pool = match dialect {
            Dialect::Sqlite => {
                let options = SqliteConnectOptions::from_str(&config.url)
                    .map_err(connect_err)?
                    .create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(connect_err)?;
                Self::Sqlite(pool)
            }
            Dialect::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(&config.url)
                    .await
                    .map_err(connect_err)?;
                Self::Postgres(pool)
            }
        };

        info!(dialect = ?dialect, max_connections, "Database connected");
        Ok(pool)
    }
}

/// Lazily connected database handle
#[derive(Clone)]
pub struct Database {
    config: Arc<DatabaseConfig>,
    dialect: Dialect,
    pool: Arc<OnceCell<DatabasePool>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create a handle; nothing is opened until the first statement
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the URL scheme is unsupported.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let dialect = Dialect::from_url(&config.url)?;
        Ok(Self {
            config: Arc::new(config),
            dialect,
            pool: Arc::new(OnceCell::new()),
        })
    }

    /// SQL dialect of this backend
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether the connection has been opened
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(&self) -> Result<&DatabasePool> {
        self.pool
            .get_or_try_init(|| DatabasePool::connect(&self.config, self.dialect))
            .await
    }

    /// Run a query and decode every row
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` on connection or execution failure.
    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "fetch_all");
        match self.pool().await? {
            DatabasePool::Sqlite(pool) => {
                let rows: Vec<SqliteRow> = bind_sqlite(sqlx::query(sql), params)
                    .fetch_all(pool)
                    .await
                    .map_err(query_error)?;
                Ok(rows.iter().map(sqlite_row_to_map).collect())
            }
            DatabasePool::Postgres(pool) => {
                let rows: Vec<PgRow> = bind_postgres(sqlx::query(sql), params)
                    .fetch_all(pool)
                    .await
                    .map_err(query_error)?;
                Ok(rows.iter().map(pg_row_to_map).collect())
            }
        }
    }

    /// Execute a statement that doesn't return rows (UPDATE, DELETE, DDL)
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` on connection or execution failure.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        debug!(sql = %sql, params = params.len(), "execute");
        match self.pool().await? {
            DatabasePool::Sqlite(pool) => bind_sqlite(sqlx::query(sql), params)
                .execute(pool)
                .await
                .map(|done| done.rows_affected())
                .map_err(query_error),
            DatabasePool::Postgres(pool) => bind_postgres(sqlx::query(sql), params)
                .execute(pool)
                .await
                .map(|done| done.rows_affected())
                .map_err(query_error),
        }
    }

    /// Execute an INSERT and report `(rows affected, generated key)`
    ///
    /// On PostgreSQL the statement must end in `RETURNING <primary_key>`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` on connection or execution failure.
    pub async fn insert(&self, sql: &str, params: &[Value], primary_key: &str) -> Result<(u64, Value)> {
        debug!(sql = %sql, params = params.len(), "insert");
        match self.pool().await? {
            DatabasePool::Sqlite(pool) => {
                let done = bind_sqlite(sqlx::query(sql), params)
                    .execute(pool)
                    .await
                    .map_err(query_error)?;
                Ok((done.rows_affected(), Value::Int(done.last_insert_rowid())))
            }
            DatabasePool::Postgres(pool) => {
                let rows: Vec<PgRow> = bind_postgres(sqlx::query(sql), params)
                    .fetch_all(pool)
                    .await
                    .map_err(query_error)?;
                let key = rows
                    .first()
                    .map(pg_row_to_map)
                    .and_then(|mut row| row.remove(primary_key))
                    .unwrap_or_default();
                Ok((rows.len() as u64, key))
            }
        }
    }

    /// Run a `;`-separated script of parameterless statements
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` at the first failing statement.
    pub async fn run_script(&self, script: &str) -> Result<()> {
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            self.execute(statement, &[]).await?;
        }
        Ok(())
    }

    /// Close the connection if it was opened
    pub async fn close(&self) {
        match self.pool.get() {
            Some(DatabasePool::Sqlite(pool)) => pool.close().await,
            Some(DatabasePool::Postgres(pool)) => pool.close().await,
            None => {}
        }
    }
}

fn query_error(e: sqlx::Error) -> Error {
    Error::DataAccess {
        message: format!("Query error: {e}"),
    }
}

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn bind_postgres<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Convert SQLite row to a map, typed by each value's storage class
fn sqlite_row_to_map(row: &SqliteRow) -> Row {
    let mut map = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let storage = match row.try_get_raw(i) {
            Ok(raw) if !raw.is_null() => Some(raw.type_info().name().to_string()),
            _ => None,
        };

        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => row
                .try_get_unchecked::<i64, _>(i)
                .map_or(Value::Null, Value::Int),
            Some("REAL") => row
                .try_get_unchecked::<f64, _>(i)
                .map_or(Value::Null, Value::Float),
            Some("BLOB") => row
                .try_get_unchecked::<Vec<u8>, _>(i)
                .map_or(Value::Null, |b| {
                    Value::Text(String::from_utf8_lossy(&b).into_owned())
                }),
            Some(_) => row
                .try_get_unchecked::<String, _>(i)
                .map_or(Value::Null, Value::Text),
        };

        map.insert(column.name().to_string(), value);
    }

    map
}

/// Convert PostgreSQL row to a map
fn pg_row_to_map(row: &PgRow) -> Row {
    let mut map = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| Value::Int(i64::from(v))),
            "INT4" => row
                .try_get::<Option<i32>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| Value::Int(i64::from(v))),
            "INT8" => row
                .try_get::<Option<i64>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::Int),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| Value::Float(f64::from(v))),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::Float),
            "BOOL" => row
                .try_get::<Option<bool>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::Bool),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| {
                    Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
                }),
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| Value::Text(v.to_rfc3339())),
            "DATE" => row
                .try_get::<Option<chrono::NaiveDate>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| Value::Text(v.to_string())),
            _ => row
                .try_get::<Option<String>, _>(i)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::Text),
        };

        map.insert(column.name().to_string(), value);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        let db = Database::new(DatabaseConfig::default()).unwrap();
        db.run_script(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, score REAL, photo TEXT);
             INSERT INTO users (name, score) VALUES ('Alice', 1.5);
             INSERT INTO users (name, score) VALUES ('Bob', NULL);",
        )
        .await
        .unwrap();
        db
    }

    #[test]
    fn test_memory_database_single_connection() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 8,
        };
        assert!(config.is_in_memory());
        assert_eq!(config.effective_max_connections(), 1);

        let shared = DatabaseConfig {
            url: "sqlite:file:flipmeet?mode=memory&cache=shared".to_string(),
            max_connections: 4,
        };
        assert_eq!(shared.effective_max_connections(), 1);

        let file = DatabaseConfig {
            url: "sqlite:flipmeet.db".to_string(),
            max_connections: 8,
        };
        assert!(!file.is_in_memory());
        assert_eq!(file.effective_max_connections(), 8);

        let zero = DatabaseConfig {
            url: "postgres://localhost/flipmeet".to_string(),
            max_connections: 0,
        };
        assert_eq!(zero.effective_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_memory_database_keeps_schema_with_large_cap() {
        let db = Database::new(DatabaseConfig {
            max_connections: 8,
            ..DatabaseConfig::default()
        })
        .unwrap();
        db.run_script("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t (id) VALUES (1);")
            .await
            .unwrap();
        let rows = db.fetch_all("SELECT id FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(
            Dialect::from_url("postgres://localhost/flipmeet").unwrap(),
            Dialect::Postgres
        );
        assert!(matches!(
            Dialect::from_url("mysql://localhost/flipmeet"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[tokio::test]
    async fn test_connection_is_lazy_and_memoized() {
        let db = Database::new(DatabaseConfig::default()).unwrap();
        assert!(!db.is_connected());

        db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        assert!(db.is_connected());

        let clone = db.clone();
        let rows = clone.fetch_all("SELECT * FROM t", &[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_with_params() {
        let db = memory_db().await;
        let rows = db
            .fetch_all("SELECT * FROM users WHERE name = ?", &[Value::from("Alice")])
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("score"), Some(&Value::Float(1.5)));
        assert_eq!(rows[0].get("photo"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_null_column_decodes_as_null() {
        let db = memory_db().await;
        let rows = db
            .fetch_all("SELECT * FROM users WHERE id = ?", &[Value::Int(2)])
            .await
            .unwrap();
        assert_eq!(rows[0].get("score"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_insert_reports_key() {
        let db = memory_db().await;
        let (affected, key) = db
            .insert("INSERT INTO users (name) VALUES (?)", &[Value::from("Carol")], "id")
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(key, Value::Int(3));
    }

    #[tokio::test]
    async fn test_execute_rows_affected() {
        let db = memory_db().await;
        let affected = db
            .execute(
                "UPDATE users SET photo = ? WHERE id = ?",
                &[Value::Null, Value::Int(99)],
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);

        let affected = db
            .execute("DELETE FROM users WHERE id = ?", &[Value::from("1")])
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_bad_sql_is_data_access_error() {
        let db = memory_db().await;
        let result = db.fetch_all("SELECT * FROM missing_table", &[]).await;
        assert!(matches!(result, Err(Error::DataAccess { .. })));
    }

    #[test]
    fn test_close_before_connect_is_noop() {
        let db = Database::new(DatabaseConfig::default()).unwrap();
        tokio_test::block_on(db.close());
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_close() {
        let db = memory_db().await;
        db.close().await;
        let result = db.fetch_all("SELECT * FROM users", &[]).await;
        assert!(result.is_err());
    }
}
