//! Connection pools and the vendor-specific queries shared by the database
//! producer, consumer and schema editor.

use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Postgres, Row, Sqlite, TypeInfo, ValueRef};
use tracing::info;

use super::dialect::{data_type_from, declared_size, Vendor};
use crate::config::DatabaseConfig;
use crate::core::{Column, DataType, Record, Table, Value};
use crate::error::{CopyError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite serialises writers, so one connection is enough.
const SQLITE_MAX_CONNECTIONS: u32 = 1;
const POSTGRES_MAX_CONNECTIONS: u32 = 4;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;
type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// A pool for one of the supported vendors.
#[derive(Clone)]
pub enum DatabasePool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DatabasePool {
    /// Connect and test the connection. SQLite files are created when
    /// `create_if_missing` is set.
    pub async fn connect(config: &DatabaseConfig, create_if_missing: bool) -> Result<Self> {
        let vendor = Vendor::from_url(&config.url).ok_or_else(|| {
            CopyError::Config(format!("unsupported database URL [{}]", display_url(&config.url)))
        })?;
        let resource = display_url(&config.url);

        let pool = match vendor {
            Vendor::Sqlite => {
                let options = SqliteConnectOptions::from_str(&config.url)
                    .map_err(|e| CopyError::open(&resource, e))?
                    .create_if_missing(create_if_missing);
                let pool = SqlitePoolOptions::new()
                    .max_connections(SQLITE_MAX_CONNECTIONS)
                    .acquire_timeout(POOL_CONNECTION_TIMEOUT)
                    .connect_with(options)
                    .await
                    .map_err(|e| CopyError::open(&resource, e))?;
                DatabasePool::Sqlite(pool)
            }
            Vendor::Postgres => {
                let mut options =
                    PgConnectOptions::from_str(&config.url).map_err(|e| CopyError::open(&resource, e))?;
                if let Some(username) = &config.username {
                    options = options.username(username);
                }
                if let Some(password) = &config.password {
                    options = options.password(password);
                }
                let pool = PgPoolOptions::new()
                    .max_connections(POSTGRES_MAX_CONNECTIONS)
                    .acquire_timeout(POOL_CONNECTION_TIMEOUT)
                    .connect_with(options)
                    .await
                    .map_err(|e| CopyError::open(&resource, e))?;
                DatabasePool::Postgres(pool)
            }
        };

        // Test connection
        pool.execute("SELECT 1")
            .await
            .map_err(|e| CopyError::open(&resource, e))?;

        info!("Connected to {}: {}", vendor, resource);
        Ok(pool)
    }

    pub fn vendor(&self) -> Vendor {
        match self {
            DatabasePool::Sqlite(_) => Vendor::Sqlite,
            DatabasePool::Postgres(_) => Vendor::Postgres,
        }
    }

    /// Run a statement that returns no rows.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let affected = match self {
            DatabasePool::Sqlite(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
            DatabasePool::Postgres(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
        };
        Ok(affected)
    }

    pub async fn close(&self) {
        match self {
            DatabasePool::Sqlite(pool) => pool.close().await,
            DatabasePool::Postgres(pool) => pool.close().await,
        }
    }

    /// User table names: creation order for SQLite, name order for Postgres.
    pub async fn table_names(&self, schema: &str) -> Result<Vec<String>> {
        let names: Vec<String> = match self {
            DatabasePool::Sqlite(pool) => {
                let rows: Vec<SqliteRow> = sqlx::query(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
                )
                .fetch_all(pool)
                .await?;
                rows.iter()
                    .map(|row| row.try_get::<String, _>("name"))
                    .collect::<std::result::Result<_, _>>()?
            }
            DatabasePool::Postgres(pool) => {
                let rows: Vec<PgRow> = sqlx::query(
                    r#"
                    SELECT table_name::text AS table_name
                    FROM information_schema.tables
                    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
                    ORDER BY table_name
                    "#,
                )
                .bind(schema)
                .fetch_all(pool)
                .await?;
                rows.iter()
                    .map(|row| row.try_get::<String, _>("table_name"))
                    .collect::<std::result::Result<_, _>>()?
            }
        };
        Ok(names)
    }

    /// Every user table with its columns.
    pub async fn tables(&self, schema: &str) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for name in self.table_names(schema).await? {
            tables.push(self.load_table(schema, &name).await?);
        }
        Ok(tables)
    }

    /// One table, matched case-insensitively. `None` if it does not exist.
    pub async fn table(&self, schema: &str, name: &str) -> Result<Option<Table>> {
        let found = self
            .table_names(schema)
            .await?
            .into_iter()
            .find(|n| n.eq_ignore_ascii_case(name));
        match found {
            Some(actual) => Ok(Some(self.load_table(schema, &actual).await?)),
            None => Ok(None),
        }
    }

    async fn load_table(&self, schema: &str, name: &str) -> Result<Table> {
        let columns = match self {
            DatabasePool::Sqlite(pool) => {
                let rows: Vec<SqliteRow> = sqlx::query(
                    r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?) ORDER BY cid"#,
                )
                .bind(name)
                .fetch_all(pool)
                .await?;

                let mut columns = Vec::with_capacity(rows.len());
                for row in rows {
                    let declared: String = row.try_get("type")?;
                    let (width, scale) = declared_size(&declared);
                    let not_null: i64 = row.try_get("notnull")?;
                    let pk: i64 = row.try_get("pk")?;
                    let mut column = Column::new(row.try_get::<String, _>("name")?, data_type_from(&declared))
                        .with_width(width, scale);
                    column.nullable = not_null == 0 && pk == 0;
                    column.primary_key = pk > 0;
                    columns.push(column);
                }
                columns
            }
            DatabasePool::Postgres(pool) => {
                let rows: Vec<PgRow> = sqlx::query(
                    r#"
                    SELECT
                        column_name::text AS column_name,
                        data_type::text AS data_type,
                        (CASE
                            WHEN character_maximum_length IS NOT NULL THEN character_maximum_length
                            WHEN data_type = 'numeric' THEN COALESCE(numeric_precision, 0)
                            ELSE 0
                        END)::int4 AS width,
                        (CASE
                            WHEN data_type = 'numeric' THEN COALESCE(numeric_scale, 0)
                            ELSE 0
                        END)::int4 AS scale,
                        (is_nullable = 'YES') AS nullable
                    FROM information_schema.columns
                    WHERE table_schema = $1 AND table_name = $2
                    ORDER BY ordinal_position
                    "#,
                )
                .bind(schema)
                .bind(name)
                .fetch_all(pool)
                .await?;

                let pk_rows: Vec<PgRow> = sqlx::query(
                    r#"
                    SELECT kcu.column_name::text AS column_name
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                        AND tc.table_name = kcu.table_name
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                        AND tc.table_schema = $1 AND tc.table_name = $2
                    ORDER BY kcu.ordinal_position
                    "#,
                )
                .bind(schema)
                .bind(name)
                .fetch_all(pool)
                .await?;
                let pk: Vec<String> = pk_rows
                    .iter()
                    .map(|row| row.try_get::<String, _>("column_name"))
                    .collect::<std::result::Result<_, _>>()?;

                let mut columns = Vec::with_capacity(rows.len());
                for row in rows {
                    let declared: String = row.try_get("data_type")?;
                    let width: i32 = row.try_get("width")?;
                    let scale: i32 = row.try_get("scale")?;
                    let mut column = Column::new(row.try_get::<String, _>("column_name")?, data_type_from(&declared))
                        .with_width(width.max(0) as u32, scale.max(0) as u32);
                    column.nullable = row.try_get("nullable")?;
                    if pk.iter().any(|p| p == &column.name) {
                        column = column.primary_key();
                    }
                    columns.push(column);
                }
                columns
            }
        };
        Ok(Table::new(name, columns))
    }

    /// Read one page of a table ordered by primary key, or in physical
    /// order when it has none.
    pub async fn fetch_page(
        &self,
        schema: &str,
        table: &Table,
        start: &PageStart,
        limit: u64,
    ) -> Result<Vec<Record>> {
        if table.columns.is_empty() {
            return Ok(Vec::new());
        }
        let vendor = self.vendor();
        let pk = table.primary_key();
        let after: &[Value] = match start {
            PageStart::After(key) => key.as_slice(),
            _ => &[],
        };
        if matches!(start, PageStart::After(_)) && (pk.is_empty() || after.len() != pk.len()) {
            return Err(CopyError::transfer(
                &table.name,
                format!("page key has {} values for {} key columns", after.len(), pk.len()),
            ));
        }
        let key: Vec<String> = pk.iter().map(|c| vendor.quote_ident(&c.name)).collect();
        let from = vendor.qualify(schema, &table.name);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = match start {
            PageStart::Offset(n) => Some(i64::try_from(*n).unwrap_or(i64::MAX)),
            _ => None,
        };

        match self {
            DatabasePool::Sqlite(pool) => {
                let columns: Vec<String> = table.columns.iter().map(|c| vendor.quote_ident(&c.name)).collect();
                let sql = page_sql(vendor, &columns.join(", "), &from, &key, start);
                let mut query = sqlx::query(&sql);
                for value in after {
                    query = bind_sqlite(query, value.clone());
                }
                query = query.bind(limit);
                if let Some(offset) = offset {
                    query = query.bind(offset);
                }
                let rows: Vec<SqliteRow> = query.fetch_all(pool).await?;
                rows.iter().map(|row| sqlite_record(row, table)).collect()
            }
            DatabasePool::Postgres(pool) => {
                let columns: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| {
                        let name = vendor.quote_ident(&c.name);
                        format!("{}::{} AS {}", name, pg_cast(c.data_type), name)
                    })
                    .collect();
                let sql = page_sql(vendor, &columns.join(", "), &from, &key, start);
                let mut query = sqlx::query(&sql);
                for (value, column) in after.iter().zip(&pk) {
                    query = bind_postgres(query, value.clone(), column.data_type)
                        .map_err(|e| CopyError::transfer(&table.name, e))?;
                }
                query = query.bind(limit);
                if let Some(offset) = offset {
                    query = query.bind(offset);
                }
                let rows: Vec<PgRow> = query.fetch_all(pool).await?;
                rows.iter().map(|row| pg_record(row, table)).collect()
            }
        }
    }

    /// Remove every row of a table.
    pub async fn delete_all(&self, schema: &str, table: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {}", self.vendor().qualify(schema, table));
        self.execute(&sql)
            .await
            .map_err(|e| CopyError::transfer(table, format!("DELETE: {}", e)))
    }

    /// Write rows using multi-row INSERT. Values must already have the
    /// representation of their column's type.
    pub async fn insert(
        &self,
        schema: &str,
        table: &str,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> Result<u64> {
        let num_cols = columns.len();
        if num_cols == 0 || rows.is_empty() {
            return Ok(0);
        }

        let vendor = self.vendor();
        let qualified_table = vendor.qualify(schema, table);
        let col_list: Vec<String> = columns.iter().map(|c| vendor.quote_ident(&c.name)).collect();
        let col_list_str = col_list.join(", ");
        let max_rows_per_batch = (vendor.max_placeholders() / num_cols).max(1);

        for chunk in rows.chunks(max_rows_per_batch) {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                qualified_table,
                col_list_str,
                values_clause(vendor, chunk.len(), num_cols)
            );

            let result = match self {
                DatabasePool::Sqlite(pool) => {
                    let mut query = sqlx::query(&sql);
                    for value in chunk.iter().flatten() {
                        query = bind_sqlite(query, value.clone());
                    }
                    query.execute(pool).await.map(|r| r.rows_affected())
                }
                DatabasePool::Postgres(pool) => {
                    let mut query = sqlx::query(&sql);
                    for row in chunk {
                        for (value, column) in row.iter().zip(columns) {
                            query = bind_postgres(query, value.clone(), column.data_type)
                                .map_err(|e| CopyError::transfer(table, e))?;
                        }
                    }
                    query.execute(pool).await.map(|r| r.rows_affected())
                }
            };
            result.map_err(|e| CopyError::transfer(table, format!("INSERT batch: {}", e)))?;
        }

        Ok(rows.len() as u64)
    }
}

/// URL with any credentials removed, for logs and errors.
pub(crate) fn display_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://{}", &url[..scheme], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Where a page of [`DatabasePool::fetch_page`] begins.
#[derive(Debug, Clone, PartialEq)]
pub enum PageStart {
    /// The first row.
    First,
    /// The row following this primary key value, one value per key column.
    After(Vec<Value>),
    /// Skip this many rows.
    Offset(u64),
}

/// Keyset paging compares the key as a row value so an index on the key
/// serves every page. Tables without a key fall back to OFFSET over the
/// physical row order.
fn page_sql(vendor: Vendor, select: &str, from: &str, key: &[String], start: &PageStart) -> String {
    let mut sql = format!("SELECT {} FROM {}", select, from);
    let mut n = 0;
    if let PageStart::After(values) = start {
        let params: Vec<String> = values
            .iter()
            .map(|_| {
                n += 1;
                vendor.placeholder(n)
            })
            .collect();
        sql.push_str(&format!(" WHERE ({}) > ({})", key.join(", "), params.join(", ")));
    }
    let order = if key.is_empty() {
        match vendor {
            Vendor::Sqlite => "rowid".to_string(),
            Vendor::Postgres => "ctid".to_string(),
        }
    } else {
        key.join(", ")
    };
    n += 1;
    sql.push_str(&format!(" ORDER BY {} LIMIT {}", order, vendor.placeholder(n)));
    if let PageStart::Offset(_) = start {
        n += 1;
        sql.push_str(&format!(" OFFSET {}", vendor.placeholder(n)));
    }
    sql
}

fn values_clause(vendor: Vendor, rows: usize, cols: usize) -> String {
    let mut tuples = Vec::with_capacity(rows);
    let mut n = 0;
    for _ in 0..rows {
        let mut placeholders = Vec::with_capacity(cols);
        for _ in 0..cols {
            n += 1;
            placeholders.push(vendor.placeholder(n));
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }
    tuples.join(", ")
}

/// Postgres cast that fixes the wire type decoded for a column.
fn pg_cast(data_type: DataType) -> &'static str {
    match data_type {
        DataType::String | DataType::Clob => "text",
        DataType::Integer | DataType::BigInteger => "int8",
        DataType::Decimal => "numeric",
        DataType::Boolean => "boolean",
        DataType::Date => "date",
        DataType::DateTime => "timestamp",
        DataType::Blob => "bytea",
    }
}

fn coerce_to(value: Value, column: &Column, table: &Table) -> Result<Value> {
    value
        .coerce(column.data_type)
        .map_err(|e| CopyError::transfer(&table.name, format!("column {}: {}", column.name, e)))
}

/// SQLite values are decoded by storage class, then converted to the
/// declared column type.
fn sqlite_record(row: &SqliteRow, table: &Table) -> Result<Record> {
    let mut record = Record::with_capacity(table.columns.len());
    for (i, column) in table.columns.iter().enumerate() {
        let storage = {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };
        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER" | "BIGINT" | "INT8" | "BOOLEAN") => {
                Value::Integer(row.try_get_unchecked::<i64, _>(i)?)
            }
            Some("REAL" | "FLOAT" | "DOUBLE") => Value::Float(row.try_get_unchecked::<f64, _>(i)?),
            Some("BLOB") => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
            Some(_) => Value::Text(row.try_get_unchecked::<String, _>(i)?),
        };
        record.set(column.name.clone(), coerce_to(value, column, table)?);
    }
    Ok(record)
}

fn pg_record(row: &PgRow, table: &Table) -> Result<Record> {
    let mut record = Record::with_capacity(table.columns.len());
    for (i, column) in table.columns.iter().enumerate() {
        let value = match column.data_type {
            DataType::String | DataType::Clob => row.try_get::<Option<String>, _>(i)?.map(Value::Text),
            DataType::Integer | DataType::BigInteger => {
                row.try_get::<Option<i64>, _>(i)?.map(Value::Integer)
            }
            DataType::Decimal => row.try_get::<Option<Decimal>, _>(i)?.map(Value::Decimal),
            DataType::Boolean => row.try_get::<Option<bool>, _>(i)?.map(Value::Boolean),
            DataType::Date => row.try_get::<Option<NaiveDate>, _>(i)?.map(Value::Date),
            DataType::DateTime => row
                .try_get::<Option<NaiveDateTime>, _>(i)?
                .map(Value::DateTime),
            DataType::Blob => row.try_get::<Option<Vec<u8>>, _>(i)?.map(Value::Blob),
        };
        record.set(column.name.clone(), value.unwrap_or(Value::Null));
    }
    Ok(record)
}

/// SQLite has no native decimal or date types; those are stored as text.
fn bind_sqlite(query: SqliteQuery<'_>, value: Value) -> SqliteQuery<'_> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Boolean(b) => query.bind(b),
        Value::Integer(i) => query.bind(i),
        Value::Float(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
        Value::Blob(b) => query.bind(b),
        other => query.bind(other.to_text()),
    }
}

/// Postgres parameters are typed, so NULLs carry the column's type.
fn bind_postgres(
    query: PgQuery<'_>,
    value: Value,
    data_type: DataType,
) -> std::result::Result<PgQuery<'_>, String> {
    let query = match (value, data_type) {
        (Value::Null, DataType::String | DataType::Clob) => query.bind(None::<String>),
        (Value::Null, DataType::Integer) => query.bind(None::<i32>),
        (Value::Null, DataType::BigInteger) => query.bind(None::<i64>),
        (Value::Null, DataType::Decimal) => query.bind(None::<Decimal>),
        (Value::Null, DataType::Boolean) => query.bind(None::<bool>),
        (Value::Null, DataType::Date) => query.bind(None::<NaiveDate>),
        (Value::Null, DataType::DateTime) => query.bind(None::<NaiveDateTime>),
        (Value::Null, DataType::Blob) => query.bind(None::<Vec<u8>>),
        (Value::Integer(i), DataType::Integer) => {
            let narrow =
                i32::try_from(i).map_err(|_| format!("{} is out of range for INTEGER", i))?;
            query.bind(narrow)
        }
        (Value::Integer(i), _) => query.bind(i),
        (Value::Decimal(d), _) => query.bind(d),
        (Value::Float(f), _) => query.bind(f),
        (Value::Boolean(b), _) => query.bind(b),
        (Value::Date(d), _) => query.bind(d),
        (Value::DateTime(dt), _) => query.bind(dt),
        (Value::Text(s), _) => query.bind(s),
        (Value::Blob(b), _) => query.bind(b),
    };
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_url_hides_credentials() {
        assert_eq!(
            display_url("postgres://loader:secret@db:5432/stock"),
            "postgres://db:5432/stock"
        );
        assert_eq!(display_url("sqlite:stock.db"), "sqlite:stock.db");
    }

    #[test]
    fn test_values_clause() {
        assert_eq!(values_clause(Vendor::Sqlite, 2, 2), "(?, ?), (?, ?)");
        assert_eq!(values_clause(Vendor::Postgres, 2, 2), "($1, $2), ($3, $4)");
    }

    #[test]
    fn test_page_sql() {
        let key = vec!["\"a\"".to_string(), "\"b\"".to_string()];
        assert_eq!(
            page_sql(Vendor::Sqlite, "*", "\"T\"", &key, &PageStart::First),
            "SELECT * FROM \"T\" ORDER BY \"a\", \"b\" LIMIT ?"
        );
        assert_eq!(
            page_sql(
                Vendor::Postgres,
                "*",
                "\"public\".\"T\"",
                &key,
                &PageStart::After(vec![Value::Integer(1), Value::Integer(2)])
            ),
            "SELECT * FROM \"public\".\"T\" WHERE (\"a\", \"b\") > ($1, $2) ORDER BY \"a\", \"b\" LIMIT $3"
        );
        assert_eq!(
            page_sql(Vendor::Postgres, "*", "\"public\".\"T\"", &[], &PageStart::Offset(5)),
            "SELECT * FROM \"public\".\"T\" ORDER BY ctid LIMIT $1 OFFSET $2"
        );
    }

    #[tokio::test]
    async fn test_keyset_pages_on_composite_key() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("lines.db").display());
        let pool = DatabasePool::connect(&DatabaseConfig::new(url), true)
            .await
            .unwrap();

        let table = Table::new(
            "LINE",
            vec![
                Column::new("order_id", DataType::Integer).primary_key(),
                Column::new("line", DataType::Integer).primary_key(),
                Column::new("item", DataType::String).with_width(20, 0).nullable(),
            ],
        );
        pool.execute(&Vendor::Sqlite.create_table("public", &table))
            .await
            .unwrap();
        let rows: Vec<Vec<Value>> = [(2, 1), (1, 2), (1, 1), (2, 2), (1, 3)]
            .iter()
            .map(|&(o, l)| vec![Value::Integer(o), Value::Integer(l), Value::Text(format!("{}-{}", o, l))])
            .collect();
        pool.insert("public", "LINE", &table.columns, &rows).await.unwrap();

        let page = pool
            .fetch_page("public", &table, &PageStart::After(vec![Value::Integer(1), Value::Integer(2)]), 2)
            .await
            .unwrap();
        let items: Vec<_> = page.iter().map(|r| r.get("item").cloned()).collect();
        assert_eq!(
            items,
            vec![Some(Value::Text("1-3".into())), Some(Value::Text("2-1".into()))]
        );

        let last = pool
            .fetch_page("public", &table, &PageStart::After(vec![Value::Integer(2), Value::Integer(2)]), 2)
            .await
            .unwrap();
        assert!(last.is_empty());

        let err = pool
            .fetch_page("public", &table, &PageStart::After(vec![Value::Integer(1)]), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Transfer { .. }));
        pool.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("stock.db").display());
        let pool = DatabasePool::connect(&DatabaseConfig::new(url), true)
            .await
            .unwrap();

        let table = Table::new(
            "ITEM",
            vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("label", DataType::String).with_width(40, 0).nullable(),
                Column::new("price", DataType::Decimal).with_width(10, 2).nullable(),
                Column::new("active", DataType::Boolean).nullable(),
                Column::new("added", DataType::Date).nullable(),
            ],
        );
        pool.execute(&Vendor::Sqlite.create_table("public", &table))
            .await
            .unwrap();

        let loaded = pool.table("public", "item").await.unwrap().unwrap();
        assert_eq!(loaded, table);

        let rows = vec![
            vec![
                Value::Integer(2),
                Value::Text("nut".into()),
                Value::Decimal(Decimal::new(25, 2)),
                Value::Boolean(true),
                Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            ],
            vec![
                Value::Integer(1),
                Value::Null,
                Value::Null,
                Value::Boolean(false),
                Value::Null,
            ],
        ];
        assert_eq!(pool.insert("public", "ITEM", &table.columns, &rows).await.unwrap(), 2);

        let page = pool.fetch_page("public", &table, &PageStart::First, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].get("id"), Some(&Value::Integer(1)));
        assert_eq!(page[0].get("label"), Some(&Value::Null));
        assert_eq!(page[0].get("active"), Some(&Value::Boolean(false)));
        assert_eq!(page[1].get("price"), Some(&Value::Decimal(Decimal::new(25, 2))));
        assert_eq!(
            page[1].get("added"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );

        assert_eq!(pool.fetch_page("public", &table, &PageStart::Offset(1), 10).await.unwrap().len(), 1);
        assert_eq!(pool.delete_all("public", "ITEM").await.unwrap(), 2);
        assert!(pool.table("public", "missing").await.unwrap().is_none());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_unsupported_url_is_config_error() {
        let err = DatabasePool::connect(&DatabaseConfig::new("mysql://h/db"), false)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CopyError::Config(_)));
    }
}
