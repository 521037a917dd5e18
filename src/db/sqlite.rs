use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::SummaryStore;
use crate::db::models::{SchemaRow, SummaryRow, TableRow};
use crate::db::schema::SQLITE_INIT;
use crate::error::SummaryError;
use crate::types::{Schema, Summary, Table};

pub type SqlitePool = Pool<Sqlite>;

const SUMMARY_COLUMNS: &str =
    "id, name, synced_at, source_host, source_port, source_user, source_dbname";

#[derive(Clone)]
pub struct SqliteSummaryStore {
    pool: SqlitePool,
}

impl SqliteSummaryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a bounded pool against `database_url`, creating the file if needed,
    /// and apply the schema.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        max_lifetime: Duration,
    ) -> Result<Self, SummaryError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .max_lifetime(max_lifetime)
            .connect_with(connect_opts)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection is kept open for the
    /// lifetime of the pool since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, SummaryError> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), SummaryError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    /// Deep upsert keyed by `summary.id`.
    ///
    /// Lookup, parent write and child replacement share one transaction. On update
    /// the stored schemas and tables are deleted and the new tree inserted, so no
    /// child of an earlier save survives. A save stamped earlier than the stored
    /// summary is dropped and the stored summary is returned instead.
    async fn save_summary(&self, mut summary: Summary) -> Result<Summary, SummaryError> {
        summary.normalize_ids();

        let mut tx = self.pool.begin().await?;

        let existing: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT synced_at FROM summaries WHERE id = ?")
                .bind(&summary.id)
                .fetch_optional(&mut *tx)
                .await?;

        match existing {
            None => {
                insert_summary_row(&mut tx, &summary).await?;
                debug!(id = %summary.id, "inserted new summary");
            }
            Some((stored_at,)) if stored_at > summary.synced_at => {
                debug!(
                    id = %summary.id,
                    %stored_at,
                    incoming = %summary.synced_at,
                    "stale summary, keeping stored version"
                );
                let current = load_summary(&mut tx, &summary.id).await?;
                tx.commit().await?;
                return current.ok_or(SummaryError::NotFound { id: summary.id });
            }
            Some(_) => {
                update_summary_row(&mut tx, &summary).await?;
                delete_children(&mut tx, &summary.id).await?;
                debug!(id = %summary.id, "updated summary, replacing children");
            }
        }
        insert_children(&mut tx, &summary).await?;

        tx.commit().await?;
        Ok(summary)
    }

    /// Pages are taken in insertion order with `offset = (page - 1) * page_size`.
    /// An offset past `i64::MAX` is an empty page.
    async fn get_summaries(&self, page: i64, page_size: i64) -> Result<Vec<Summary>, SummaryError> {
        let Some(offset) = page.saturating_sub(1).checked_mul(page_size) else {
            debug!(page, page_size, "page offset out of range");
            return Ok(Vec::new());
        };

        // one transaction so each summary and its children come from the same commit
        let mut tx = self.pool.begin().await?;
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM summaries ORDER BY rowid LIMIT ? OFFSET ?"
        ))
        .bind(page_size)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let schemas = load_schemas(&mut tx, &row.id).await?;
            summaries.push(row.into_summary(schemas));
        }
        tx.commit().await?;
        Ok(summaries)
    }

    async fn get_summary_by_id(&self, id: &str) -> Result<Summary, SummaryError> {
        let mut tx = self.pool.begin().await?;
        let summary = load_summary(&mut tx, id).await?;
        tx.commit().await?;
        summary.ok_or_else(|| SummaryError::NotFound { id: id.to_string() })
    }
}

async fn load_summary(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Summary>, SummaryError> {
    let row: Option<SummaryRow> = sqlx::query_as(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let schemas = load_schemas(conn, &row.id).await?;
    Ok(Some(row.into_summary(schemas)))
}

async fn load_schemas(
    conn: &mut SqliteConnection,
    summary_id: &str,
) -> Result<Vec<Schema>, SummaryError> {
    let schemas: Vec<SchemaRow> = sqlx::query_as(
        r#"SELECT id, summary_id, name, synced_at
           FROM summary_schemas WHERE summary_id = ? ORDER BY rowid"#,
    )
    .bind(summary_id)
    .fetch_all(&mut *conn)
    .await?;

    let tables: Vec<TableRow> = sqlx::query_as(
        r#"SELECT t.id, t.schema_id, t.name, t.row_count, t.size_mb
           FROM summary_tables t
           JOIN summary_schemas s ON s.id = t.schema_id
           WHERE s.summary_id = ?
           ORDER BY t.rowid"#,
    )
    .bind(summary_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_schema: HashMap<String, Vec<Table>> = HashMap::new();
    for t in tables {
        by_schema.entry(t.schema_id.clone()).or_default().push(t.into());
    }

    Ok(schemas
        .into_iter()
        .map(|s| {
            let tables = by_schema.remove(&s.id).unwrap_or_default();
            s.into_schema(tables)
        })
        .collect())
}

async fn insert_summary_row(
    conn: &mut SqliteConnection,
    summary: &Summary,
) -> Result<(), SummaryError> {
    let src = &summary.source_info;
    sqlx::query(
        r#"
        INSERT INTO summaries (
            id, name, synced_at, source_host, source_port, source_user, source_dbname
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&summary.id)
    .bind(&summary.name)
    .bind(summary.synced_at)
    .bind(&src.host)
    .bind(src.port.map(i64::from))
    .bind(&src.user)
    .bind(&src.dbname)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_summary_row(
    conn: &mut SqliteConnection,
    summary: &Summary,
) -> Result<(), SummaryError> {
    let src = &summary.source_info;
    sqlx::query(
        r#"UPDATE summaries SET
            name = ?,
            synced_at = ?,
            source_host = ?,
            source_port = ?,
            source_user = ?,
            source_dbname = ?
          WHERE id = ?"#,
    )
    .bind(&summary.name)
    .bind(summary.synced_at)
    .bind(&src.host)
    .bind(src.port.map(i64::from))
    .bind(&src.user)
    .bind(&src.dbname)
    .bind(&summary.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn delete_children(conn: &mut SqliteConnection, summary_id: &str) -> Result<(), SummaryError> {
    sqlx::query(
        r#"DELETE FROM summary_tables
           WHERE schema_id IN (SELECT id FROM summary_schemas WHERE summary_id = ?)"#,
    )
    .bind(summary_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM summary_schemas WHERE summary_id = ?")
        .bind(summary_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_children(conn: &mut SqliteConnection, summary: &Summary) -> Result<(), SummaryError> {
    for schema in &summary.schemas {
        sqlx::query(
            "INSERT INTO summary_schemas (id, summary_id, name, synced_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&schema.id)
        .bind(&schema.summary_id)
        .bind(&schema.name)
        .bind(schema.synced_at)
        .execute(&mut *conn)
        .await?;

        for table in &schema.tables {
            sqlx::query(
                r#"INSERT INTO summary_tables (id, schema_id, name, row_count, size_mb)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&table.id)
            .bind(&table.schema_id)
            .bind(&table.name)
            .bind(table.row_count)
            .bind(table.size_mb)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}
