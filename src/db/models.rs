use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{ConnectionDetails, Schema, Summary, Table};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SummaryRow {
    pub id: String,
    pub name: String,
    pub synced_at: DateTime<Utc>,
    pub source_host: String,
    pub source_port: Option<i64>,
    pub source_user: String,
    pub source_dbname: String,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SchemaRow {
    pub id: String,
    pub summary_id: String,
    pub name: String,
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TableRow {
    pub id: String,
    pub schema_id: String,
    pub name: String,
    pub row_count: i64,
    pub size_mb: f64,
}

impl SummaryRow {
    /// Rebuild the domain value; children are attached by the caller.
    pub fn into_summary(self, schemas: Vec<Schema>) -> Summary {
        Summary {
            id: self.id,
            name: self.name,
            synced_at: self.synced_at,
            source_info: ConnectionDetails {
                host: self.source_host,
                port: self.source_port.and_then(|p| u16::try_from(p).ok()),
                user: self.source_user,
                password: String::new(),
                dbname: self.source_dbname,
            },
            schemas,
        }
    }
}

impl SchemaRow {
    pub fn into_schema(self, tables: Vec<Table>) -> Schema {
        Schema {
            id: self.id,
            summary_id: self.summary_id,
            name: self.name,
            synced_at: self.synced_at,
            tables,
        }
    }
}

impl From<TableRow> for Table {
    fn from(r: TableRow) -> Self {
        Table {
            id: r.id,
            schema_id: r.schema_id,
            name: r.name,
            row_count: r.row_count,
            size_mb: r.size_mb,
        }
    }
}
