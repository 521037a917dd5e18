use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::ConnectionDetails;

/// Synchronized snapshot of a remote database's schema and table metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub source_info: ConnectionDetails,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub schema_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub size_mb: f64,
}

impl Summary {
    /// Assign missing ids and force every child link to point at its parent.
    ///
    /// Caller-supplied `summary_id`/`schema_id` values are always overwritten.
    pub fn normalize_ids(&mut self) {
        if self.id.is_empty() {
            self.id = new_id();
        }
        for schema in &mut self.schemas {
            if schema.id.is_empty() {
                schema.id = new_id();
            }
            schema.summary_id = self.id.clone();
            for table in &mut schema.tables {
                if table.id.is_empty() {
                    table.id = new_id();
                }
                table.schema_id = schema.id.clone();
            }
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ids_generates_ids_and_repairs_links() {
        let mut summary = Summary {
            id: "sum123".to_string(),
            schemas: vec![
                Schema {
                    summary_id: "someone-else".to_string(),
                    name: "public".to_string(),
                    tables: vec![Table {
                        schema_id: "bogus".to_string(),
                        name: "users".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                Schema {
                    id: "kept".to_string(),
                    name: "sales".to_string(),
                    tables: vec![Table {
                        id: "t1".to_string(),
                        name: "invoices".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        summary.normalize_ids();

        let public = &summary.schemas[0];
        assert!(!public.id.is_empty());
        assert_eq!(public.summary_id, "sum123");
        assert!(!public.tables[0].id.is_empty());
        assert_eq!(public.tables[0].schema_id, public.id);

        let sales = &summary.schemas[1];
        assert_eq!(sales.id, "kept");
        assert_eq!(sales.summary_id, "sum123");
        assert_eq!(sales.tables[0].id, "t1");
        assert_eq!(sales.tables[0].schema_id, "kept");
    }

    #[test]
    fn normalize_ids_fills_an_empty_summary_id() {
        let mut summary = Summary::default();
        summary.normalize_ids();
        assert!(!summary.id.is_empty());
    }

    #[test]
    fn decodes_remote_payload_without_timestamps_or_ids() {
        let payload = r#"{
            "id": "sum123",
            "source_info": {"host": "db", "port": 5432, "user": "u", "password": "p", "dbname": "d"},
            "schemas": [{"name": "public", "tables": [{"name": "users", "row_count": 0, "size_mb": 12.5}]}]
        }"#;
        let summary: Summary = serde_json::from_str(payload).unwrap();
        assert_eq!(summary.id, "sum123");
        assert_eq!(summary.schemas[0].synced_at, None);
        assert_eq!(summary.schemas[0].tables[0].size_mb, 12.5);
    }
}
