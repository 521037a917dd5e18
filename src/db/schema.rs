//! SQL DDL for initializing the summary storage.

/// SQLite schema with:
/// - `summaries` keyed by the caller/fetch supplied id, source details embedded
///   as `source_*` columns (no password column)
/// - `summary_schemas` and `summary_tables` owned by their parent and removed
///   with it via `ON DELETE CASCADE`
/// - Timestamps stored as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS summaries (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    synced_at TEXT NOT NULL,
    source_host TEXT NOT NULL DEFAULT '',
    source_port INTEGER NULL,
    source_user TEXT NOT NULL DEFAULT '',
    source_dbname TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS summary_schemas (
    id TEXT PRIMARY KEY NOT NULL,
    summary_id TEXT NOT NULL REFERENCES summaries(id) ON DELETE CASCADE,
    name TEXT NOT NULL DEFAULT '',
    synced_at TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_summary_schemas_summary_id ON summary_schemas(summary_id);

CREATE TABLE IF NOT EXISTS summary_tables (
    id TEXT PRIMARY KEY NOT NULL,
    schema_id TEXT NOT NULL REFERENCES summary_schemas(id) ON DELETE CASCADE,
    name TEXT NOT NULL DEFAULT '',
    row_count INTEGER NOT NULL DEFAULT 0,
    size_mb REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_summary_tables_schema_id ON summary_tables(schema_id);
"#;
