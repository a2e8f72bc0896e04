//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// Timestamps are unix milliseconds.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    trigger_url TEXT NOT NULL,
    api_key TEXT NOT NULL,
    schedule TEXT NOT NULL,
    start_date INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_run INTEGER,
    next_run INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- History outlives its job, so no foreign keys.
CREATE TABLE IF NOT EXISTS execution_records (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL,
    status TEXT NOT NULL,
    response TEXT NOT NULL,
    triggered_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS webhook_records (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_active ON jobs(is_active, start_date);
CREATE INDEX IF NOT EXISTS idx_execution_records_job ON execution_records(job_id, triggered_at);
CREATE INDEX IF NOT EXISTS idx_webhook_records_created ON webhook_records(created_at);
"#;
