//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the database schema.
///
/// Safe to run against an existing database: the count row is only seeded
/// when missing, from the rows already present.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
-- Pending jobs, oldest first by id
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_payload ON jobs(payload);

-- Single-row running count
CREATE TABLE IF NOT EXISTS job_count (
    id INTEGER PRIMARY KEY CHECK (id = 0),
    total INTEGER NOT NULL
);

INSERT OR IGNORE INTO job_count (id, total) SELECT 0, COUNT(*) FROM jobs;

-- Triggers to keep the count in sync
CREATE TRIGGER IF NOT EXISTS jobs_ai AFTER INSERT ON jobs BEGIN
    UPDATE job_count SET total = total + 1 WHERE id = 0;
END;

CREATE TRIGGER IF NOT EXISTS jobs_ad AFTER DELETE ON jobs BEGIN
    UPDATE job_count SET total = total - 1 WHERE id = 0;
END;
"#;
