use crate::collab::RelationalStore;
use crate::error::{InsertError, QueryError};
use crate::schema::{NewReportRow, RemoteRow};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// SQLite-backed relational store for reports.
pub struct SqliteReports {
    conn: Mutex<Connection>,
}

impl SqliteReports {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // SQLite rolls back an interrupted statement; the connection stays usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          submission_id TEXT UNIQUE,
          created_at TEXT,
          created_at_ms INTEGER,
          photo_url TEXT,
          description TEXT,
          address TEXT,
          lat REAL,
          lng REAL,
          inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_created_at_ms ON reports(created_at_ms);
        "#,
    )?;
    Ok(())
}

const SELECT_COLUMNS: &str = "id, submission_id, created_at, photo_url, description, address, lat, lng";

fn row_to_remote(row: &rusqlite::Row<'_>) -> rusqlite::Result<RemoteRow> {
    let id: i64 = row.get(0)?;
    let submission_id: Option<String> = row.get(1)?;
    Ok(RemoteRow {
        id: id.to_string(),
        submission_id: submission_id.and_then(|raw| Uuid::parse_str(&raw).ok()),
        created_at: row.get(2)?,
        photo_url: row.get(3)?,
        description: row.get(4)?,
        address: row.get(5)?,
        lat: row.get(6)?,
        lng: row.get(7)?,
    })
}

impl SqliteReports {
    /// Inserts the row unless a row with the same submission id exists, and
    /// returns the stored row either way.
    pub fn insert_row(&self, row: &NewReportRow) -> Result<RemoteRow, InsertError> {
        let created_at = row
            .created_at
            .format(&Rfc3339)
            .map_err(|e| InsertError::Rejected(e.to_string()))?;
        // RFC 3339 text does not sort chronologically once fractions appear.
        let created_at_ms = i64::try_from(row.created_at.unix_timestamp_nanos() / 1_000_000)
            .map_err(|e| InsertError::Rejected(e.to_string()))?;
        let submission_id = row.submission_id.to_string();

        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO reports (submission_id, created_at, created_at_ms, photo_url, description, address, lat, lng)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(submission_id) DO NOTHING
            "#,
            params![
                submission_id,
                created_at,
                created_at_ms,
                row.photo_url,
                row.description,
                row.address,
                row.lat,
                row.lng
            ],
        )?;

        let stored = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM reports WHERE submission_id = ?1"),
                params![submission_id],
                row_to_remote,
            )
            .optional()?;
        stored.ok_or_else(|| InsertError::Rejected(format!("row {submission_id} missing after insert")))
    }

    pub fn query_rows(&self, limit: usize) -> Result<Vec<RemoteRow>, QueryError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM reports ORDER BY created_at_ms DESC, id DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_remote)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

impl RelationalStore for SqliteReports {
    async fn insert(&self, row: NewReportRow) -> Result<RemoteRow, InsertError> {
        self.insert_row(&row)
    }

    async fn query(&self, limit: usize) -> Result<Vec<RemoteRow>, QueryError> {
        self.query_rows(limit)
    }
}
