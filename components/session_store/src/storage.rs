//! Blocking SQLite backend. Runs on `tokio::task::spawn_blocking`; nothing
//! in this module is async.

use rusqlite::{params, Connection, OptionalExtension};
use shared_types::session::Session;
use shared_types::tab::{Tab, WindowBounds};
use shared_types::{SessionId, StoreError};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Persisted layout per §6: one `sessions` table (no `window_id` column —
/// see the design decision not to persist a runtime-only field), plus a
/// `process_state` scalar key/value table for the extension-version marker
/// used by the one-shot migration hook.
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

fn io_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Io(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

impl Storage {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let conn = Connection::open(db_path).map_err(io_err)?;
        let storage = Self { conn: Arc::new(Mutex::new(conn)) };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                session_hash INTEGER NOT NULL,
                tabs_json TEXT NOT NULL,
                history_json TEXT NOT NULL,
                last_access INTEGER NOT NULL,
                bounds_left INTEGER,
                bounds_top INTEGER,
                bounds_width INTEGER,
                bounds_height INTEGER
            )",
            [],
        )
        .map_err(io_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_last_access ON sessions(last_access DESC)",
            [],
        )
        .map_err(io_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS process_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(io_err)?;

        Ok(())
    }

    pub fn fetch_all(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, session_hash, tabs_json, history_json, last_access,
                        bounds_left, bounds_top, bounds_width, bounds_height
                 FROM sessions",
            )
            .map_err(io_err)?;

        let rows = stmt
            .query_map([], row_to_session)
            .map_err(io_err)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(io_err)?.map_err(ser_err)?);
        }
        Ok(out)
    }

    pub fn fetch_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, session_hash, tabs_json, history_json, last_access,
                    bounds_left, bounds_top, bounds_width, bounds_height
             FROM sessions WHERE id = ?1",
            params![id.0],
            row_to_session,
        )
        .optional()
        .map_err(io_err)?
        .transpose()
        .map_err(ser_err)
    }

    pub fn fetch_by_name(&self, name: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, session_hash, tabs_json, history_json, last_access,
                    bounds_left, bounds_top, bounds_width, bounds_height
             FROM sessions WHERE name IS NOT NULL AND LOWER(name) = LOWER(?1)",
            params![name],
            row_to_session,
        )
        .optional()
        .map_err(io_err)?
        .transpose()
        .map_err(ser_err)
    }

    pub fn create(&self, draft: &Session) -> Result<Session, StoreError> {
        let tabs_json = serde_json::to_string(&draft.tabs).map_err(ser_err)?;
        let history_json = serde_json::to_string(&draft.history).map_err(ser_err)?;
        let (left, top, width, height) = bounds_columns(&draft.window_bounds);

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions
             (name, session_hash, tabs_json, history_json, last_access,
              bounds_left, bounds_top, bounds_width, bounds_height)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                draft.name,
                draft.session_hash,
                tabs_json,
                history_json,
                draft.last_access,
                left,
                top,
                width,
                height,
            ],
        )
        .map_err(io_err)?;

        let id = conn.last_insert_rowid();
        let mut saved = draft.clone();
        saved.id = Some(SessionId(id));
        // window_id is runtime-only and has no column (design decision 3);
        // the returned row reflects exactly what was stored.
        saved.window_id = None;
        Ok(saved)
    }

    pub fn update(&self, session: &Session) -> Result<Session, StoreError> {
        let id = session.id.ok_or_else(|| StoreError::Io("update requires an id".into()))?;
        let tabs_json = serde_json::to_string(&session.tabs).map_err(ser_err)?;
        let history_json = serde_json::to_string(&session.history).map_err(ser_err)?;
        let (left, top, width, height) = bounds_columns(&session.window_bounds);

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET name = ?1, session_hash = ?2, tabs_json = ?3,
             history_json = ?4, last_access = ?5, bounds_left = ?6, bounds_top = ?7,
             bounds_width = ?8, bounds_height = ?9
             WHERE id = ?10",
            params![
                session.name,
                session.session_hash,
                tabs_json,
                history_json,
                session.last_access,
                left,
                top,
                width,
                height,
                id.0,
            ],
        )
        .map_err(io_err)?;

        Ok(session.clone())
    }

    pub fn remove(&self, id: SessionId) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n = conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.0])
            .map_err(io_err)?;
        Ok(n > 0)
    }

    pub fn list_sessions(&self) -> Result<Vec<(SessionId, i64)>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, last_access FROM sessions ORDER BY last_access DESC")
            .map_err(io_err)?;
        let rows = stmt
            .query_map([], |row| Ok((SessionId(row.get(0)?), row.get(1)?)))
            .map_err(io_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(io_err)?);
        }
        Ok(out)
    }

    /// Delete all but the `keep_count` most-recently-accessed sessions.
    /// Supplements §4.3's CRUD list with a bound on storage growth.
    pub fn cleanup_old_sessions(&self, keep_count: usize) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id FROM sessions ORDER BY last_access DESC LIMIT ?1")
            .map_err(io_err)?;
        let keep_ids: Vec<i64> = stmt
            .query_map(params![keep_count as i64], |row| row.get(0))
            .map_err(io_err)?
            .collect::<Result<_, _>>()
            .map_err(io_err)?;

        if keep_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = keep_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!("DELETE FROM sessions WHERE id NOT IN ({placeholders})");
        let bound: Vec<&dyn rusqlite::ToSql> =
            keep_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        conn.execute(&query, bound.as_slice()).map_err(io_err)
    }

    pub fn get_extension_version(&self) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM process_state WHERE key = 'extension_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(io_err)
    }

    pub fn set_extension_version(&self, version: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO process_state (key, value) VALUES ('extension_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![version],
        )
        .map_err(io_err)?;
        Ok(())
    }
}

fn bounds_columns(bounds: &Option<WindowBounds>) -> (Option<i32>, Option<i32>, Option<i32>, Option<i32>) {
    match bounds {
        Some(b) => (Some(b.left), Some(b.top), Some(b.width), Some(b.height)),
        None => (None, None, None, None),
    }
}

type RowResult = rusqlite::Result<Result<Session, serde_json::Error>>;

fn row_to_session(row: &rusqlite::Row) -> RowResult {
    let id: i64 = row.get(0)?;
    let name: Option<String> = row.get(1)?;
    let session_hash: u32 = row.get(2)?;
    let tabs_json: String = row.get(3)?;
    let history_json: String = row.get(4)?;
    let last_access: i64 = row.get(5)?;
    let left: Option<i32> = row.get(6)?;
    let top: Option<i32> = row.get(7)?;
    let width: Option<i32> = row.get(8)?;
    let height: Option<i32> = row.get(9)?;

    Ok((|| -> Result<Session, serde_json::Error> {
        let tabs: Vec<Tab> = serde_json::from_str(&tabs_json)?;
        let history: Vec<Tab> = serde_json::from_str(&history_json)?;
        let window_bounds = match (left, top, width, height) {
            (Some(left), Some(top), Some(width), Some(height)) => {
                Some(WindowBounds { left, top, width, height })
            }
            _ => None,
        };

        Ok(Session {
            id: Some(SessionId(id)),
            name,
            session_hash,
            tabs,
            history,
            last_access,
            window_bounds,
            window_id: None,
        })
    })())
}
