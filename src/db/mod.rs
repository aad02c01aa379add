use crate::errors::{AppError, AppResult};
use crate::models::{Lead, LeadFields};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// The lead gateway. Owns the single connection from `open` until `close`;
/// every statement is funneled through it.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Option<Connection>>,
    db_path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Connection(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|err| AppError::Connection(err.to_string()))?;
        tracing::info!(path = %path.display(), "lead database opened");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn ensure_schema(&self) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA_SQL)
                .map_err(|err| AppError::Internal(format!("schema creation failed: {}", err)))
        })
    }

    pub fn create(&self, fields: &LeadFields) -> AppResult<Lead> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO leads (name, mobileNumber, description, status) VALUES (?1, ?2, ?3, ?4)",
                params![fields.name, fields.mobile_number, fields.description, fields.status],
            )
            .map_err(AppError::write)?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(lead_id = id, "lead inserted");
        Ok(Lead {
            id,
            name: fields.name.clone(),
            mobile_number: fields.mobile_number.clone(),
            description: fields.description.clone(),
            status: fields.status.clone(),
        })
    }

    pub fn read_all(&self) -> AppResult<Vec<Lead>> {
        self.with_conn(|conn| {
            let mut statement = conn
                .prepare("SELECT id, name, mobileNumber, description, status FROM leads")
                .map_err(AppError::read)?;

            let leads = statement
                .query_map([], parse_lead_row)
                .map_err(AppError::read)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(AppError::read)?;
            Ok(leads)
        })
    }

    pub fn get(&self, id: i64) -> AppResult<Option<Lead>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, mobileNumber, description, status FROM leads WHERE id = ?1",
                [id],
                parse_lead_row,
            )
            .optional()
            .map_err(AppError::read)
        })
    }

    pub fn count(&self) -> AppResult<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(1) FROM leads", [], |row| row.get(0))
                .map_err(AppError::read)
        })
    }

    /// Overwrites every content field of the row. Returns `false` when no row
    /// has the id; that is not an error.
    pub fn update(&self, id: i64, fields: &LeadFields) -> AppResult<bool> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE leads SET name = ?1, mobileNumber = ?2, description = ?3, status = ?4 WHERE id = ?5",
                params![fields.name, fields.mobile_number, fields.description, fields.status, id],
            )
            .map_err(AppError::write)
        })?;

        tracing::info!(lead_id = id, changed, "lead updated");
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> AppResult<bool> {
        let changed = self.with_conn(|conn| {
            conn.execute("DELETE FROM leads WHERE id = ?1", [id])
                .map_err(AppError::write)
        })?;

        tracing::info!(lead_id = id, changed, "lead deleted");
        Ok(changed > 0)
    }

    /// Closes the connection. Later calls fail with a connection error;
    /// closing twice is a no-op.
    pub fn close(&self) -> AppResult<()> {
        let mut guard = self.lock()?;
        let Some(conn) = guard.take() else {
            return Ok(());
        };
        conn.close()
            .map_err(|(_, err)| AppError::Connection(err.to_string()))?;
        tracing::info!(path = %self.db_path.display(), "lead database closed");
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let guard = self.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| AppError::Connection("database is closed".to_string()))?;
        f(conn)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

fn parse_lead_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        mobile_number: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        status: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}
