/// SQLite-backed durable profile directory.
///
/// One table per collection (`user_profiles` in production, `test_profiles`
/// in development). Counter columns are read through the same tolerant
/// document decoder as every other backend, so a value stored with the
/// wrong type is treated as zero instead of failing the read.
///
/// Session closes use a single upsert that adds to the stored counters,
/// which removes the lost-update window of a get + put sequence.
use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use staytime_core::{StayError, UserProfile};

use crate::document::{
    decode_profile, FIELD_RANK, FIELD_TOTAL, FIELD_USER_ID, FIELD_USER_NAME, FIELD_WEEKLY,
};
use crate::store::{Directory, RecordFailure, Snapshot};

const COLUMNS: &str =
    "user_id, user_name, total_staying_time, weekly_staying_time, user_rank";

pub struct SqliteDirectory {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteDirectory {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite profile database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL")?;
        let directory = Self::init(conn, collection)?;
        info!(path = ?path.as_ref(), collection = %collection, "SqliteDirectory opened");
        Ok(directory)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn in_memory(collection: &str) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, collection)
    }

    fn init(conn: Connection, collection: &str) -> Result<Self> {
        if !is_valid_collection(collection) {
            bail!("invalid collection name {collection:?}: use letters, digits and '_'");
        }
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                 user_id             TEXT PRIMARY KEY,
                 user_name           TEXT NOT NULL DEFAULT '',
                 total_staying_time  INTEGER NOT NULL DEFAULT 0,
                 weekly_staying_time INTEGER NOT NULL DEFAULT 0,
                 user_rank           INTEGER NOT NULL DEFAULT 0
             );"
        ))
        .context("Failed to initialize profile schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: collection.to_string(),
        })
    }

    /// Run a raw statement against the underlying table (used to seed fixtures).
    pub async fn execute_raw(&self, sql: &str) -> Result<usize> {
        let conn = self.conn.lock().await;
        Ok(conn.execute(sql, [])?)
    }

    pub fn collection(&self) -> &str {
        &self.table
    }

    fn select_one(conn: &Connection, table: &str, user_id: &str) -> Result<Option<Value>, StayError> {
        let sql = format!("SELECT {COLUMNS} FROM {table} WHERE user_id = ?1");
        conn.query_row(&sql, params![user_id], row_to_document)
            .optional()
            .map_err(|e| StayError::directory("get", e))
    }
}

#[async_trait]
impl Directory for SqliteDirectory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StayError> {
        let conn = self.conn.lock().await;
        match Self::select_one(&conn, &self.table, user_id)? {
            Some(doc) => Ok(Some(decode_profile(user_id, &doc)?.profile)),
            None => Ok(None),
        }
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), StayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT OR REPLACE INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)", self.table),
            params![
                profile.user_id,
                profile.user_name,
                profile.total_staying_time,
                profile.weekly_staying_time,
                profile.user_rank,
            ],
        )
        .map_err(|e| StayError::directory("put", e))?;
        debug!(user = %profile.user_id, "Stored profile");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot, StayError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM {} ORDER BY user_id", self.table))
            .map_err(|e| StayError::directory("snapshot", e))?;
        let rows = stmt
            .query_map([], |row| {
                let record_id: String = row.get(0)?;
                Ok((record_id, row_to_document(row)))
            })
            .map_err(|e| StayError::directory("snapshot", e))?;

        let mut profiles = Vec::new();
        let mut failures = Vec::new();
        for (index, row) in rows.enumerate() {
            let decoded = match row {
                Ok((record_id, Ok(doc))) => {
                    decode_profile(&record_id, &doc).map_err(|error| (record_id, error))
                }
                Ok((record_id, Err(e))) => Err((record_id, StayError::directory("snapshot", e))),
                Err(e) => Err((format!("row {index}"), StayError::directory("snapshot", e))),
            };
            match decoded {
                Ok(decoded) => profiles.push(decoded.profile),
                Err((record_id, error)) => {
                    warn!(record = %record_id, error = %error, "Skipping unreadable record");
                    failures.push(RecordFailure { record_id, error });
                }
            }
        }
        Ok(Snapshot::new(profiles, failures))
    }

    async fn reset_weekly(&self, user_id: &str, announced: i64) -> Result<bool, StayError> {
        let t = &self.table;
        let sql = format!(
            "UPDATE {t} SET weekly_staying_time = MAX((CASE WHEN typeof(weekly_staying_time) = 'integer'
                 THEN weekly_staying_time ELSE 0 END) - ?2, 0)
             WHERE user_id = ?1"
        );
        let conn = self.conn.lock().await;
        let n = conn
            .execute(&sql, params![user_id, announced.max(0)])
            .map_err(|e| StayError::directory("reset", e))?;
        Ok(n > 0)
    }

    async fn increment(
        &self,
        user_id: &str,
        user_name: Option<&str>,
        seconds: i64,
    ) -> Result<Option<UserProfile>, StayError> {
        let t = &self.table;
        let sql = format!(
            "INSERT INTO {t} ({COLUMNS}) VALUES (?1, COALESCE(?2, ?1), ?3, ?3, 0)
             ON CONFLICT(user_id) DO UPDATE SET
                 user_name = COALESCE(?2, {t}.user_name),
                 total_staying_time = (CASE WHEN typeof({t}.total_staying_time) = 'integer'
                     THEN {t}.total_staying_time ELSE 0 END) + excluded.total_staying_time,
                 weekly_staying_time = (CASE WHEN typeof({t}.weekly_staying_time) = 'integer'
                     THEN {t}.weekly_staying_time ELSE 0 END) + excluded.weekly_staying_time,
                 user_rank = 0"
        );

        let conn = self.conn.lock().await;
        conn.execute(&sql, params![user_id, user_name, seconds.max(0)])
            .map_err(|e| StayError::directory("increment", e))?;

        let doc = Self::select_one(&conn, t, user_id)?.ok_or_else(|| {
            StayError::directory("increment", format!("record {user_id} vanished after upsert"))
        })?;
        Ok(Some(decode_profile(user_id, &doc)?.profile))
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Value> {
    let fields = [FIELD_USER_ID, FIELD_USER_NAME, FIELD_TOTAL, FIELD_WEEKLY, FIELD_RANK];
    let mut map = Map::new();
    for (index, field) in fields.iter().enumerate() {
        map.insert(field.to_string(), value_ref_to_json(row.get_ref(index)?));
    }
    Ok(Value::Object(map))
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::String("<blob>".to_string()),
    }
}

fn is_valid_collection(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
