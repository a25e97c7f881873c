use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior, params,
};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::id;
use crate::types::*;

/// How many times an insert is retried when a freshly minted id collides.
const ID_COLLISION_RETRIES: usize = 5;

const FILE_COLUMNS_NO_CONTENT: &str = "id, created_at, updated_at, size, private, type, user_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that timestamps sort lexically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Runs an insert that mints its own id, retrying when the id collides with
/// an existing row.
fn insert_with_retry<T>(mut insert: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match insert() {
            Err(Error::Database(e)) if is_constraint_violation(&e) && attempt < ID_COLLISION_RETRIES => {
                tracing::warn!("id collision on insert, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn file_without_content(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        created_at: parse_datetime(&row.get::<_, String>(1)?),
        updated_at: parse_datetime(&row.get::<_, String>(2)?),
        size: row.get::<_, i64>(3)? as u64,
        raw_content: Vec::new(),
        private: row.get(4)?,
        file_type: row.get(5)?,
        user_id: row.get(6)?,
    })
}

fn revision_from_row(row: &Row<'_>, with_diff: bool) -> rusqlite::Result<Revision> {
    Ok(Revision {
        id: row.get(0)?,
        sequence: row.get(1)?,
        file_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        size: row.get::<_, i64>(4)? as u64,
        file_type: row.get(5)?,
        raw_diff: if with_diff { row.get(6)? } else { Vec::new() },
    })
}

fn find_user_in(tx: &Transaction<'_>, id: &str) -> Result<Option<User>> {
    tx.query_row(
        "SELECT id, created_at, updated_at FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                created_at: parse_datetime(&row.get::<_, String>(1)?),
                updated_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        },
    )
    .optional()
    .map_err(Error::from)
}

impl Store for SqliteStore {
    fn migrate(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // File operations

    fn create_file(&self, file: &mut File, max_files_per_user: u64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM files WHERE user_id = ?1",
            params![file.user_id],
            |row| row.get(0),
        )?;

        if max_files_per_user > 0 && count as u64 >= max_files_per_user {
            return Err(Error::FileLimit);
        }

        let now = Utc::now();
        file.created_at = now;
        file.updated_at = now;

        insert_with_retry(|| {
            file.id = id::generate()?;
            tx.execute(
                "INSERT INTO files (id, created_at, updated_at, size, content, private, type, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    file.id,
                    format_datetime(&file.created_at),
                    format_datetime(&file.updated_at),
                    file.size as i64,
                    file.raw_content,
                    file.private,
                    file.file_type,
                    file.user_id,
                ],
            )?;
            Ok(())
        })?;

        tx.commit()?;
        Ok(())
    }

    fn find_file(&self, id: &str) -> Result<Option<File>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, created_at, updated_at, size, content, private, type, user_id
             FROM files WHERE id = ?1",
            params![id],
            |row| {
                Ok(File {
                    id: row.get(0)?,
                    created_at: parse_datetime(&row.get::<_, String>(1)?),
                    updated_at: parse_datetime(&row.get::<_, String>(2)?),
                    size: row.get::<_, i64>(3)? as u64,
                    raw_content: row.get(4)?,
                    private: row.get(5)?,
                    file_type: row.get(6)?,
                    user_id: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_file(&self, file: &mut File) -> Result<()> {
        file.updated_at = Utc::now();

        let rows = self.conn().execute(
            "UPDATE files SET updated_at = ?1, size = ?2, content = ?3, private = ?4, type = ?5
             WHERE id = ?6",
            params![
                format_datetime(&file.updated_at),
                file.size as i64,
                file.raw_content,
                file.private,
                file.file_type,
                file.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_file(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn find_files_by_user(&self, user_id: &str) -> Result<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS_NO_CONTENT} FROM files
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], file_without_content)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn latest_public_files(&self, page: u64, per_page: u64) -> Result<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS_NO_CONTENT} FROM files
             WHERE private = 0 ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;

        let offset = page.saturating_mul(per_page);
        let rows = stmt.query_map(
            params![per_page as i64, offset as i64],
            file_without_content,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Identity operations

    fn find_public_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<PublicKey>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, created_at, updated_at, fingerprint, type, user_id
             FROM public_keys WHERE fingerprint = ?1",
            params![fingerprint],
            |row| {
                Ok(PublicKey {
                    id: row.get(0)?,
                    created_at: parse_datetime(&row.get::<_, String>(1)?),
                    updated_at: parse_datetime(&row.get::<_, String>(2)?),
                    fingerprint: row.get(3)?,
                    key_type: row.get(4)?,
                    user_id: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn create_user_with_public_key(&self, public_key: &mut PublicKey) -> Result<User> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT user_id FROM public_keys WHERE fingerprint = ?1",
                params![public_key.fingerprint],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(user_id) = existing {
            let user = find_user_in(&tx, &user_id)?.ok_or(Error::NotFound)?;
            public_key.user_id = user.id.clone();
            return Ok(user);
        }

        let now = Utc::now();
        let user = insert_with_retry(|| {
            let user = User {
                id: id::generate()?,
                created_at: now,
                updated_at: now,
            };
            tx.execute(
                "INSERT INTO users (id, created_at, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    user.id,
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )?;
            Ok(user)
        })?;

        insert_with_retry(|| {
            public_key.id = id::generate()?;
            public_key.created_at = now;
            public_key.updated_at = now;
            public_key.user_id = user.id.clone();
            tx.execute(
                "INSERT INTO public_keys (id, created_at, updated_at, fingerprint, type, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    public_key.id,
                    format_datetime(&public_key.created_at),
                    format_datetime(&public_key.updated_at),
                    public_key.fingerprint,
                    public_key.key_type,
                    public_key.user_id,
                ],
            )?;
            Ok(())
        })?;

        tx.commit()?;
        Ok(user)
    }

    fn find_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    created_at: parse_datetime(&row.get::<_, String>(1)?),
                    updated_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Revision operations

    fn create_revision(&self, revision: &mut Revision) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: Option<i64> = tx.query_row(
            "SELECT MAX(sequence) FROM revisions WHERE file_id = ?1",
            params![revision.file_id],
            |row| row.get(0),
        )?;

        revision.sequence = last.unwrap_or(0) + 1;
        revision.created_at = Utc::now();

        tx.execute(
            "INSERT INTO revisions (sequence, file_id, created_at, diff, size, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                revision.sequence,
                revision.file_id,
                format_datetime(&revision.created_at),
                revision.raw_diff,
                revision.size as i64,
                revision.file_type,
            ],
        )?;
        revision.id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(())
    }

    fn find_revisions_by_file_id(&self, file_id: &str) -> Result<Vec<Revision>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, sequence, file_id, created_at, size, type
             FROM revisions WHERE file_id = ?1 ORDER BY sequence DESC",
        )?;

        let rows = stmt.query_map(params![file_id], |row| revision_from_row(row, false))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn find_revision(&self, file_id: &str, id: i64) -> Result<Option<Revision>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, sequence, file_id, created_at, size, type, diff
             FROM revisions WHERE file_id = ?1 AND id = ?2",
            params![file_id, id],
            |row| revision_from_row(row, true),
        )
        .optional()
        .map_err(Error::from)
    }

    fn count_revisions_by_file_id(&self, file_id: &str) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM revisions WHERE file_id = ?1",
            params![file_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn close(&self) -> Result<()> {
        self.conn()
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
