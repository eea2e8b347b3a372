use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Result, WasteSorterError};
use crate::models::{
    Category, CategoryCounts, ClassificationRecord, ClassificationSource, DbUser, NewClassification, NewUser,
};
use crate::repository::RecordStore;
use crate::schema::{classifications, users, MIGRATIONS};

/// How long a connection waits on another process's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite` record store.
///
/// A fresh connection is opened for every operation and closed when it goes
/// out of scope; nothing is held across calls.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) the database file and bring its schema up to date
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let database = Self { path };
        let mut conn = database.get_connection()?;
        Self::run_migrations(&mut conn)?;

        info!(path = %database.path.display(), "Record store ready");
        Ok(database)
    }

    /// Location of the database file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply any migrations newer than the stored `user_version`.
    ///
    /// The write lock is taken before `user_version` is read, so processes
    /// opening the same file at once apply each migration exactly once.
    fn run_migrations(conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let applied: i64 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let applied = usize::try_from(applied).unwrap_or(0);

        for (version, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
            debug!(migration = name, "Applying migration");
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version + 1)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Open a connection with foreign key enforcement turned on
    pub fn get_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Map a database row to a `DbUser`
    fn map_db_user(row: &Row) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(users::ID)?,
            external_id: row.get(users::EXTERNAL_ID)?,
            username: row.get(users::USERNAME)?,
            email: row.get(users::EMAIL)?,
            created_at: row.get(users::CREATED_AT)?,
        })
    }

    /// Map a database row to a `ClassificationRecord`
    fn map_classification(row: &Row) -> Result<ClassificationRecord> {
        let category: String = row.get(classifications::CATEGORY)?;
        let source: String = row.get(classifications::SOURCE)?;

        Ok(ClassificationRecord {
            id: row.get(classifications::ID)?,
            user_id: row.get(classifications::USER_ID)?,
            image_path: row.get(classifications::IMAGE_PATH)?,
            category: category.parse()?,
            confidence: row.get(classifications::CONFIDENCE)?,
            source: source.parse()?,
            created_at: row.get(classifications::CREATED_AT)?,
        })
    }

    fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
        let exists = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)", users::TABLE, users::ID),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn get_classification(conn: &Connection, id: i64) -> Result<ClassificationRecord> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?",
            classifications::TABLE,
            classifications::ID
        ))?;
        let mut rows = stmt.query(params![id])?;
        let row = rows
            .next()?
            .ok_or_else(|| WasteSorterError::Other(format!("classification {id} vanished after insert")))?;
        Self::map_classification(row)
    }
}

impl RecordStore for Database {
    fn upsert_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.get_connection()?;

        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                users::TABLE,
                users::EXTERNAL_ID,
                users::USERNAME,
                users::EMAIL
            ),
            params![user.external_id, user.name, user.email],
        )?;

        let id: i64 = conn.query_row(
            &format!("SELECT {} FROM {} WHERE {} = ?", users::ID, users::TABLE, users::EXTERNAL_ID),
            params![user.external_id],
            |row| row.get(0),
        )?;

        if inserted > 0 {
            info!(user_id = id, external_id = %user.external_id, "Created user");
        }

        Ok(id)
    }

    fn find_user(&self, external_id: &str) -> Result<Option<DbUser>> {
        let conn = self.get_connection()?;

        let user = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", users::TABLE, users::EXTERNAL_ID),
                params![external_id],
                Self::map_db_user,
            )
            .optional()?;

        Ok(user)
    }

    fn insert_classification(&self, new: &NewClassification) -> Result<ClassificationRecord> {
        if !(0.0..=100.0).contains(&new.confidence) {
            return Err(WasteSorterError::InvalidRecord(format!(
                "confidence {} outside [0, 100]",
                new.confidence
            )));
        }

        let conn = self.get_connection()?;

        if !Self::user_exists(&conn, new.user_id)? {
            return Err(WasteSorterError::UnknownUser(new.user_id));
        }

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)",
                classifications::TABLE,
                classifications::USER_ID,
                classifications::IMAGE_PATH,
                classifications::CATEGORY,
                classifications::CONFIDENCE,
                classifications::SOURCE
            ),
            params![
                new.user_id,
                new.image_path,
                new.category.as_str(),
                new.confidence,
                new.source.as_str()
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_classification(&conn, id)
    }

    fn aggregate_by_category(&self, user_id: i64) -> Result<CategoryCounts> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {category}, COUNT(*) FROM {table} WHERE {user} = ? GROUP BY {category}",
            category = classifications::CATEGORY,
            table = classifications::TABLE,
            user = classifications::USER_ID
        ))?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = CategoryCounts::new();
        for row in rows {
            let (label, count) = row?;
            let category: Category = label.parse()?;
            counts.add(category, u64::try_from(count).unwrap_or(0));
        }

        Ok(counts)
    }

    fn recent_classifications(&self, user_id: i64, limit: usize) -> Result<Vec<ClassificationRecord>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC LIMIT ?",
            classifications::TABLE,
            classifications::USER_ID,
            classifications::ID
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = stmt.query(params![user_id, limit])?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(Self::map_classification(row)?);
        }

        Ok(results)
    }
}

/// Row counts across the store, logged when the service starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of known users
    pub users: u64,
    /// Number of classification records
    pub classifications: u64,
    /// Records produced by the degraded-mode stub
    pub stub_classifications: u64,
}

impl Database {
    /// Row counts across both tables
    pub fn store_stats(&self) -> Result<StoreStats> {
        let conn = self.get_connection()?;

        let count = |sql: String| -> Result<u64> {
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        };

        Ok(StoreStats {
            users: count(format!("SELECT COUNT(*) FROM {}", users::TABLE))?,
            classifications: count(format!("SELECT COUNT(*) FROM {}", classifications::TABLE))?,
            stub_classifications: count(format!(
                "SELECT COUNT(*) FROM {} WHERE {} = '{}'",
                classifications::TABLE,
                classifications::SOURCE,
                ClassificationSource::Stub.as_str()
            ))?,
        })
    }
}
