//! SQLite storage layer for Gatehouse

mod login_periods;
mod migrations;
mod parse;
mod traits;
mod users;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{LoginPeriod, Session, User};
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use login_periods::LoginPeriodStore;
pub use traits::{LoginPeriodRepository, Storage, UserRepository};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    /// Get login period store
    pub fn login_periods(&self) -> LoginPeriodStore<'_> {
        LoginPeriodStore::new(&self.conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.users().find_by_username(username)
    }

    fn set_expiration(&self, user_id: Uuid, expiration: Option<NaiveDate>) -> Result<()> {
        self.users().set_expiration(user_id, expiration)
    }

    fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.users().update_last_login(user_id)
    }

    fn delete_user(&self, user_id: Uuid) -> Result<()> {
        self.users().delete(user_id)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.users().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.users().find_valid_session(session_id)
    }

    fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.users().delete_session(session_id)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.users().cleanup_expired_sessions()
    }
}

impl LoginPeriodRepository for Database {
    fn add_login_period(&self, period: &LoginPeriod) -> Result<()> {
        self.login_periods().insert(period)
    }

    fn find_login_period(&self, id: Uuid) -> Result<Option<LoginPeriod>> {
        self.login_periods().find_by_id(id)
    }

    fn list_login_periods(&self, user_id: Uuid) -> Result<Vec<LoginPeriod>> {
        self.login_periods().list_for_user(user_id)
    }

    fn find_open_login_period(&self, user_id: Uuid) -> Result<Option<LoginPeriod>> {
        self.login_periods().find_open(user_id)
    }

    fn update_login_period(&self, period: &LoginPeriod) -> Result<()> {
        self.login_periods().update_dates(period)
    }

    fn remove_login_period(&self, id: Uuid) -> Result<()> {
        self.login_periods().delete(id)
    }
}

impl Storage for Database {
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        // Already inside a transaction: join it
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_schema_version_after_open() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version(), 3);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gatehouse.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_user(&User::new("alice".into(), "hash".into()))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.find_user_by_username("alice").unwrap().is_some());
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.atomically(|db| {
            db.create_user(&User::new("ghost".into(), "hash".into()))?;
            Err(Error::NotFound("forced".into()))
        });

        assert!(result.is_err());
        assert!(db.find_user_by_username("ghost").unwrap().is_none());
    }

    #[test]
    fn test_atomically_commits_and_nests() {
        let db = Database::open_in_memory().unwrap();

        db.atomically(|db| {
            db.create_user(&User::new("outer".into(), "hash".into()))?;
            db.atomically(|db| db.create_user(&User::new("inner".into(), "hash".into())))
        })
        .unwrap();

        assert!(db.find_user_by_username("outer").unwrap().is_some());
        assert!(db.find_user_by_username("inner").unwrap().is_some());
    }
}
