//! User storage operations

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    format_date, parse_date_opt, parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt,
};
use crate::error::Result;
use crate::models::{Session, User};

const USER_COLUMNS: &str = "id, username, password_hash, created_at, last_login, expiration";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
        last_login: parse_datetime_opt(row.get::<_, Option<String>>(4)?)?,
        expiration: parse_date_opt(row.get::<_, Option<String>>(5)?)?,
    })
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn create(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at, last_login, expiration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.created_at.to_rfc3339(),
                user.last_login.map(|t| t.to_rfc3339()),
                user.expiration.map(format_date),
            ],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = self
            .conn
            .query_row(&sql, params![id.to_string()], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = self
            .conn
            .query_row(&sql, params![username], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Overwrite the derived expiration of a user
    #[instrument(skip(self))]
    pub fn set_expiration(&self, user_id: Uuid, expiration: Option<NaiveDate>) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET expiration = ?1 WHERE id = ?2",
            params![expiration.map(format_date), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Update last login time
    pub fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a user; their sessions and login periods cascade
    #[instrument(skip(self))]
    pub fn delete(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(())
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete all sessions for user
    pub fn delete_user_sessions(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::Duration;

    #[test]
    fn test_create_and_find_user() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        let user = User::new("alice".into(), "hash".into());
        users.create(&user).unwrap();

        let by_name = users.find_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.expiration, None);

        let by_id = users.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(users.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        users.create(&User::new("dup".into(), "a".into())).unwrap();
        let second = users.create(&User::new("dup".into(), "b".into()));
        assert!(second.is_err());
    }

    #[test]
    fn test_set_expiration_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        let user = User::new("carol".into(), "hash".into());
        users.create(&user).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        users.set_expiration(user.id, Some(day)).unwrap();
        let stored = users.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(stored.expiration, Some(day));

        users.set_expiration(user.id, None).unwrap();
        let stored = users.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(stored.expiration, None);
    }

    #[test]
    fn test_sessions() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        let user = User::new("dave".into(), "hash".into());
        users.create(&user).unwrap();

        let session = Session::new(user.id, 1).unwrap();
        users.create_session(&session).unwrap();
        assert!(users.find_valid_session(session.id).unwrap().is_some());

        let now = Utc::now();
        let expired = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            created_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };
        users.create_session(&expired).unwrap();
        assert!(users.find_valid_session(expired.id).unwrap().is_none());
        assert_eq!(users.cleanup_expired_sessions().unwrap(), 1);

        users.delete_user_sessions(user.id).unwrap();
        assert!(users.find_valid_session(session.id).unwrap().is_none());
    }
}
