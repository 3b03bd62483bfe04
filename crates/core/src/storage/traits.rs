//! Storage repository traits
//!
//! These traits define the storage interface the login period and username
//! logic call into, allowing for different implementations (SQLite, mock).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{LoginPeriod, Session, User};

/// User repository operations
pub trait UserRepository {
    /// Create a new user
    fn create_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find user by username
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Overwrite a user's derived expiration
    fn set_expiration(&self, user_id: Uuid, expiration: Option<NaiveDate>) -> Result<()>;

    /// Update user's last login time
    fn update_last_login(&self, user_id: Uuid) -> Result<()>;

    /// Delete a user along with their sessions and login periods
    fn delete_user(&self, user_id: Uuid) -> Result<()>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: Uuid) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Login period repository operations
pub trait LoginPeriodRepository {
    /// Attach a new period to its user
    fn add_login_period(&self, period: &LoginPeriod) -> Result<()>;

    /// Find a period by ID
    fn find_login_period(&self, id: Uuid) -> Result<Option<LoginPeriod>>;

    /// All periods of a user, earliest begin date first
    fn list_login_periods(&self, user_id: Uuid) -> Result<Vec<LoginPeriod>>;

    /// The user's open period, if any
    fn find_open_login_period(&self, user_id: Uuid) -> Result<Option<LoginPeriod>>;

    /// Persist new dates for an existing period
    fn update_login_period(&self, period: &LoginPeriod) -> Result<()>;

    /// Detach and remove a period
    fn remove_login_period(&self, id: Uuid) -> Result<()>;
}

/// Combined storage interface
///
/// Mutations performed inside [`Storage::atomically`] are observed together
/// or not at all.
pub trait Storage: UserRepository + LoginPeriodRepository {
    /// Run `f` in a single transaction, committing only if it succeeds
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>;
}
