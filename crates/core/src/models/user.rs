//! User model

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A local user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Last day the user may log in, derived from their login periods.
    /// `None` means access is open-ended.
    pub expiration: Option<NaiveDate>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
            last_login: None,
            expiration: None,
        }
    }
}

/// Active session for a logged-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session lasting `duration_hours` from now. `None` when the duration
    /// is not positive or the expiry does not fit in a timestamp.
    pub fn new(user_id: Uuid, duration_hours: i64) -> Option<Self> {
        if duration_hours <= 0 {
            return None;
        }

        let now = Utc::now();
        let expires_at = now.checked_add_signed(Duration::try_hours(duration_hours)?)?;
        Some(Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}
