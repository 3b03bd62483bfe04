//! Account registration and login
//!
//! Credentials are checked with Argon2. A user with valid credentials is
//! only let in when one of their login periods covers today.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::models::{Session, User};
use crate::periods::LoginPeriodManager;
use crate::storage::Storage;
use crate::usernames::UsernameGenerator;

/// Registration and login against a user store
pub struct AuthService<'a, S, C = SystemClock> {
    store: &'a S,
    periods: LoginPeriodManager<'a, S, C>,
    session_hours: i64,
}

impl<'a, S: Storage> AuthService<'a, S> {
    pub fn new(store: &'a S, sessions: &SessionConfig) -> Self {
        Self::with_clock(store, SystemClock, sessions)
    }
}

impl<'a, S: Storage, C: Clock> AuthService<'a, S, C> {
    pub fn with_clock(store: &'a S, clock: C, sessions: &SessionConfig) -> Self {
        Self {
            store,
            periods: LoginPeriodManager::with_clock(store, clock),
            session_hours: sessions.duration_hours,
        }
    }

    /// Login period rules used by this service
    pub fn periods(&self) -> &LoginPeriodManager<'a, S, C> {
        &self.periods
    }

    /// Register a user with open-ended access starting today
    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;

        self.store.atomically(|store| {
            if store.find_user_by_username(username)?.is_some() {
                return Err(Error::UsernameTaken(username.to_string()));
            }

            let user = User::new(username.to_string(), password_hash);
            store.create_user(&user)?;
            self.periods.create_open_period(user.id)?;

            info!(user_id = %user.id, "User registered");
            Ok(user)
        })
    }

    /// Register a user whose username comes from `generator`
    #[instrument(skip(self, generator, parameter, password))]
    pub fn register_generated<P>(
        &self,
        generator: &UsernameGenerator<P>,
        parameter: &P,
        password: &str,
    ) -> Result<User>
    where
        P: ?Sized + 'static,
    {
        let username = generator.generate(self.store, parameter)?;
        self.register(&username, password)
    }

    /// Verify credentials and open a session
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let user = match self.store.find_user_by_username(username)? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown user");
                return Err(Error::Authentication("invalid username or password".into()));
            }
        };

        if !verify_password(&user.password_hash, password)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(Error::Authentication("invalid username or password".into()));
        }

        if !self.periods.allows_login(user.id)? {
            warn!(user_id = %user.id, "Login outside of any login period");
            return Err(Error::LoginNotAllowed(user.username));
        }

        let session = Session::new(user.id, self.session_hours).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "session duration of {} hours is out of range",
                self.session_hours
            ))
        })?;

        self.store.update_last_login(user.id)?;
        self.store.create_session(&session)?;

        info!(user_id = %user.id, session_id = %session.id, "User logged in");
        Ok(session)
    }

    /// End a session
    pub fn logout(&self, session_id: Uuid) -> Result<()> {
        self.store.delete_session(session_id)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
