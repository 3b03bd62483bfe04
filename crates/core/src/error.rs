//! Error types for Gatehouse Core

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    #[error("Invalid login period: begin date {begin} is after end date {end}")]
    Interval { begin: NaiveDate, end: NaiveDate },

    #[error("Login period {0} is closed and cannot be edited")]
    ClosedPeriod(Uuid),

    #[error("Login period {0} has already started; its begin date cannot change")]
    OpenPeriodStartDate(Uuid),

    #[error("Login period {0} has already started and cannot be deleted")]
    StartedPeriod(Uuid),

    #[error("User already has an open login period ({0})")]
    OpenPeriodExists(Uuid),

    #[error("Login period field '{0}' can only be changed through edit")]
    ImmutableField(&'static str),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Login not allowed: {0} has no active login period")]
    LoginNotAllowed(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable key, used by callers to look up localized messages
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation.required.field",
            Error::Interval { .. } => "invalid.login.period.interval",
            Error::ClosedPeriod(_) => "cannot.edit.closed.login",
            Error::OpenPeriodStartDate(_) => "cannot.edit.open.period.start.date",
            Error::StartedPeriod(_) => "cannot.delete.started.login.period",
            Error::ImmutableField(_) => "cannot.overwrite.period.dates",
            Error::OpenPeriodExists(_) => "user.already.has.open.period",
            Error::UsernameTaken(_) => "username.already.taken",
            Error::LoginNotAllowed(_) => "login.period.not.active",
            Error::Authentication(_) => "authentication.failed",
            Error::PasswordHash(_) => "password.hash.error",
            Error::NotFound(_) => "not.found",
            Error::Database(_) => "database.error",
            Error::Config(_) => "config.error",
            Error::InvalidConfig(_) => "config.invalid",
            Error::Io(_) => "io.error",
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_kinds_are_stable() {
        let id = Uuid::nil();
        assert_eq!(Error::ClosedPeriod(id).kind(), "cannot.edit.closed.login");
        assert_eq!(
            Error::OpenPeriodStartDate(id).kind(),
            "cannot.edit.open.period.start.date"
        );
        assert_eq!(
            Error::StartedPeriod(id).kind(),
            "cannot.delete.started.login.period"
        );
        assert_eq!(
            Error::ImmutableField("end_date").kind(),
            "cannot.overwrite.period.dates"
        );
    }

    #[test]
    fn test_interval_message_names_both_dates() {
        let err = Error::Interval {
            begin: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-03-01"));
        assert!(msg.contains("2024-01-10"));
    }
}
