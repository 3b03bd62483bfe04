//! Gatehouse Core Library
//!
//! Login periods that decide when a user account may authenticate, and
//! pluggable generation of unique usernames, backed by SQLite storage.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod periods;
pub mod storage;
pub mod usernames;

pub use auth::AuthService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GatehouseConfig;
pub use error::{Error, Result};
pub use models::*;
pub use periods::LoginPeriodManager;
pub use storage::{Database, LoginPeriodRepository, Storage, UserRepository};
pub use usernames::{SequentialUsernames, UsernameGenerator, UsernameStrategy};
