//! Username generation
//!
//! A [`UsernameStrategy`] proposes candidate usernames; the
//! [`UsernameGenerator`] keeps asking it until a candidate is free in the
//! user store. The loop is unbounded: a strategy that can only produce
//! taken names never returns.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, instrument, trace};

use crate::error::Result;
use crate::storage::UserRepository;

/// Prefix used by the default strategy when none is configured
pub const DEFAULT_USERNAME_PREFIX: &str = "user";

/// Produces candidate usernames from a strategy-specific parameter
///
/// Candidates need not be unique; collisions are resolved by the generator.
pub trait UsernameStrategy<P: ?Sized>: fmt::Debug + Send + Sync {
    fn candidate(&self, parameter: &P) -> String;
}

/// Sequential usernames: `prefix0`, `prefix1`, ...
///
/// The counter advances once per candidate, whether or not that candidate
/// turns out to be taken.
#[derive(Debug)]
pub struct SequentialUsernames {
    prefix: String,
    next: AtomicU64,
}

impl SequentialUsernames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(first),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for SequentialUsernames {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_PREFIX)
    }
}

impl<P: ?Sized> UsernameStrategy<P> for SequentialUsernames {
    fn candidate(&self, _parameter: &P) -> String {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, id)
    }
}

/// Drives the active strategy until it yields an unused username
pub struct UsernameGenerator<P: ?Sized = ()> {
    strategy: RwLock<Arc<dyn UsernameStrategy<P>>>,
}

impl<P: ?Sized + 'static> UsernameGenerator<P> {
    pub fn new(strategy: impl UsernameStrategy<P> + 'static) -> Self {
        Self {
            strategy: RwLock::new(Arc::new(strategy)),
        }
    }

    /// Replace the active strategy. Usernames already handed out are unaffected.
    pub fn set_strategy(&self, strategy: impl UsernameStrategy<P> + 'static) {
        info!(?strategy, "Setting username strategy");
        let mut slot = self.strategy.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(strategy);
    }

    /// The currently active strategy
    pub fn strategy(&self) -> Arc<dyn UsernameStrategy<P>> {
        self.strategy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ask the active strategy for candidates until one is not taken in `users`
    #[instrument(skip(self, users, parameter))]
    pub fn generate<R>(&self, users: &R, parameter: &P) -> Result<String>
    where
        R: UserRepository + ?Sized,
    {
        let strategy = self.strategy();
        let mut collisions = 0u64;

        loop {
            let candidate = strategy.candidate(parameter);
            if users.find_user_by_username(&candidate)?.is_none() {
                debug!(username = %candidate, collisions, "Generated username");
                return Ok(candidate);
            }
            collisions += 1;
            trace!(username = %candidate, "Username taken, retrying");
        }
    }
}

impl<P: ?Sized + 'static> Default for UsernameGenerator<P> {
    fn default() -> Self {
        Self::new(SequentialUsernames::default())
    }
}

impl<P: ?Sized> fmt::Debug for UsernameGenerator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = self.strategy.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("UsernameGenerator")
            .field("strategy", &*strategy)
            .finish()
    }
}
