//! Login period management
//!
//! Every mutation of a user's login periods runs in one storage transaction
//! together with the recomputation of the user's expiration, so the two are
//! never observed apart.

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::invariants::{assert_expiration_consistent, assert_login_period_invariants};
use crate::models::{check_interval, compute_expiration, LoginPeriod, User};
use crate::storage::Storage;

/// Owns the rules for creating, editing and deleting login periods
pub struct LoginPeriodManager<'a, S, C = SystemClock> {
    store: &'a S,
    clock: C,
}

impl<'a, S: Storage> LoginPeriodManager<'a, S> {
    /// Manager evaluating "today" from the wall clock
    pub fn new(store: &'a S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<'a, S: Storage, C: Clock> LoginPeriodManager<'a, S, C> {
    pub fn with_clock(store: &'a S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Create a period with exact dates. Both dates are required.
    #[instrument(skip(self))]
    pub fn create(
        &self,
        user_id: Uuid,
        begin_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<LoginPeriod> {
        let begin_date = begin_date.ok_or(Error::Validation("begin_date"))?;
        let end_date = end_date.ok_or(Error::Validation("end_date"))?;
        check_interval(begin_date, Some(end_date))?;

        self.store.atomically(|store| {
            require_user(store, user_id)?;

            let period = LoginPeriod::new(user_id, begin_date, Some(end_date));
            store.add_login_period(&period)?;
            recompute(store, user_id)?;

            info!(period_id = %period.id(), %begin_date, %end_date, "Login period created");
            Ok(period)
        })
    }

    /// Return the user's open period, creating one that begins today if needed
    #[instrument(skip(self))]
    pub fn create_open_period(&self, user_id: Uuid) -> Result<LoginPeriod> {
        let today = self.today();

        self.store.atomically(|store| {
            require_user(store, user_id)?;

            if let Some(existing) = store.find_open_login_period(user_id)? {
                debug!(period_id = %existing.id(), "Reusing open login period");
                return Ok(existing);
            }

            let period = LoginPeriod::new(user_id, today, None);
            store.add_login_period(&period)?;
            // An open period always dominates, no need to scan
            store.set_expiration(user_id, None)?;

            info!(period_id = %period.id(), begin_date = %today, "Open login period created");
            Ok(period)
        })
    }

    /// End the user's open period today. Returns the closed period, or
    /// `None` when the user had no open period.
    #[instrument(skip(self))]
    pub fn close_open_period(&self, user_id: Uuid) -> Result<Option<LoginPeriod>> {
        let today = self.today();

        self.store.atomically(|store| {
            let Some(mut period) = store.find_open_login_period(user_id)? else {
                debug!("No open login period to close");
                return Ok(None);
            };

            let begin_date = period.begin_date();
            self.edit_in(store, &mut period, begin_date, Some(today))?;
            Ok(Some(period))
        })
    }

    /// Change the bounds of an existing period
    ///
    /// Closed periods cannot be edited, and the begin date of a period that
    /// has already started is frozen. On success `period` is updated in place.
    #[instrument(skip(self, period), fields(period_id = %period.id()))]
    pub fn edit(
        &self,
        period: &mut LoginPeriod,
        begin_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<()> {
        self.store
            .atomically(|store| self.edit_in(store, period, begin_date, end_date))
    }

    fn edit_in(
        &self,
        store: &S,
        period: &mut LoginPeriod,
        begin_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<()> {
        let today = self.today();

        // Rules apply to the stored state, not to a possibly stale copy
        let mut current = store
            .find_login_period(period.id())?
            .ok_or_else(|| Error::NotFound(format!("login period {}", period.id())))?;

        if current.is_closed(today) {
            return Err(Error::ClosedPeriod(current.id()));
        }
        if current.begin_date() != begin_date && current.is_started(today) {
            return Err(Error::OpenPeriodStartDate(current.id()));
        }
        check_interval(begin_date, end_date)?;

        if end_date.is_none() && !current.is_open() {
            if let Some(open) = store.find_open_login_period(current.user_id())? {
                return Err(Error::OpenPeriodExists(open.id()));
            }
        }

        current.overwrite_dates(begin_date, end_date);
        store.update_login_period(&current)?;
        recompute(store, current.user_id())?;

        info!(period_id = %current.id(), %begin_date, ?end_date, "Login period edited");
        *period = current;
        Ok(())
    }

    /// Delete a period that has not started yet
    #[instrument(skip(self, period), fields(period_id = %period.id()))]
    pub fn delete(&self, period: LoginPeriod) -> Result<()> {
        let today = self.today();

        self.store.atomically(|store| {
            let current = store
                .find_login_period(period.id())?
                .ok_or_else(|| Error::NotFound(format!("login period {}", period.id())))?;

            if current.is_started(today) {
                return Err(Error::StartedPeriod(current.id()));
            }

            store.remove_login_period(current.id())?;
            recompute(store, current.user_id())?;

            info!(period_id = %current.id(), "Login period deleted");
            Ok(())
        })
    }

    /// Recompute and store the user's expiration from their periods
    #[instrument(skip(self))]
    pub fn recompute_expiration(&self, user_id: Uuid) -> Result<Option<NaiveDate>> {
        self.store.atomically(|store| recompute(store, user_id))
    }

    /// End date present and already passed
    pub fn is_closed(&self, period: &LoginPeriod) -> bool {
        period.is_closed(self.today())
    }

    /// Begin date is today or earlier
    pub fn is_started(&self, period: &LoginPeriod) -> bool {
        period.is_started(self.today())
    }

    /// All periods of the user, earliest first
    pub fn periods(&self, user_id: Uuid) -> Result<Vec<LoginPeriod>> {
        self.store.list_login_periods(user_id)
    }

    /// The user's open period, if any
    pub fn open_period(&self, user_id: Uuid) -> Result<Option<LoginPeriod>> {
        self.store.find_open_login_period(user_id)
    }

    /// Whether some period of the user covers today
    pub fn allows_login(&self, user_id: Uuid) -> Result<bool> {
        let today = self.today();
        let periods = self.store.list_login_periods(user_id)?;
        Ok(periods.iter().any(|p| p.is_active_on(today)))
    }
}

fn require_user<S: Storage>(store: &S, user_id: Uuid) -> Result<User> {
    store
        .find_user_by_id(user_id)?
        .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
}

// A user left without periods keeps their previous expiration
fn recompute<S: Storage>(store: &S, user_id: Uuid) -> Result<Option<NaiveDate>> {
    let user = require_user(store, user_id)?;
    let periods = store.list_login_periods(user_id)?;
    assert_login_period_invariants(user_id, &periods);

    let expiration = compute_expiration(user.expiration, &periods);
    if expiration != user.expiration {
        store.set_expiration(user_id, expiration)?;
        debug!(%user_id, from = ?user.expiration, to = ?expiration, "User expiration recomputed");
    }

    assert_expiration_consistent(user_id, expiration, &periods);
    Ok(expiration)
}
