//! Login period model
//!
//! A login period is a span of calendar days during which its user may
//! log in. A period without an end date is "open" and grants access from
//! its begin date onward. Each user has at most one open period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A span of days during which a user may log in
///
/// Dates are read-only outside the crate; they change only through
/// [`LoginPeriodManager::edit`](crate::LoginPeriodManager::edit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPeriod {
    id: Uuid,
    user_id: Uuid,
    begin_date: NaiveDate,
    end_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl LoginPeriod {
    pub(crate) fn new(user_id: Uuid, begin_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            begin_date,
            end_date,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a period from stored values
    pub(crate) fn from_parts(
        id: Uuid,
        user_id: Uuid,
        begin_date: NaiveDate,
        end_date: Option<NaiveDate>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            begin_date,
            end_date,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn begin_date(&self) -> NaiveDate {
        self.begin_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Always fails: begin dates change only through `LoginPeriodManager::edit`
    pub fn set_begin_date(&mut self, _begin_date: NaiveDate) -> Result<()> {
        Err(Error::ImmutableField("begin_date"))
    }

    /// Always fails: end dates change only through `LoginPeriodManager::edit`
    pub fn set_end_date(&mut self, _end_date: Option<NaiveDate>) -> Result<()> {
        Err(Error::ImmutableField("end_date"))
    }

    pub(crate) fn overwrite_dates(&mut self, begin_date: NaiveDate, end_date: Option<NaiveDate>) {
        self.begin_date = begin_date;
        self.end_date = end_date;
    }

    /// No end date
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// End date present and strictly before `today`
    pub fn is_closed(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end < today)
    }

    /// Begin date is `today` or earlier
    pub fn is_started(&self, today: NaiveDate) -> bool {
        self.begin_date <= today
    }

    /// Whether `date` falls inside this period (both ends inclusive)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.is_started(date) && !self.is_closed(date)
    }

    /// Exact match on both dates; two absent end dates are equal
    pub fn matches(&self, begin_date: NaiveDate, end_date: Option<NaiveDate>) -> bool {
        self.begin_date == begin_date && self.end_date == end_date
    }
}

/// Reject intervals where the begin date falls after the end date
pub fn check_interval(begin_date: NaiveDate, end_date: Option<NaiveDate>) -> Result<()> {
    match end_date {
        Some(end) if begin_date > end => Err(Error::Interval {
            begin: begin_date,
            end,
        }),
        _ => Ok(()),
    }
}

/// Derive a user's expiration from their login periods
///
/// Any open period makes access open-ended (`None`). Otherwise the latest
/// end date wins. With no periods at all the current value is kept.
pub fn compute_expiration(
    current: Option<NaiveDate>,
    periods: &[LoginPeriod],
) -> Option<NaiveDate> {
    if periods.is_empty() {
        return current;
    }

    let mut latest = None;
    for period in periods {
        match period.end_date {
            None => return None,
            Some(end) => {
                if latest.map_or(true, |l| l < end) {
                    latest = Some(end);
                }
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(begin: NaiveDate, end: Option<NaiveDate>) -> LoginPeriod {
        LoginPeriod::new(Uuid::new_v4(), begin, end)
    }

    #[test]
    fn test_closed_and_started_are_date_only() {
        let today = date(2024, 2, 15);

        let ends_today = period(date(2024, 1, 1), Some(today));
        assert!(!ends_today.is_closed(today));
        assert!(ends_today.is_closed(today.succ_opt().unwrap()));

        let starts_today = period(today, None);
        assert!(starts_today.is_started(today));
        assert!(!starts_today.is_started(today.pred_opt().unwrap()));
    }

    #[test]
    fn test_open_period_is_never_closed() {
        let p = period(date(2000, 1, 1), None);
        assert!(p.is_open());
        assert!(!p.is_closed(date(2999, 12, 31)));
    }

    #[test]
    fn test_active_on_bounds_inclusive() {
        let p = period(date(2024, 1, 1), Some(date(2024, 1, 31)));
        assert!(p.is_active_on(date(2024, 1, 1)));
        assert!(p.is_active_on(date(2024, 1, 31)));
        assert!(!p.is_active_on(date(2023, 12, 31)));
        assert!(!p.is_active_on(date(2024, 2, 1)));
    }

    #[test]
    fn test_matches_treats_absent_end_as_equal() {
        let p = period(date(2024, 1, 1), None);
        assert!(p.matches(date(2024, 1, 1), None));
        assert!(!p.matches(date(2024, 1, 1), Some(date(2024, 1, 2))));
        assert!(!p.matches(date(2024, 1, 2), None));
    }

    #[test]
    fn test_direct_date_overwrite_rejected() {
        let mut p = period(date(2024, 1, 1), Some(date(2024, 2, 1)));

        let err = p.set_begin_date(date(2024, 1, 5)).unwrap_err();
        assert!(matches!(err, Error::ImmutableField("begin_date")));

        let err = p.set_end_date(None).unwrap_err();
        assert!(matches!(err, Error::ImmutableField("end_date")));

        assert!(p.matches(date(2024, 1, 1), Some(date(2024, 2, 1))));
    }

    #[test]
    fn test_check_interval() {
        assert!(check_interval(date(2024, 1, 1), Some(date(2024, 1, 1))).is_ok());
        assert!(check_interval(date(2024, 1, 1), None).is_ok());
        assert!(matches!(
            check_interval(date(2024, 1, 2), Some(date(2024, 1, 1))),
            Err(Error::Interval { .. })
        ));
    }

    #[test]
    fn test_expiration_is_latest_end_date() {
        let periods = vec![
            period(date(2024, 1, 1), Some(date(2024, 1, 10))),
            period(date(2024, 2, 1), Some(date(2024, 3, 1))),
        ];
        assert_eq!(compute_expiration(None, &periods), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_open_period_dominates_expiration() {
        let periods = vec![
            period(date(2024, 1, 1), Some(date(2030, 1, 10))),
            period(date(2024, 2, 1), None),
        ];
        assert_eq!(compute_expiration(Some(date(2030, 1, 10)), &periods), None);
    }

    #[test]
    fn test_expiration_kept_without_periods() {
        let current = Some(date(2024, 5, 5));
        assert_eq!(compute_expiration(current, &[]), current);
        assert_eq!(compute_expiration(None, &[]), None);
    }
}
