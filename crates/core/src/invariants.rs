//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{compute_expiration, LoginPeriod};

/// Validate that a user's period set is internally consistent
pub fn assert_login_period_invariants(user_id: Uuid, periods: &[LoginPeriod]) {
    for period in periods {
        debug_assert!(
            period.user_id() == user_id,
            "Login period {} belongs to {} but was listed for {}",
            period.id(),
            period.user_id(),
            user_id
        );

        debug_assert!(
            period.end_date().map_or(true, |end| period.begin_date() <= end),
            "Login period {} begins {} after it ends {:?}",
            period.id(),
            period.begin_date(),
            period.end_date()
        );
    }

    // At most one open period per user
    let open_count = periods.iter().filter(|p| p.is_open()).count();
    debug_assert!(
        open_count <= 1,
        "User {} has {} open login periods, expected 0 or 1",
        user_id,
        open_count
    );
}

/// Validate that a stored expiration matches what the periods derive
pub fn assert_expiration_consistent(
    user_id: Uuid,
    expiration: Option<NaiveDate>,
    periods: &[LoginPeriod],
) {
    debug_assert!(
        periods.is_empty() || compute_expiration(expiration, periods) == expiration,
        "User {} has expiration {:?} inconsistent with their login periods",
        user_id,
        expiration
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_period_set() {
        let user_id = Uuid::new_v4();
        let periods = vec![
            LoginPeriod::new(user_id, date(2024, 1, 1), Some(date(2024, 1, 10))),
            LoginPeriod::new(user_id, date(2024, 2, 1), None),
        ];
        assert_login_period_invariants(user_id, &periods);
        assert_expiration_consistent(user_id, None, &periods);
    }

    #[test]
    fn test_empty_period_set_keeps_any_expiration() {
        assert_expiration_consistent(Uuid::new_v4(), Some(date(2024, 1, 1)), &[]);
    }

    #[test]
    #[should_panic(expected = "open login periods")]
    fn test_two_open_periods_panic() {
        let user_id = Uuid::new_v4();
        let periods = vec![
            LoginPeriod::new(user_id, date(2024, 1, 1), None),
            LoginPeriod::new(user_id, date(2024, 2, 1), None),
        ];
        assert_login_period_invariants(user_id, &periods);
    }

    #[test]
    #[should_panic(expected = "inconsistent")]
    fn test_stale_expiration_panics() {
        let user_id = Uuid::new_v4();
        let periods = vec![LoginPeriod::new(
            user_id,
            date(2024, 1, 1),
            Some(date(2024, 1, 10)),
        )];
        assert_expiration_consistent(user_id, Some(date(2025, 1, 1)), &periods);
    }
}
