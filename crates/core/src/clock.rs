//! Calendar clock
//!
//! Login period rules compare whole dates against "today". The clock is
//! injected so the rules can be exercised against any date.

use chrono::{Local, NaiveDate};

/// Source of the current calendar date
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
