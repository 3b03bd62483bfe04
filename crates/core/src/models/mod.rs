//! Data models for Gatehouse

mod login_period;
mod user;

pub use login_period::*;
pub use user::*;
