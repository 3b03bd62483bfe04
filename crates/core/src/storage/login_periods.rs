//! Login period storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    format_date, parse_date, parse_date_opt, parse_datetime, parse_uuid, OptionalExt,
};
use crate::error::Result;
use crate::models::LoginPeriod;

const PERIOD_COLUMNS: &str = "id, user_id, begin_date, end_date, created_at";

fn period_from_row(row: &Row<'_>) -> rusqlite::Result<LoginPeriod> {
    Ok(LoginPeriod::from_parts(
        parse_uuid(&row.get::<_, String>(0)?)?,
        parse_uuid(&row.get::<_, String>(1)?)?,
        parse_date(&row.get::<_, String>(2)?)?,
        parse_date_opt(row.get::<_, Option<String>>(3)?)?,
        parse_datetime(&row.get::<_, String>(4)?)?,
    ))
}

pub struct LoginPeriodStore<'a> {
    conn: &'a Connection,
}

impl<'a> LoginPeriodStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new period
    #[instrument(skip(self, period), fields(period_id = %period.id(), user_id = %period.user_id()))]
    pub fn insert(&self, period: &LoginPeriod) -> Result<()> {
        self.conn.execute(
            "INSERT INTO login_periods (id, user_id, begin_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                period.id().to_string(),
                period.user_id().to_string(),
                format_date(period.begin_date()),
                period.end_date().map(format_date),
                period.created_at().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a period by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<LoginPeriod>> {
        let sql = format!("SELECT {PERIOD_COLUMNS} FROM login_periods WHERE id = ?1");
        let period = self
            .conn
            .query_row(&sql, params![id.to_string()], period_from_row)
            .optional()?;
        Ok(period)
    }

    /// All periods of a user, earliest first
    #[instrument(skip(self))]
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<LoginPeriod>> {
        let sql = format!(
            "SELECT {PERIOD_COLUMNS} FROM login_periods WHERE user_id = ?1
             ORDER BY begin_date ASC, created_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let periods = stmt
            .query_map(params![user_id.to_string()], period_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(periods)
    }

    /// The user's period without an end date, if any
    #[instrument(skip(self))]
    pub fn find_open(&self, user_id: Uuid) -> Result<Option<LoginPeriod>> {
        let sql = format!(
            "SELECT {PERIOD_COLUMNS} FROM login_periods WHERE user_id = ?1 AND end_date IS NULL"
        );
        let period = self
            .conn
            .query_row(&sql, params![user_id.to_string()], period_from_row)
            .optional()?;
        Ok(period)
    }

    /// Persist the current dates of `period`
    #[instrument(skip(self, period), fields(period_id = %period.id()))]
    pub fn update_dates(&self, period: &LoginPeriod) -> Result<()> {
        self.conn.execute(
            "UPDATE login_periods SET begin_date = ?1, end_date = ?2 WHERE id = ?3",
            params![
                format_date(period.begin_date()),
                period.end_date().map(format_date),
                period.id().to_string(),
            ],
        )?;
        Ok(())
    }

    /// Remove a period
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM login_periods WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }
}
