//! Cron expression parsing and evaluation.

use crate::error::{CronError, CronResult};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;

/// Parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronExpression {
    schedule: Schedule,
    expression: String,
}

impl CronExpression {
    /// Parse a cron expression.
    ///
    /// Expressions have 6 fields, seconds first:
    /// - Second (0-59)
    /// - Minute (0-59)
    /// - Hour (0-23)
    /// - Day of month (1-31)
    /// - Month (1-12)
    /// - Day of week (SUN-SAT)
    ///
    /// # Examples
    ///
    /// ```
    /// use skybell_cron::CronExpression;
    ///
    /// // Top of every hour
    /// let hourly = CronExpression::parse("0 0 * * * *").unwrap();
    ///
    /// // Every day at noon
    /// let daily = CronExpression::parse("0 0 12 * * *").unwrap();
    ///
    /// assert!(CronExpression::parse("every tuesday").is_err());
    /// ```
    pub fn parse(expression: &str) -> CronResult<Self> {
        let expression = expression.trim();
        let schedule = Schedule::from_str(expression)
            .map_err(|e| CronError::InvalidExpression(format!("{}: {}", expression, e)))?;

        Ok(Self {
            schedule,
            expression: expression.to_string(),
        })
    }

    /// Get the next execution time strictly after the given time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Get the next execution time from now.
    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.next_after(Utc::now())
    }

    /// Get the expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> CronResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Common cron expression presets.
pub struct CronPresets;

impl CronPresets {
    /// Every second
    pub const EVERY_SECOND: &'static str = "* * * * * *";

    /// Every minute
    pub const EVERY_MINUTE: &'static str = "0 * * * * *";

    /// Top of every hour
    pub const HOURLY: &'static str = "0 0 * * * *";

    /// Every day at noon
    pub const DAILY_NOON: &'static str = "0 0 12 * * *";

    /// Every day at midnight
    pub const DAILY_MIDNIGHT: &'static str = "0 0 0 * * *";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_valid_expression() {
        let expr = CronExpression::parse(" 0 * * * * * ").unwrap();
        assert_eq!(expr.expression(), "0 * * * * *");
    }

    #[test]
    fn test_parse_invalid_expression() {
        let err = CronExpression::parse("invalid").unwrap_err();
        assert!(matches!(err, CronError::InvalidExpression(_)));
    }

    #[test]
    fn test_presets() {
        for preset in [
            CronPresets::EVERY_SECOND,
            CronPresets::EVERY_MINUTE,
            CronPresets::HOURLY,
            CronPresets::DAILY_NOON,
            CronPresets::DAILY_MIDNIGHT,
        ] {
            assert!(CronExpression::parse(preset).is_ok(), "{}", preset);
        }
    }

    #[test]
    fn test_hourly_next_after() {
        let expr = CronExpression::parse(CronPresets::HOURLY).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap();

        let next = expr.next_after(at).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_daily_noon_next_after() {
        let expr = CronExpression::parse(CronPresets::DAILY_NOON).unwrap();
        let after_noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let next = expr.next_after(after_noon).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap());
        assert_eq!(next.hour(), 12);
    }
}
