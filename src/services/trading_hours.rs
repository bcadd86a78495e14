use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::time::Duration;

use crate::constants::{BIST_SESSION_END_HOUR, BIST_SESSION_START_HOUR, BIST_TIMEZONE};

/// Trading session of an exchange, in local time
pub struct TradingHours {
    pub start_hour: u32,        // 10 for 10am
    pub end_hour: u32,          // 18 for 6pm
    pub timezone: &'static str, // "Europe/Istanbul"
    pub weekdays_only: bool,    // true for Monday-Friday only
}

impl Default for TradingHours {
    /// Borsa Istanbul equity session
    fn default() -> Self {
        Self {
            start_hour: BIST_SESSION_START_HOUR,
            end_hour: BIST_SESSION_END_HOUR,
            timezone: BIST_TIMEZONE,
            weekdays_only: true,
        }
    }
}

impl TradingHours {
    /// Whether `at` falls inside the session
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let tz: Tz = match self.timezone.parse() {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!("Failed to parse timezone '{}': {}", self.timezone, e);
                return false;
            }
        };

        let local = at.with_timezone(&tz);

        if self.weekdays_only && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let hour = local.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Check if the Borsa Istanbul session is open right now
pub fn is_trading_hours() -> bool {
    TradingHours::default().contains(Utc::now())
}

/// Pick the watch refresh interval: short while the market is open, long otherwise
pub fn get_refresh_interval(trading_interval: Duration, non_trading_interval: Duration) -> Duration {
    if is_trading_hours() {
        trading_interval
    } else {
        non_trading_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_trading_hours_config() {
        let config = TradingHours::default();
        assert_eq!(config.start_hour, 10);
        assert_eq!(config.end_hour, 18);
        assert_eq!(config.timezone, "Europe/Istanbul");
        assert!(config.weekdays_only);
    }

    #[test]
    fn test_session_boundaries() {
        let hours = TradingHours::default();
        // Istanbul is UTC+3 all year
        let friday_open = Utc.with_ymd_and_hms(2025, 3, 14, 7, 0, 0).unwrap();
        let friday_before = Utc.with_ymd_and_hms(2025, 3, 14, 6, 59, 0).unwrap();
        let friday_close = Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap();
        let saturday_noon = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();

        assert!(hours.contains(friday_open));
        assert!(!hours.contains(friday_before));
        assert!(!hours.contains(friday_close));
        assert!(!hours.contains(saturday_noon));
    }
}
