use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DEFAULT_DAILY_LOOKBACK_DAYS, DEFAULT_INTRADAY_LOOKBACK_DAYS};

/// Bar granularity requested from the market-data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1-minute bars
    Minute,
    /// Daily bars
    Daily,
}

impl Interval {
    /// Convert to Yahoo chart format ("1m", "1d")
    pub fn to_yahoo_format(&self) -> &'static str {
        match self {
            Interval::Minute => "1m",
            Interval::Daily => "1d",
        }
    }

    /// Default number of calendar days to request for this granularity
    pub fn default_lookback_days(&self) -> i64 {
        match self {
            Interval::Minute => DEFAULT_INTRADAY_LOOKBACK_DAYS,
            Interval::Daily => DEFAULT_DAILY_LOOKBACK_DAYS,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_yahoo_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_lookback_spans_a_long_weekend() {
        assert!(Interval::Daily.default_lookback_days() >= 5);
        assert!(Interval::Minute.default_lookback_days() < Interval::Daily.default_lookback_days());
    }
}
