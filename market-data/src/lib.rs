pub mod client;
pub mod coingecko;
pub mod error;
pub mod fixer;
pub mod model;

pub use client::MarketDataClient;
pub use coingecko::{GetMarketChart, MarketChart};
pub use error::Error;
pub use fixer::{GetTimeseries, Timeseries};
pub use model::{ProviderCommand, RequestCommand, TickerPoint};

use std::fmt;
use std::str::FromStr;

/// sampling interval of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Daily,
    Hourly,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Interval::Daily => f.write_str("daily"),
            Interval::Hourly => f.write_str("hourly"),
        }
    }
}

/// enable parse string to interval
impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "daily" | "1d" => Ok(Interval::Daily),
            "hourly" | "1h" => Ok(Interval::Hourly),
            _ => Err(Error::Client(format!("invalid interval: {}", s))),
        }
    }
}

/// how far back a provider should look, counted from today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Days(u32),
    Max,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TimeRange::Days(n) => write!(f, "{}", n),
            TimeRange::Max => f.write_str("max"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(TimeRange::Max);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(TimeRange::Days(n)),
            _ => Err(Error::Client(format!("invalid time range: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_str() {
        assert_eq!(Interval::Daily, "daily".parse::<Interval>().unwrap());
        assert_eq!(Interval::Daily, "1d".parse::<Interval>().unwrap());
        assert_eq!(Interval::Hourly, "hourly".parse::<Interval>().unwrap());
        assert!("weekly".parse::<Interval>().is_err());
        assert_eq!("daily", Interval::Daily.to_string());
    }

    #[test]
    fn test_time_range_from_str() {
        assert_eq!(TimeRange::Days(30), "30".parse::<TimeRange>().unwrap());
        assert_eq!(TimeRange::Max, "max".parse::<TimeRange>().unwrap());
        assert_eq!(TimeRange::Max, "MAX".parse::<TimeRange>().unwrap());
        assert!("0".parse::<TimeRange>().is_err());
        assert!("-1".parse::<TimeRange>().is_err());
        assert!("soon".parse::<TimeRange>().is_err());
        assert_eq!("14", TimeRange::Days(14).to_string());
    }
}
