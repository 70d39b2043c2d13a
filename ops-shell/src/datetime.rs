use crate::args::parse_list;
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, Utc};

/// date range of one calendar year, both ends inclusive
///
/// the current year stops at today, future years are rejected
pub fn year_range(year: i32, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    if year > today.year() {
        return Err(Error::Config(format!("year {} is in the future", year)));
    }
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| Error::Config(format!("invalid year {}", year)))?;
    let end = if year == today.year() {
        today
    } else {
        NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| Error::Config(format!("invalid year {}", year)))?
    };
    Ok((start, end))
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// parse comma separated years, keeping the given order
pub fn parse_years(s: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    for part in parse_list(s) {
        let year: i32 = part
            .parse()
            .map_err(|_| Error::Config(format!("invalid year: {}", part)))?;
        if !years.contains(&year) {
            years.push(year);
        }
    }
    if years.is_empty() {
        return Err(Error::Config("no year given".to_owned()));
    }
    Ok(years)
}
