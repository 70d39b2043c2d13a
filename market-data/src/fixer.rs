//! Fixer time series endpoint.

use crate::error::Error;
use crate::model::{consume_json, ProviderCommand, RequestCommand, TickerPoint};
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::blocking::Response;
use serde_derive::*;
use std::collections::BTreeMap;

pub const FIXER_API: &str = "https://data.fixer.io/api";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// daily rates of the base currency against the symbols, both dates inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct GetTimeseries {
    pub base: String,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl RequestCommand for GetTimeseries {
    fn request_path(&self) -> String {
        "/timeseries".to_owned()
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("base", self.base.clone()),
            ("symbols", self.symbols.join(",")),
            ("start_date", self.start_date.format(DATE_FORMAT).to_string()),
            ("end_date", self.end_date.format(DATE_FORMAT).to_string()),
        ]
    }
}

impl ProviderCommand for GetTimeseries {
    type Output = Timeseries;
    fn response_body(&self, response: Response) -> Result<Timeseries, Error> {
        let ts: Timeseries = consume_json(response)?;
        ts.check()?;
        Ok(ts)
    }
}

/// error payload reported with `success: false`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FixerError {
    pub code: i32,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// response of the time series endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Timeseries {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    #[serde(default)]
    pub error: Option<FixerError>,
}

fn default_success() -> bool {
    true
}

impl Timeseries {
    /// fixer answers 200 even on failure, the body tells the truth
    pub fn check(&self) -> Result<(), Error> {
        if self.success {
            if self.base.is_empty() || self.rates.is_none() {
                return Err(Error::Serde(
                    "not a fixer time series, base or rates missing".to_owned(),
                ));
            }
            return Ok(());
        }
        let msg = match self.error {
            Some(ref e) => format!(
                "fixer error {}: {}",
                e.code,
                e.info.as_deref().or_else(|| e.kind.as_deref()).unwrap_or("unknown")
            ),
            None => "fixer reported failure without details".to_owned(),
        };
        Err(Error::Server(msg))
    }

    /// number of (date, symbol) entries in the response
    pub fn len(&self) -> usize {
        self.rates
            .as_ref()
            .map(|rates| rates.values().map(|r| r.len()).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// converts rates into ticker points, ordered by date then symbol
    pub fn into_points(self) -> impl Iterator<Item = Result<TickerPoint, Error>> {
        let base = self.base;
        self.rates.unwrap_or_default().into_iter().flat_map(move |(date, rates)| {
            let day = parse_date_key(&date);
            let base = base.clone();
            rates.into_iter().map(move |(symbol, value)| match &day {
                Ok(ts) => Ok(TickerPoint::new(&base, &symbol, *ts, value)),
                Err(msg) => Err(Error::Normalize(msg.clone())),
            })
        })
    }
}

fn parse_date_key(key: &str) -> Result<chrono::DateTime<Utc>, String> {
    let day = NaiveDate::parse_from_str(key, DATE_FORMAT)
        .map_err(|e| format!("invalid date key {}: {}", key, e))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date key {}", key))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
