use crate::error::Error;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::blocking::Response;
use serde::Deserialize;

/// canonical text form of a ticker timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// RequestCommand
///
/// define how to locate the resource
pub trait RequestCommand {
    // path relative to the provider base url, starting with '/'
    fn request_path(&self) -> String;

    // query parameters, in the order they are sent
    fn query_params(&self) -> Vec<(&'static str, String)>;
}

/// ProviderCommand
///
/// defines how to handle response body
pub trait ProviderCommand: RequestCommand {
    type Output;
    // response is consumed, and the parsed output is returned
    fn response_body(&self, response: Response) -> Result<Self::Output, Error>;
}

// json consuming function, the raw body is logged for audit
pub(crate) fn consume_json<T>(response: Response) -> Result<T, Error>
where
    for<'de> T: Deserialize<'de>,
{
    let body = response.text()?;
    debug!("Data: \n{}", body);
    parse_json(&body)
}

pub(crate) fn parse_json<T>(body: &str) -> Result<T, Error>
where
    for<'de> T: Deserialize<'de>,
{
    let t = serde_json::from_str(body)?;
    Ok(t)
}

/// one observation of a time series
///
/// (timestamp, subject_code, counter_code) is the natural key
#[derive(Debug, Clone, PartialEq)]
pub struct TickerPoint {
    pub subject_code: String,
    pub counter_code: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TickerPoint {
    pub fn new(
        subject_code: &str,
        counter_code: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Self {
        TickerPoint {
            subject_code: subject_code.to_lowercase(),
            counter_code: counter_code.to_lowercase(),
            timestamp,
            value,
        }
    }

    pub fn canonical_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
