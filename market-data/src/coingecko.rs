//! Coingecko market chart endpoint.

use crate::error::Error;
use crate::model::{consume_json, ProviderCommand, RequestCommand, TickerPoint};
use crate::{Interval, TimeRange};
use chrono::{TimeZone, Utc};
use reqwest::blocking::Response;
use serde_derive::*;

pub const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";

/// historical market data of one coin against one currency
#[derive(Debug, Clone, PartialEq)]
pub struct GetMarketChart {
    pub coin: String,
    pub vs_currency: String,
    pub days: TimeRange,
    pub interval: Interval,
}

impl RequestCommand for GetMarketChart {
    fn request_path(&self) -> String {
        format!("/coins/{}/market_chart", self.coin)
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", self.vs_currency.clone()),
            ("days", self.days.to_string()),
            ("interval", self.interval.to_string()),
        ]
    }
}

impl ProviderCommand for GetMarketChart {
    type Output = MarketChart;
    fn response_body(&self, response: Response) -> Result<MarketChart, Error> {
        consume_json(response)
    }
}

/// response of the market chart endpoint
///
/// each entry is `[epoch_millis, value]`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MarketChart {
    pub prices: Vec<(f64, f64)>,
    #[serde(default)]
    pub market_caps: Vec<(f64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, f64)>,
}

impl MarketChart {
    /// converts prices into ticker points of the given pair
    pub fn into_points<'a>(
        self,
        coin: &'a str,
        vs_currency: &'a str,
    ) -> impl Iterator<Item = Result<TickerPoint, Error>> + 'a {
        self.prices
            .into_iter()
            .map(move |(millis, value)| -> Result<TickerPoint, Error> {
                let ts = epoch_millis_to_utc(millis)?;
                Ok(TickerPoint::new(coin, vs_currency, ts, value))
            })
    }
}

fn epoch_millis_to_utc(millis: f64) -> Result<chrono::DateTime<Utc>, Error> {
    if !millis.is_finite() {
        return Err(Error::Normalize(format!("invalid epoch millis: {}", millis)));
    }
    Utc.timestamp_millis_opt(millis.round() as i64)
        .single()
        .ok_or_else(|| Error::Normalize(format!("epoch millis out of range: {}", millis)))
}
