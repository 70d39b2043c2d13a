use crate::coingecko::COINGECKO_API;
use crate::error::Error;
use crate::fixer::FIXER_API;
use crate::model::ProviderCommand;
use log::debug;

/// blocking client of a market data provider
///
/// one GET per command, no retry
pub struct MarketDataClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MarketDataClient {
    pub fn coingecko() -> Self {
        Self::with_base_url(COINGECKO_API, None)
    }

    pub fn fixer(access_key: &str) -> Self {
        Self::with_base_url(FIXER_API, Some(access_key))
    }

    pub fn with_base_url(base_url: &str, api_key: Option<&str>) -> Self {
        MarketDataClient {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            api_key: api_key.map(|k| k.to_owned()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn execute<C: ProviderCommand>(&self, command: C) -> Result<C::Output, Error> {
        let url = format!("{}{}", self.base_url, command.request_path());
        let mut params = command.query_params();
        if let Some(ref key) = self.api_key {
            params.insert(0, ("access_key", key.clone()));
        }
        debug!("GET {} {}", url, describe_params(&params));
        let response = self.http.get(&url).query(&params).send()?;
        let status = response.status();
        debug!("Response status code: {}", status);
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Server(format!("GET {} returned {}: {}", url, status, body)));
        }
        command.response_body(response)
    }
}

// render query params for logs, credentials masked
fn describe_params(params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| {
            if *k == "access_key" {
                format!("{}={}", k, mask_secret(v))
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// keeps only the last 4 characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}
