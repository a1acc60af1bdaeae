use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use staffbot_core::config::ExchangeRateConfig;
use staffbot_core::rates::{ExchangeRateProvider, RateError};

/// Client for a Frankfurter-style historical rates endpoint:
/// `GET {base}/{YYYY-MM-DD}?from=EUR&to=MDL`.
pub struct HttpExchangeRateProvider {
    client: reqwest::Client,
    base_url: String,
    base_currency: String,
    quote_currency: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, Value>,
}

impl HttpExchangeRateProvider {
    pub fn new(config: &ExchangeRateConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            base_currency: config.base_currency.clone(),
            quote_currency: config.quote_currency.clone(),
        }
    }

    fn url_for(&self, date: NaiveDate) -> String {
        format!("{}/{}", self.base_url, date.format("%Y-%m-%d"))
    }
}

#[async_trait]
impl ExchangeRateProvider for HttpExchangeRateProvider {
    async fn rate_on(&self, date: NaiveDate) -> Result<Decimal, RateError> {
        let response = self
            .client
            .get(self.url_for(date))
            .query(&[("from", self.base_currency.as_str()), ("to", self.quote_currency.as_str())])
            .send()
            .await
            .map_err(|error| {
                warn!(error = %error, %date, "exchange rate request failed");
                if error.is_connect() || error.is_timeout() {
                    RateError::Unavailable(error.to_string())
                } else {
                    RateError::Other(error.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RateError::Unavailable(format!("rate service returned {status}")));
        }
        if !status.is_success() {
            return Err(RateError::UnexpectedResponse(format!("rate service returned {status}")));
        }

        let payload: RatesResponse = response
            .json()
            .await
            .map_err(|error| RateError::UnexpectedResponse(format!("undecodable body: {error}")))?;

        parse_rate(&payload, &self.quote_currency)
    }
}

fn parse_rate(payload: &RatesResponse, quote_currency: &str) -> Result<Decimal, RateError> {
    let raw = payload.rates.get(quote_currency).ok_or_else(|| {
        RateError::UnexpectedResponse(format!("response has no `{quote_currency}` rate"))
    })?;

    let text = match raw {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => {
            return Err(RateError::UnexpectedResponse(format!("rate is not numeric: {other}")));
        }
    };

    Decimal::from_str(&text)
        .map_err(|error| RateError::UnexpectedResponse(format!("invalid rate `{text}`: {error}")))
}
