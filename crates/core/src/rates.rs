use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("rate service unreachable: {0}")]
    Unavailable(String),
    #[error("unexpected rate service response: {0}")]
    UnexpectedResponse(String),
    #[error("rate lookup failed: {0}")]
    Other(String),
}

impl RateError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "Could not connect to server. Try again later",
            Self::UnexpectedResponse(_) => {
                "Error: unexpected API response. Please, contact responsible IT rep to fix this problem"
            }
            Self::Other(_) => "Error. Please, contact responsible IT rep to fix this problem",
        }
    }
}

/// Official rate of the configured currency pair on a given day.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn rate_on(&self, date: NaiveDate) -> Result<Decimal, RateError>;
}

pub fn previous_month_end(date: NaiveDate) -> NaiveDate {
    let first_of_month = date.with_day(1).unwrap_or(date);
    first_of_month.checked_sub_days(Days::new(1)).unwrap_or(first_of_month)
}

/// `"{rate at previous month end} -> {rate today}"`.
pub async fn rate_change_summary(
    provider: &dyn ExchangeRateProvider,
    today: NaiveDate,
) -> Result<String, RateError> {
    let today_rate = provider.rate_on(today).await?;
    let previous_rate = provider.rate_on(previous_month_end(today)).await?;
    Ok(format!("{} -> {}", previous_rate.normalize(), today_rate.normalize()))
}
