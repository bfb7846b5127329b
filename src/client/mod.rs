pub mod error;
pub mod http_client;
pub mod transform;

use crate::config::ApiConfig;
use crate::models::{OutputSize, Period, PriceRecord, RawSeriesResponse};
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use self::error::FetchError;
use self::http_client::HttpClient;
use self::transform::{find_series_key, transform};

/// Top-level fields the API uses instead of a series when it refuses a call.
const API_MESSAGE_FIELDS: [&str; 3] = ["Error Message", "Note", "Information"];

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable price source.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_raw(
        &self,
        symbol: &str,
        period: Period,
        outputsize: OutputSize,
    ) -> Result<RawSeriesResponse, FetchError>;

    /// Fetch and transform; never returns a partial series.
    async fn fetch_series(
        &self,
        symbol: &str,
        period: Period,
        outputsize: OutputSize,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        let raw = self.fetch_raw(symbol, period, outputsize).await?;
        check_api_message(&raw)?;
        let records = transform(&raw)?;
        debug!("{} {}: {} records", symbol, period, records.len());
        Ok(records)
    }
}

/// Turns a throttling note or error message into `FetchError::ApiLimit`.
/// A response that carries a time series is never rejected here.
pub fn check_api_message(raw: &RawSeriesResponse) -> Result<(), FetchError> {
    if find_series_key(raw).is_some() {
        return Ok(());
    }

    for field in API_MESSAGE_FIELDS {
        if let Some(value) = raw.get(field) {
            let message = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Err(FetchError::ApiLimit {
                field: field.to_string(),
                message,
            });
        }
    }

    Ok(())
}

// ── Alpha Vantage ─────────────────────────────────────────────────────────────

pub struct AlphaVantageClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(config: &ApiConfig, api_key: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// `<base>/query?function=..&symbol=..&apikey=..`, plus `outputsize` for daily.
    pub fn query_url(
        &self,
        symbol: &str,
        period: Period,
        outputsize: OutputSize,
    ) -> Result<Url, FetchError> {
        let mut params = vec![
            ("function", period.api_function()),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        if period == Period::Daily {
            params.push(("outputsize", outputsize.as_str()));
        }

        Ok(Url::parse_with_params(&format!("{}/query", self.base_url), &params)?)
    }
}

#[async_trait]
impl PriceSource for AlphaVantageClient {
    async fn fetch_raw(
        &self,
        symbol: &str,
        period: Period,
        outputsize: OutputSize,
    ) -> Result<RawSeriesResponse, FetchError> {
        let url = self.query_url(symbol, period, outputsize)?;
        info!("Fetching {} {} data", symbol, period);
        self.client.get_json(url).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
