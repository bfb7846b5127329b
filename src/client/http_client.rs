use super::error::FetchError;
use crate::config::ApiConfig;
use crate::models::RawSeriesResponse;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const BODY_SNIPPET_CHARS: usize = 200;

/// Thin reqwest wrapper: one attempt per call, no retry.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;

        Ok(Self { inner })
    }

    /// GET `url` and decode the body as a JSON object.
    pub async fn get_json(&self, url: Url) -> Result<RawSeriesResponse, FetchError> {
        debug!("GET {}", redact(&url));

        // reqwest errors carry the request URL, which holds the API key.
        let resp = self.inner.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(FetchError::Decode(format!("top-level {}", json_kind(&other)))),
            Err(e) => Err(FetchError::Decode(format!("{e} | body: {}", snippet(&body)))),
        }
    }
}

/// URL with the `apikey` parameter masked, for logging.
pub fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apikey" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn transport(e: reqwest::Error) -> FetchError {
    FetchError::Transport(e.without_url())
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
