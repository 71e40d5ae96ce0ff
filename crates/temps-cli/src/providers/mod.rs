use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;

use crate::model::{CurrentConditions, ForecastResponse, Place, TimeWindow};

pub mod ip_api;
pub mod open_meteo;

/// Outbound lookups used by the report workflow. Each call is a single
/// attempt; no retry or backoff anywhere on this seam.
pub trait ProviderApi {
    fn resolve_ip_location(&self) -> Result<Place, ProviderError>;
    fn geocode_city(&self, city: &str) -> Result<Place, ProviderError>;
    fn fetch_hourly_window(
        &self,
        lat: f64,
        lon: f64,
        timezone_id: &str,
        window: &TimeWindow,
    ) -> Result<ForecastResponse, ProviderError>;
    fn fetch_current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: Client,
}

impl HttpProviders {
    pub fn new(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        Ok(Self { client })
    }
}

impl ProviderApi for HttpProviders {
    fn resolve_ip_location(&self) -> Result<Place, ProviderError> {
        ip_api::resolve(&self.client)
    }

    fn geocode_city(&self, city: &str) -> Result<Place, ProviderError> {
        open_meteo::fetch_geocode(&self.client, city)
    }

    fn fetch_hourly_window(
        &self,
        lat: f64,
        lon: f64,
        timezone_id: &str,
        window: &TimeWindow,
    ) -> Result<ForecastResponse, ProviderError> {
        open_meteo::fetch_hourly_window(&self.client, lat, lon, timezone_id, window)
    }

    fn fetch_current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, ProviderError> {
        open_meteo::fetch_current(&self.client, lat, lon)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("location not found: {0}")]
    NotFound(String),
    #[error("lookup rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn with_provider(self, provider: &'static str) -> Self {
        match self {
            ProviderError::Transport(message) => {
                ProviderError::Transport(format!("{provider}: {message}"))
            }
            ProviderError::Http { status, message } => ProviderError::Http {
                status,
                message: format!("{provider}: {message}"),
            },
            ProviderError::InvalidResponse(message) => {
                ProviderError::InvalidResponse(format!("{provider}: {message}"))
            }
            ProviderError::NotFound(message) => {
                ProviderError::NotFound(format!("{provider}: {message}"))
            }
            ProviderError::Rejected(message) => {
                ProviderError::Rejected(format!("{provider}: {message}"))
            }
        }
    }
}

fn execute_request(request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request
        .send()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(ProviderError::Http {
        status: status.as_u16(),
        message,
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let from_json = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|json| {
            for key in ["reason", "message", "error", "detail", "description"] {
                if let Some(value) = json.get(key).and_then(Value::as_str) {
                    let message = value.trim();
                    if !message.is_empty() {
                        return Some(message.to_string());
                    }
                }
            }
            None
        });

    from_json.or_else(|| Some(trimmed.to_string()))
}
