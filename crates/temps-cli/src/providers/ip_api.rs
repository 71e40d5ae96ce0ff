use reqwest::blocking::Client;
use serde::Deserialize;

use crate::model::Place;

use super::{ProviderError, execute_request};

const PROVIDER_NAME: &str = "ip_api";
// The free endpoint takes no parameters; the caller's public IP is implicit.
const LOOKUP_ENDPOINT: &str = "http://ip-api.com/json/";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    timezone: Option<String>,
}

pub fn resolve(client: &Client) -> Result<Place, ProviderError> {
    let body =
        execute_request(client.get(LOOKUP_ENDPOINT)).map_err(|e| e.with_provider(PROVIDER_NAME))?;
    parse_lookup_response(&body).map_err(|e| e.with_provider(PROVIDER_NAME))
}

fn parse_lookup_response(body: &str) -> Result<Place, ProviderError> {
    let payload: LookupResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("geolocation payload: {error}")))?;

    // The service reports quota and bad-IP failures with HTTP 200 and an
    // explicit status flag; those are failures all the same.
    if payload.status != "success" {
        let message = payload
            .message
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "lookup failed".to_string());
        return Err(ProviderError::Rejected(message));
    }

    Ok(Place {
        city: required(payload.city, "city")?,
        country: required(payload.country, "country")?,
        latitude: payload.lat.ok_or_else(|| missing("lat"))?,
        longitude: payload.lon.ok_or_else(|| missing("lon"))?,
        timezone: required(payload.timezone, "timezone")?,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, ProviderError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> ProviderError {
    ProviderError::InvalidResponse(format!("geolocation payload: missing {field}"))
}
