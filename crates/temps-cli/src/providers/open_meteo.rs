use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::model::{CurrentConditions, ForecastResponse, ForecastSample, Place, TimeWindow};

use super::{ProviderError, execute_request};

const PROVIDER_NAME: &str = "open_meteo";
const GEOCODE_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
const HOURLY_FIELDS: &str = "temperature_2m";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m";
const DEFAULT_TEMPERATURE_UNIT: &str = "°C";

#[derive(Debug, Serialize)]
struct GeocodeQuery<'a> {
    name: &'a str,
    count: u8,
    language: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    timezone: Option<String>,
}

#[derive(Debug, Serialize)]
struct HourlyQuery<'a> {
    latitude: f64,
    longitude: f64,
    timezone: &'a str,
    hourly: &'a str,
    start_hour: &'a str,
    end_hour: &'a str,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
    hourly: Option<HourlySeries>,
    hourly_units: Option<HourlyUnits>,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct HourlyUnits {
    temperature_2m: Option<String>,
}

#[derive(Debug, Serialize)]
struct CurrentQuery<'a> {
    latitude: f64,
    longitude: f64,
    current: &'a str,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Option<CurrentReading>,
    current_units: Option<CurrentUnits>,
}

#[derive(Debug, Deserialize)]
struct CurrentReading {
    time: String,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: i32,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentUnits {
    temperature_2m: Option<String>,
}

pub fn fetch_geocode(client: &Client, city: &str) -> Result<Place, ProviderError> {
    let query = GeocodeQuery {
        name: city,
        count: 1,
        language: "en",
        format: "json",
    };

    let body = execute_request(client.get(GEOCODE_ENDPOINT).query(&query))
        .map_err(|e| e.with_provider(PROVIDER_NAME))?;
    parse_geocode_response(&body, city).map_err(|e| e.with_provider(PROVIDER_NAME))
}

pub fn fetch_hourly_window(
    client: &Client,
    lat: f64,
    lon: f64,
    timezone_id: &str,
    window: &TimeWindow,
) -> Result<ForecastResponse, ProviderError> {
    let query = HourlyQuery {
        latitude: lat,
        longitude: lon,
        timezone: timezone_id,
        hourly: HOURLY_FIELDS,
        start_hour: &window.start,
        end_hour: &window.end,
    };

    let body = execute_request(client.get(FORECAST_ENDPOINT).query(&query))
        .map_err(|e| e.with_provider(PROVIDER_NAME))?;
    parse_hourly_response(&body).map_err(|e| e.with_provider(PROVIDER_NAME))
}

pub fn fetch_current(client: &Client, lat: f64, lon: f64) -> Result<CurrentConditions, ProviderError> {
    let query = CurrentQuery {
        latitude: lat,
        longitude: lon,
        current: CURRENT_FIELDS,
    };

    let body = execute_request(client.get(FORECAST_ENDPOINT).query(&query))
        .map_err(|e| e.with_provider(PROVIDER_NAME))?;
    parse_current_response(&body).map_err(|e| e.with_provider(PROVIDER_NAME))
}

fn parse_geocode_response(body: &str, city: &str) -> Result<Place, ProviderError> {
    let payload: GeocodeResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("geocode payload: {error}")))?;

    let Some(result) = payload.results.into_iter().next() else {
        return Err(ProviderError::NotFound(city.to_string()));
    };

    if result.name.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "geocode payload: empty location name".to_string(),
        ));
    }

    let timezone = result
        .timezone
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ProviderError::InvalidResponse("geocode payload: missing timezone".to_string())
        })?;

    Ok(Place {
        city: result.name,
        country: result.country.unwrap_or_default(),
        latitude: result.latitude,
        longitude: result.longitude,
        timezone,
    })
}

fn parse_hourly_response(body: &str) -> Result<ForecastResponse, ProviderError> {
    let payload: HourlyResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("forecast payload: {error}")))?;

    let timezone = payload
        .timezone
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ProviderError::InvalidResponse("forecast payload: missing timezone".to_string())
        })?;

    // A current-conditions payload has no hourly block; the two response
    // shapes are not interchangeable.
    let hourly = payload.hourly.ok_or_else(|| {
        ProviderError::InvalidResponse("forecast payload: missing hourly time series".to_string())
    })?;

    let samples = build_samples(hourly)?;
    let unit = payload
        .hourly_units
        .and_then(|units| units.temperature_2m)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_TEMPERATURE_UNIT.to_string());

    Ok(ForecastResponse {
        latitude: payload.latitude,
        longitude: payload.longitude,
        timezone,
        samples,
        unit,
    })
}

fn build_samples(hourly: HourlySeries) -> Result<Vec<ForecastSample>, ProviderError> {
    let length = hourly.time.len();

    if hourly.temperature_2m.len() != length {
        return Err(ProviderError::InvalidResponse(
            "forecast payload: hourly arrays length mismatch".to_string(),
        ));
    }

    let mut samples = Vec::with_capacity(length);
    for (timestamp, temperature_c) in hourly.time.into_iter().zip(hourly.temperature_2m) {
        let timestamp = timestamp.trim().to_string();
        if timestamp.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "forecast payload: empty timestamp in hourly.time".to_string(),
            ));
        }
        samples.push(ForecastSample {
            timestamp,
            temperature_c,
        });
    }

    Ok(samples)
}

fn parse_current_response(body: &str) -> Result<CurrentConditions, ProviderError> {
    let payload: CurrentResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("current payload: {error}")))?;

    // Mirror of the hourly-shape check: an hourly payload has no current
    // reading and must not pass for one.
    let reading = payload.current.ok_or_else(|| {
        ProviderError::InvalidResponse("current payload: missing current reading".to_string())
    })?;

    if reading.time.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "current payload: empty reading time".to_string(),
        ));
    }

    let temperature_unit = payload
        .current_units
        .and_then(|units| units.temperature_2m)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_TEMPERATURE_UNIT.to_string());

    Ok(CurrentConditions {
        time: reading.time.trim().to_string(),
        temperature_c: reading.temperature_2m,
        humidity_pct: reading.relative_humidity_2m,
        weather_code: reading.weather_code,
        wind_speed_kmh: reading.wind_speed_10m,
        temperature_unit,
    })
}
