use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location resolved from the caller's public IP or a geocoded city name.
/// Immutable once resolved; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone identifier, e.g. "Europe/Berlin".
    pub timezone: String,
}

/// Local-time query bounds, formatted as `YYYY-MM-DDTHH:mm` with no UTC
/// offset. Both bounds are scoped to the place's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: String,
    pub temperature_c: f64,
}

/// One hourly temperature series as returned by the forecast provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub samples: Vec<ForecastSample>,
    pub unit: String,
}

/// A report is either freshly fetched or substituted from the single-slot
/// cache; the two states are mutually exclusive and surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Live,
    StaleFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayForecast {
    pub place: Place,
    pub window: TimeWindow,
    pub forecast: ForecastResponse,
    pub freshness: Freshness,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fetch_trace: Vec<String>,
    pub fetched_at: String,
}

/// Single instantaneous reading; timestamps are UTC because the current-mode
/// request carries no timezone parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub time: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub weather_code: i32,
    pub wind_speed_kmh: f64,
    pub temperature_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReport {
    pub place: Place,
    pub current: CurrentConditions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    IpDerived,
    City(String),
}

impl PlaceQuery {
    pub fn new(city: Option<&str>) -> Result<Self, ValidationError> {
        match city {
            Some(raw) => {
                let value = raw.trim();
                if value.is_empty() {
                    return Err(ValidationError::EmptyCity);
                }
                Ok(Self::City(value.to_string()))
            }
            None => Ok(Self::IpDerived),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("city must not be empty")]
    EmptyCity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_query_defaults_to_ip_derivation() {
        let query = PlaceQuery::new(None).expect("query");
        assert_eq!(query, PlaceQuery::IpDerived);
    }

    #[test]
    fn model_query_accepts_city_and_trims_input() {
        let query = PlaceQuery::new(Some("  Taipei  ")).expect("query");
        assert_eq!(query, PlaceQuery::City("Taipei".to_string()));
    }

    #[test]
    fn model_query_rejects_blank_city() {
        let err = PlaceQuery::new(Some("   ")).expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyCity);
    }

    #[test]
    fn model_freshness_serializes_in_snake_case() {
        let live = serde_json::to_value(Freshness::Live).expect("json");
        let stale = serde_json::to_value(Freshness::StaleFallback).expect("json");

        assert_eq!(live, serde_json::json!("live"));
        assert_eq!(stale, serde_json::json!("stale_fallback"));
    }

    #[test]
    fn model_today_forecast_omits_empty_fetch_trace() {
        let today = TodayForecast {
            place: Place {
                city: "Berlin".to_string(),
                country: "Germany".to_string(),
                latitude: 52.52,
                longitude: 13.405,
                timezone: "Europe/Berlin".to_string(),
            },
            window: TimeWindow {
                start: "2026-03-05T05:00".to_string(),
                end: "2026-03-05T15:05".to_string(),
            },
            forecast: ForecastResponse {
                latitude: 52.52,
                longitude: 13.405,
                timezone: "Europe/Berlin".to_string(),
                samples: Vec::new(),
                unit: "°C".to_string(),
            },
            freshness: Freshness::Live,
            fetch_trace: Vec::new(),
            fetched_at: "2026-03-05T14:05:00Z".to_string(),
        };

        let value = serde_json::to_value(today).expect("json");
        assert!(value.get("fetch_trace").is_none());
    }
}
