use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::cache::{CachedForecast, StaleCache};
use crate::error::ReportError;
use crate::model::{CurrentReport, Freshness, Place, PlaceQuery, TodayForecast};
use crate::providers::ProviderApi;
use crate::window::compute_window;

/// One report generation: resolve the location, compute the query window,
/// fetch, and fall back to the cache slot when the fetch fails. Terminal
/// states are `Ok` live, `Ok` stale-fallback, or `Err`; a new generation
/// restarts from location resolution, nothing is retried in place.
pub fn today_forecast<P, N>(
    providers: &P,
    cache: &StaleCache,
    now_fn: N,
    query: &PlaceQuery,
) -> Result<TodayForecast, ReportError>
where
    P: ProviderApi,
    N: Fn() -> DateTime<Utc>,
{
    let place = resolve_place(providers, query)?;
    let tz = parse_timezone(&place)?;
    let now = now_fn();
    let window = compute_window(now, tz);

    match providers.fetch_hourly_window(place.latitude, place.longitude, &place.timezone, &window) {
        Ok(forecast) => {
            let record = CachedForecast {
                place,
                window,
                forecast,
                fetched_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            };
            // Write-through is best effort: a failed write only means the
            // slot keeps its previous value.
            let _ = cache.put(&record);
            Ok(output_from_record(record, Freshness::Live, Vec::new()))
        }
        Err(error) => {
            let trace = vec![format!("open_meteo: {error}")];
            fallback_or_error(cache, trace)
        }
    }
}

pub fn current_conditions<P: ProviderApi>(
    providers: &P,
    query: &PlaceQuery,
) -> Result<CurrentReport, ReportError> {
    let place = resolve_place(providers, query)?;
    let current = providers
        .fetch_current(place.latitude, place.longitude)
        .map_err(|error| ReportError::FetchFailed(format!("open_meteo: {error}")))?;

    Ok(CurrentReport { place, current })
}

fn resolve_place<P: ProviderApi>(
    providers: &P,
    query: &PlaceQuery,
) -> Result<Place, ReportError> {
    match query {
        PlaceQuery::IpDerived => providers.resolve_ip_location().map_err(|error| {
            ReportError::LocationUnavailable(format!("ip lookup failed: {error}"))
        }),
        PlaceQuery::City(city) => providers.geocode_city(city).map_err(|error| {
            ReportError::LocationUnavailable(format!("failed to resolve city '{city}': {error}"))
        }),
    }
}

fn parse_timezone(place: &Place) -> Result<Tz, ReportError> {
    place.timezone.parse::<Tz>().map_err(|_| {
        ReportError::LocationUnavailable(format!(
            "location lookup returned unknown timezone '{}'",
            place.timezone
        ))
    })
}

fn fallback_or_error(
    cache: &StaleCache,
    trace: Vec<String>,
) -> Result<TodayForecast, ReportError> {
    // A slot read error counts the same as an empty slot here; the fetch
    // failure is what gets reported.
    match cache.get().ok().flatten() {
        Some(record) => Ok(output_from_record(record, Freshness::StaleFallback, trace)),
        None => Err(ReportError::NoFallbackAvailable(trace.join("; "))),
    }
}

/// The stale path presents the cached record wholesale, window included, so
/// the report always describes the data it actually shows.
fn output_from_record(
    record: CachedForecast,
    freshness: Freshness,
    fetch_trace: Vec<String>,
) -> TodayForecast {
    TodayForecast {
        place: record.place,
        window: record.window,
        forecast: record.forecast,
        freshness,
        fetch_trace,
        fetched_at: record.fetched_at,
    }
}
