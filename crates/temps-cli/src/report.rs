use serde::Serialize;

use crate::chart::ChartSpec;
use crate::conditions;
use crate::model::{CurrentReport, Freshness, Place, TodayForecast};

pub const STALE_BANNER: &str =
    "⚠️ Stale forecast: the live fetch failed, showing the last cached result.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub text: String,
    pub chart_url: String,
}

/// Renders the forecast into text plus a chart reference. Deterministic for
/// a given input; no I/O happens here.
pub fn render(today: &TodayForecast) -> serde_json::Result<Report> {
    let chart_url = ChartSpec::from_samples(&today.forecast.samples).renderer_url()?;

    let mut lines = Vec::with_capacity(today.forecast.samples.len() + 8);
    if today.freshness == Freshness::StaleFallback {
        lines.push(STALE_BANNER.to_string());
        lines.push(String::new());
    }
    lines.push(format!("# Today's temperature in {}", place_label(&today.place)));
    lines.push(String::new());
    lines.push(format!(
        "Window: {} to {} ({})",
        today.window.start, today.window.end, today.place.timezone
    ));
    lines.push(format!(
        "Coordinates: {:.4}, {:.4}",
        today.place.latitude, today.place.longitude
    ));
    lines.push(format!("Samples: {}", today.forecast.samples.len()));
    lines.push(String::new());
    lines.push("| Time | Temperature |".to_string());
    lines.push("| --- | --- |".to_string());
    for sample in &today.forecast.samples {
        lines.push(format!(
            "| {} | {:.1} {} |",
            sample.timestamp, sample.temperature_c, today.forecast.unit
        ));
    }

    Ok(Report {
        text: lines.join("\n"),
        chart_url,
    })
}

pub fn render_current(report: &CurrentReport) -> String {
    [
        format!("# Current conditions in {}", place_label(&report.place)),
        String::new(),
        format!(
            "{}, {:.1} {}",
            conditions::summary(report.current.weather_code),
            report.current.temperature_c,
            report.current.temperature_unit
        ),
        format!("Humidity: {:.0}%", report.current.humidity_pct),
        format!("Wind: {:.1} km/h", report.current.wind_speed_kmh),
        format!("Observed: {} (UTC)", report.current.time),
    ]
    .join("\n")
}

pub fn place_label(place: &Place) -> String {
    if place.country.trim().is_empty() {
        place.city.clone()
    } else {
        format!("{}, {}", place.city, place.country)
    }
}
