use serde::Serialize;
use url::form_urlencoded;

use crate::model::ForecastSample;

const CHART_ENDPOINT: &str = "https://quickchart.io/chart";
const SERIES_LABEL: &str = "Temperature (°C)";
const AXIS_DEFAULT_MIN: i64 = 0;
const AXIS_DEFAULT_MAX: i64 = 40;
const AXIS_HEADROOM: i64 = 2;

/// Chart specification handed to the external renderer. Pure data; the
/// rendering call itself is an opaque collaborator reached by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    labels: Vec<String>,
    values: Vec<f64>,
    y_min: i64,
    y_max: i64,
}

#[derive(Debug, Serialize)]
struct ChartConfig<'a> {
    #[serde(rename = "type")]
    chart_type: &'static str,
    data: ChartData<'a>,
    options: ChartOptions,
}

#[derive(Debug, Serialize)]
struct ChartData<'a> {
    labels: &'a [String],
    datasets: Vec<ChartDataset<'a>>,
}

#[derive(Debug, Serialize)]
struct ChartDataset<'a> {
    label: &'static str,
    data: &'a [f64],
    fill: bool,
}

#[derive(Debug, Serialize)]
struct ChartOptions {
    scales: ChartScales,
}

#[derive(Debug, Serialize)]
struct ChartScales {
    y: ChartAxis,
}

#[derive(Debug, Serialize)]
struct ChartAxis {
    min: i64,
    max: i64,
}

impl ChartSpec {
    pub fn from_samples(samples: &[ForecastSample]) -> Self {
        let (y_min, y_max) = axis_bounds(samples);
        Self {
            labels: samples
                .iter()
                .map(|sample| time_of_day(&sample.timestamp))
                .collect(),
            values: samples.iter().map(|sample| sample.temperature_c).collect(),
            y_min,
            y_max,
        }
    }

    /// Stable line/area chart serialization; field order is fixed by the
    /// config structs.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ChartConfig {
            chart_type: "line",
            data: ChartData {
                labels: &self.labels,
                datasets: vec![ChartDataset {
                    label: SERIES_LABEL,
                    data: &self.values,
                    fill: true,
                }],
            },
            options: ChartOptions {
                scales: ChartScales {
                    y: ChartAxis {
                        min: self.y_min,
                        max: self.y_max,
                    },
                },
            },
        })
    }

    pub fn renderer_url(&self) -> serde_json::Result<String> {
        let spec = self.to_json()?;
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("c", &spec)
            .finish();
        Ok(format!("{CHART_ENDPOINT}?{query}"))
    }
}

/// Widens the default 0..40 axis only past either edge so extreme values are
/// never clipped.
fn axis_bounds(samples: &[ForecastSample]) -> (i64, i64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for sample in samples {
        min = min.min(sample.temperature_c);
        max = max.max(sample.temperature_c);
    }

    let y_min = if min < 0.0 {
        min.floor() as i64
    } else {
        AXIS_DEFAULT_MIN
    };
    let y_max = if max > AXIS_DEFAULT_MAX as f64 {
        max.ceil() as i64 + AXIS_HEADROOM
    } else {
        AXIS_DEFAULT_MAX
    };

    (y_min, y_max)
}

fn time_of_day(timestamp: &str) -> String {
    timestamp
        .split_once('T')
        .map(|(_, time)| time.to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
