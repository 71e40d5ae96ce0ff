use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use temps_cli::{
    cache::StaleCache,
    conditions,
    config::RuntimeConfig,
    error::{ErrorKind, ReportError},
    model::{CurrentReport, Freshness, PlaceQuery, TodayForecast},
    providers::{HttpProviders, ProviderApi},
    report::{self, Report},
    service,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Today's temperature for the IP-derived location (free no-token APIs)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hourly temperatures since 05:00 local time, with a chart link.
    Today {
        #[arg(long)]
        city: Option<String>,
        #[arg(long, value_enum)]
        output: Option<OutputModeArg>,
        #[arg(long)]
        json: bool,
    },
    /// Current conditions for the same location.
    Now {
        #[arg(long)]
        city: Option<String>,
        #[arg(long, value_enum)]
        output: Option<OutputModeArg>,
        #[arg(long)]
        json: bool,
    },
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";
const ERROR_CODE_USER_INVALID_INPUT: &str = "user.invalid_input";
const ERROR_CODE_USER_OUTPUT_MODE_CONFLICT: &str = "user.output_mode_conflict";
const ERROR_CODE_RUNTIME_PROVIDER_INIT: &str = "runtime.provider_init_failed";
const ERROR_CODE_RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    Human,
    Json,
    AlfredJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliOutputMode {
    Human,
    Json,
    AlfredJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliError {
    kind: ErrorKind,
    code: &'static str,
    message: String,
    guidance: Option<&'static str>,
}

impl CliError {
    fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
            guidance: None,
        }
    }

    fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
            guidance: None,
        }
    }

    fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }
}

impl From<OutputModeArg> for CliOutputMode {
    fn from(value: OutputModeArg) -> Self {
        match value {
            OutputModeArg::Human => CliOutputMode::Human,
            OutputModeArg::Json => CliOutputMode::Json,
            OutputModeArg::AlfredJson => CliOutputMode::AlfredJson,
        }
    }
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Today { .. } => "temps.today",
            Commands::Now { .. } => "temps.now",
        }
    }

    fn output_mode_hint(&self) -> CliOutputMode {
        match &self.command {
            Commands::Today { output, json, .. } | Commands::Now { output, json, .. } => {
                if *json {
                    CliOutputMode::Json
                } else if let Some(explicit) = output {
                    (*explicit).into()
                } else {
                    CliOutputMode::Human
                }
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command_name();
    let output_mode = cli.output_mode_hint();
    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(error) => {
            emit_error(command, output_mode, &error);
            std::process::exit(error.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let config = RuntimeConfig::from_env();
    let providers = HttpProviders::new(config.http_timeout_secs)
        .map_err(|error| CliError::runtime(ERROR_CODE_RUNTIME_PROVIDER_INIT, error.to_string()))?;
    let cache = StaleCache::new(&config.cache_dir);
    run_with(cli, &config, &providers, &cache, Utc::now)
}

fn run_with<P, N>(
    cli: Cli,
    config: &RuntimeConfig,
    providers: &P,
    cache: &StaleCache,
    now_fn: N,
) -> Result<String, CliError>
where
    P: ProviderApi,
    N: Fn() -> DateTime<Utc>,
{
    match cli.command {
        Commands::Today { city, output, json } => {
            let output_mode = resolve_output_mode(output, json)?;
            let query = place_query(city.as_deref(), config)?;
            let today = service::today_forecast(providers, cache, now_fn, &query)
                .map_err(report_error)?;
            let rendered = report::render(&today).map_err(|error| {
                CliError::runtime(
                    ERROR_CODE_RUNTIME_SERIALIZE,
                    format!("failed to serialize chart spec: {error}"),
                )
            })?;

            match output_mode {
                CliOutputMode::Human => {
                    Ok(format!("{}\n\nChart: {}", rendered.text, rendered.chart_url))
                }
                CliOutputMode::Json => {
                    let forecast = serde_json::to_value(&today).map_err(serialize_error)?;
                    render_json_envelope(
                        "temps.today",
                        json!({ "forecast": forecast, "chart_url": rendered.chart_url }),
                    )
                }
                CliOutputMode::AlfredJson => render_alfred_today(&today, &rendered),
            }
        }
        Commands::Now { city, output, json } => {
            let output_mode = resolve_output_mode(output, json)?;
            let query = place_query(city.as_deref(), config)?;
            let current = service::current_conditions(providers, &query).map_err(report_error)?;

            match output_mode {
                CliOutputMode::Human => Ok(report::render_current(&current)),
                CliOutputMode::Json => {
                    let result = serde_json::to_value(&current).map_err(serialize_error)?;
                    render_json_envelope("temps.now", result)
                }
                CliOutputMode::AlfredJson => render_alfred_now(&current),
            }
        }
    }
}

fn place_query(city: Option<&str>, config: &RuntimeConfig) -> Result<PlaceQuery, CliError> {
    let chosen = city.or(config.default_city.as_deref());
    PlaceQuery::new(chosen)
        .map_err(|error| CliError::user(ERROR_CODE_USER_INVALID_INPUT, error.to_string()))
}

fn resolve_output_mode(
    output: Option<OutputModeArg>,
    json_flag: bool,
) -> Result<CliOutputMode, CliError> {
    match (output.map(Into::into), json_flag) {
        (Some(mode), true) if mode != CliOutputMode::Json => Err(CliError::user(
            ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
            format!(
                "conflicting output flags: --json requires --output json (got {})",
                output_mode_label(mode)
            ),
        )),
        (Some(mode), _) => Ok(mode),
        (None, true) => Ok(CliOutputMode::Json),
        (None, false) => Ok(CliOutputMode::Human),
    }
}

fn serialize_error(error: serde_json::Error) -> CliError {
    CliError::runtime(
        ERROR_CODE_RUNTIME_SERIALIZE,
        format!("failed to serialize output: {error}"),
    )
}

fn report_error(error: ReportError) -> CliError {
    CliError {
        kind: error.kind(),
        code: error.code(),
        message: error.to_string(),
        guidance: Some(error.guidance()),
    }
}

fn render_json_envelope(command: &str, result: serde_json::Value) -> Result<String, CliError> {
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

fn render_alfred_today(today: &TodayForecast, rendered: &Report) -> Result<String, CliError> {
    let mut items = Vec::with_capacity(today.forecast.samples.len() + 2);
    items.push(json!({
        "title": format!("{} ({})", report::place_label(&today.place), today.place.timezone),
        "subtitle": format!(
            "window={}..{} freshness={} lat={:.4} lon={:.4}",
            today.window.start,
            today.window.end,
            freshness_label(today.freshness),
            today.place.latitude,
            today.place.longitude
        ),
        "arg": report::place_label(&today.place),
        "valid": false,
    }));

    for sample in &today.forecast.samples {
        items.push(json!({
            "title": format!(
                "{} {:.1} {}",
                sample.timestamp, sample.temperature_c, today.forecast.unit
            ),
            "arg": sample.timestamp,
            "valid": false,
        }));
    }

    items.push(json!({
        "title": "Open temperature chart",
        "subtitle": "Rendered by quickchart.io",
        "arg": rendered.chart_url,
        "valid": true,
    }));

    serde_json::to_string(&json!({ "items": items })).map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize Alfred output: {error}"),
        )
    })
}

fn render_alfred_now(current: &CurrentReport) -> Result<String, CliError> {
    let items = vec![
        json!({
            "title": format!(
                "{}, {:.1} {}",
                conditions::summary(current.current.weather_code),
                current.current.temperature_c,
                current.current.temperature_unit
            ),
            "subtitle": format!(
                "{} | humidity {:.0}% | wind {:.1} km/h",
                report::place_label(&current.place),
                current.current.humidity_pct,
                current.current.wind_speed_kmh
            ),
            "arg": format!("{:.1}", current.current.temperature_c),
            "valid": false,
        }),
    ];

    serde_json::to_string(&json!({ "items": items })).map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize Alfred output: {error}"),
        )
    })
}

fn emit_error(command: &str, output_mode: CliOutputMode, error: &CliError) {
    match output_mode {
        CliOutputMode::Json => {
            let payload = json!({
                "schema_version": ENVELOPE_SCHEMA_VERSION,
                "command": command,
                "ok": false,
                "error": {
                    "code": error.code,
                    "message": error.message,
                    "details": {
                        "kind": error_kind_label(error.kind),
                        "exit_code": error.exit_code(),
                        "guidance": error.guidance,
                    }
                }
            });
            let rendered = serde_json::to_string(&payload).unwrap_or_else(|_| {
                format!(
                    "{{\"schema_version\":\"{ENVELOPE_SCHEMA_VERSION}\",\"command\":\"{command}\",\"ok\":false,\"error\":{{\"code\":\"{ERROR_CODE_RUNTIME_SERIALIZE}\",\"message\":\"failed to serialize error envelope\"}}}}"
                )
            });
            println!("{rendered}");
        }
        CliOutputMode::AlfredJson => {
            let subtitle: &str = match error.guidance {
                Some(guidance) => guidance,
                None => &error.message,
            };
            let payload = json!({
                "items": [{
                    "title": format!("Error [{}]", error.code),
                    "subtitle": subtitle,
                    "valid": false
                }]
            });
            let rendered = serde_json::to_string(&payload).unwrap_or_else(|_| {
                "{\"items\":[{\"title\":\"Error\",\"subtitle\":\"failed to serialize error output\",\"valid\":false}]}".to_string()
            });
            println!("{rendered}");
        }
        CliOutputMode::Human => {
            eprintln!("error[{}]: {}", error.code, error.message);
            if let Some(guidance) = error.guidance {
                eprintln!("{guidance}");
            }
        }
    }
}

fn error_kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::User => "user",
        ErrorKind::Runtime => "runtime",
    }
}

fn output_mode_label(mode: CliOutputMode) -> &'static str {
    match mode {
        CliOutputMode::Human => "human",
        CliOutputMode::Json => "json",
        CliOutputMode::AlfredJson => "alfred-json",
    }
}

fn freshness_label(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::Live => "live",
        Freshness::StaleFallback => "stale_fallback",
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Value;

    use super::*;
    use temps_cli::cache::CachedForecast;
    use temps_cli::model::{
        CurrentConditions, ForecastResponse, ForecastSample, Place, TimeWindow,
    };
    use temps_cli::providers::ProviderError;

    struct FakeProviders {
        ip_result: Result<Place, ProviderError>,
        geocode_result: Result<Place, ProviderError>,
        hourly_result: Result<ForecastResponse, ProviderError>,
        current_result: Result<CurrentConditions, ProviderError>,
    }

    impl FakeProviders {
        fn ok() -> Self {
            Self {
                ip_result: Ok(berlin()),
                geocode_result: Ok(berlin()),
                hourly_result: Ok(ForecastResponse {
                    latitude: 52.52,
                    longitude: 13.405,
                    timezone: "Europe/Berlin".to_string(),
                    samples: vec![
                        ForecastSample {
                            timestamp: "2026-03-05T05:00".to_string(),
                            temperature_c: 11.4,
                        },
                        ForecastSample {
                            timestamp: "2026-03-05T06:00".to_string(),
                            temperature_c: 12.1,
                        },
                    ],
                    unit: "°C".to_string(),
                }),
                current_result: Ok(CurrentConditions {
                    time: "2026-03-05T13:45".to_string(),
                    temperature_c: 12.3,
                    humidity_pct: 81.0,
                    weather_code: 3,
                    wind_speed_kmh: 14.2,
                    temperature_unit: "°C".to_string(),
                }),
            }
        }
    }

    impl ProviderApi for FakeProviders {
        fn resolve_ip_location(&self) -> Result<Place, ProviderError> {
            self.ip_result.clone()
        }

        fn geocode_city(&self, _city: &str) -> Result<Place, ProviderError> {
            self.geocode_result.clone()
        }

        fn fetch_hourly_window(
            &self,
            _lat: f64,
            _lon: f64,
            _timezone_id: &str,
            _window: &TimeWindow,
        ) -> Result<ForecastResponse, ProviderError> {
            self.hourly_result.clone()
        }

        fn fetch_current(&self, _lat: f64, _lon: f64) -> Result<CurrentConditions, ProviderError> {
            self.current_result.clone()
        }
    }

    fn berlin() -> Place {
        Place {
            city: "Berlin".to_string(),
            country: "Germany".to_string(),
            latitude: 52.52,
            longitude: 13.405,
            timezone: "Europe/Berlin".to_string(),
        }
    }

    fn config_in(dir: &tempfile::TempDir) -> RuntimeConfig {
        RuntimeConfig {
            cache_dir: dir.path().to_path_buf(),
            http_timeout_secs: 5,
            default_city: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 14, 5, 30)
            .single()
            .expect("time")
    }

    fn run_in_tempdir(cli: Cli, providers: &FakeProviders) -> Result<String, CliError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_in(&dir);
        let cache = StaleCache::new(&config.cache_dir);
        run_with(cli, &config, providers, &cache, fixed_now)
    }

    #[test]
    fn main_outputs_today_json_contract() {
        let cli = Cli::parse_from(["temps-cli", "today", "--json"]);

        let output = run_in_tempdir(cli, &FakeProviders::ok()).expect("today should pass");
        let json: Value = serde_json::from_str(&output).expect("json");

        assert_eq!(
            json.get("schema_version").and_then(Value::as_str),
            Some("v1")
        );
        assert_eq!(
            json.get("command").and_then(Value::as_str),
            Some("temps.today")
        );
        assert_eq!(json.get("ok").and_then(Value::as_bool), Some(true));

        let forecast = json
            .get("result")
            .and_then(|result| result.get("forecast"))
            .expect("forecast");
        assert_eq!(
            forecast
                .get("freshness")
                .and_then(Value::as_str),
            Some("live")
        );
        assert_eq!(
            forecast
                .get("place")
                .and_then(|place| place.get("city"))
                .and_then(Value::as_str),
            Some("Berlin")
        );
        assert!(
            json.get("result")
                .and_then(|result| result.get("chart_url"))
                .and_then(Value::as_str)
                .is_some_and(|url| url.starts_with("https://quickchart.io/chart?c="))
        );
    }

    #[test]
    fn main_outputs_today_text_mode_by_default() {
        let cli = Cli::parse_from(["temps-cli", "today"]);
        let output = run_in_tempdir(cli, &FakeProviders::ok()).expect("text mode");

        assert!(output.contains("# Today's temperature in Berlin, Germany"));
        assert!(output.contains("| 2026-03-05T05:00 | 11.4 °C |"));
        assert!(output.contains("Chart: https://quickchart.io/chart?c="));
    }

    #[test]
    fn main_outputs_alfred_json_mode_when_requested() {
        let cli = Cli::parse_from(["temps-cli", "today", "--output", "alfred-json"]);

        let output = run_in_tempdir(cli, &FakeProviders::ok()).expect("alfred mode");
        let json: Value = serde_json::from_str(&output).expect("json");

        let items = json.get("items").and_then(Value::as_array).expect("items");
        assert_eq!(items.len(), 4);
        assert_eq!(
            items[0].get("title").and_then(Value::as_str),
            Some("Berlin, Germany (Europe/Berlin)")
        );
        assert_eq!(
            items[1].get("title").and_then(Value::as_str),
            Some("2026-03-05T05:00 11.4 °C")
        );
        assert!(
            items[3]
                .get("arg")
                .and_then(Value::as_str)
                .is_some_and(|arg| arg.starts_with("https://quickchart.io/chart?c="))
        );
    }

    #[test]
    fn main_marks_stale_fallback_in_alfred_subtitle() {
        let providers = FakeProviders {
            hourly_result: Err(ProviderError::Transport("timeout".to_string())),
            ..FakeProviders::ok()
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_in(&dir);
        let cache = StaleCache::new(&config.cache_dir);
        cache
            .put(&CachedForecast {
                place: berlin(),
                window: TimeWindow {
                    start: "2026-03-04T05:00".to_string(),
                    end: "2026-03-04T15:00".to_string(),
                },
                forecast: ForecastResponse {
                    latitude: 52.52,
                    longitude: 13.405,
                    timezone: "Europe/Berlin".to_string(),
                    samples: vec![ForecastSample {
                        timestamp: "2026-03-04T05:00".to_string(),
                        temperature_c: 9.0,
                    }],
                    unit: "°C".to_string(),
                },
                fetched_at: "2026-03-04T14:00:00Z".to_string(),
            })
            .expect("seed");

        let cli = Cli::parse_from(["temps-cli", "today", "--output", "alfred-json"]);
        let output =
            run_with(cli, &config, &providers, &cache, fixed_now).expect("stale fallback");
        let json: Value = serde_json::from_str(&output).expect("json");

        let subtitle = json
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("subtitle"))
            .and_then(Value::as_str)
            .expect("subtitle");
        assert!(subtitle.contains("freshness=stale_fallback"));
    }

    #[test]
    fn main_outputs_now_json_contract() {
        let cli = Cli::parse_from(["temps-cli", "now", "--json"]);

        let output = run_in_tempdir(cli, &FakeProviders::ok()).expect("now should pass");
        let json: Value = serde_json::from_str(&output).expect("json");

        assert_eq!(
            json.get("command").and_then(Value::as_str),
            Some("temps.now")
        );
        assert_eq!(
            json.get("result")
                .and_then(|result| result.get("current"))
                .and_then(|current| current.get("weather_code"))
                .and_then(Value::as_i64),
            Some(3)
        );
    }

    #[test]
    fn main_uses_configured_default_city_when_no_flag_given() {
        let cli = Cli::parse_from(["temps-cli", "today"]);
        let providers = FakeProviders {
            // IP derivation must not be reached when a default city is set.
            ip_result: Err(ProviderError::Transport("unexpected".to_string())),
            ..FakeProviders::ok()
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig {
            default_city: Some("Berlin".to_string()),
            ..config_in(&dir)
        };
        let cache = StaleCache::new(&config.cache_dir);

        let output =
            run_with(cli, &config, &providers, &cache, fixed_now).expect("city fallback");
        assert!(output.contains("Berlin, Germany"));
    }

    #[test]
    fn main_rejects_blank_city_as_user_error() {
        let cli = Cli::parse_from(["temps-cli", "today", "--city", "  "]);

        let err = run_in_tempdir(cli, &FakeProviders::ok()).expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::User);
        assert_eq!(err.code, ERROR_CODE_USER_INVALID_INPUT);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn main_rejects_conflicting_json_flags() {
        let cli = Cli::parse_from(["temps-cli", "today", "--json", "--output", "human"]);

        let err = run_in_tempdir(cli, &FakeProviders::ok()).expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::User);
        assert_eq!(err.code, ERROR_CODE_USER_OUTPUT_MODE_CONFLICT);
    }

    #[test]
    fn main_maps_location_failure_to_terminal_error() {
        let providers = FakeProviders {
            ip_result: Err(ProviderError::Rejected("quota exceeded".to_string())),
            ..FakeProviders::ok()
        };
        let cli = Cli::parse_from(["temps-cli", "today", "--json"]);

        let err = run_in_tempdir(cli, &providers).expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.code, "location.unavailable");
        assert_eq!(err.exit_code(), 1);
        assert!(err.guidance.is_some());
    }

    #[test]
    fn main_maps_empty_cache_fetch_failure_to_no_fallback() {
        let providers = FakeProviders {
            hourly_result: Err(ProviderError::Http {
                status: 503,
                message: "down".to_string(),
            }),
            ..FakeProviders::ok()
        };
        let cli = Cli::parse_from(["temps-cli", "today", "--json"]);

        let err = run_in_tempdir(cli, &providers).expect_err("must fail");
        assert_eq!(err.code, "forecast.no_fallback");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn main_help_flag_is_supported() {
        let help = Cli::try_parse_from(["temps-cli", "--help"]).expect_err("help");
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
