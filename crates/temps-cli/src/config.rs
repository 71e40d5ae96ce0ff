use std::collections::HashMap;
use std::path::PathBuf;

/// Local hour at which "today so far" starts.
pub const WINDOW_START_HOUR: u32 = 5;

pub const HTTP_TIMEOUT_SECS: u64 = 5;

pub const CACHE_DIR_ENV: &str = "TEMPS_CACHE_DIR";
pub const HTTP_TIMEOUT_SECS_ENV: &str = "TEMPS_HTTP_TIMEOUT_SECS";
pub const DEFAULT_CITY_ENV: &str = "TEMPS_DEFAULT_CITY";
const ALFRED_WORKFLOW_CACHE_ENV: &str = "ALFRED_WORKFLOW_CACHE";
const ALFRED_WORKFLOW_DATA_ENV: &str = "ALFRED_WORKFLOW_DATA";
const HOME_ENV: &str = "HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub cache_dir: PathBuf,
    pub http_timeout_secs: u64,
    /// Fixed fallback city; when set, report generation skips IP derivation.
    pub default_city: Option<String>,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            cache_dir: resolve_cache_dir(&map),
            http_timeout_secs: resolve_http_timeout_secs(&map),
            default_city: resolve_default_city(&map),
        }
    }
}

fn resolve_cache_dir(env_map: &HashMap<String, String>) -> PathBuf {
    let home = env_map.get(HOME_ENV).map(String::as_str);
    env_map
        .get(CACHE_DIR_ENV)
        .or_else(|| env_map.get(ALFRED_WORKFLOW_CACHE_ENV))
        .or_else(|| env_map.get(ALFRED_WORKFLOW_DATA_ENV))
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| expand_home_path(value, home))
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("temps-cli"))
}

fn expand_home_path(raw: &str, home: Option<&str>) -> String {
    let trimmed = raw.trim();
    let Some(home) = home.map(str::trim).filter(|value| !value.is_empty()) else {
        return trimmed.to_string();
    };

    let home = home.trim_end_matches('/');
    let mut expanded = trimmed.replace("$HOME", home);

    if expanded == "~" {
        expanded = home.to_string();
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        expanded = format!("{home}/{rest}");
    }

    expanded
}

fn resolve_http_timeout_secs(env_map: &HashMap<String, String>) -> u64 {
    env_map
        .get(HTTP_TIMEOUT_SECS_ENV)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(HTTP_TIMEOUT_SECS)
}

fn resolve_default_city(env_map: &HashMap<String, String>) -> Option<String> {
    env_map
        .get(DEFAULT_CITY_ENV)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_use_temp_cache_dir() {
        let config = RuntimeConfig::from_pairs(Vec::<(String, String)>::new());
        assert!(config.cache_dir.ends_with("temps-cli"));
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);
        assert_eq!(config.default_city, None);
    }

    #[test]
    fn config_prefers_temps_cache_dir_over_launcher_paths() {
        let config = RuntimeConfig::from_pairs(vec![
            (ALFRED_WORKFLOW_DATA_ENV, "/tmp/alfred-data"),
            (ALFRED_WORKFLOW_CACHE_ENV, "/tmp/alfred-cache"),
            (CACHE_DIR_ENV, "/tmp/temps-cache"),
        ]);

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/temps-cache"));
    }

    #[test]
    fn config_falls_back_to_launcher_cache_path() {
        let config =
            RuntimeConfig::from_pairs(vec![(ALFRED_WORKFLOW_CACHE_ENV, "/tmp/alfred-cache")]);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/alfred-cache"));
    }

    #[test]
    fn config_expands_home_prefix_for_cache_dir() {
        let config = RuntimeConfig::from_pairs(vec![
            (HOME_ENV, "/tmp/home"),
            (CACHE_DIR_ENV, "~/.cache/temps"),
        ]);

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/home/.cache/temps"));
    }

    #[test]
    fn config_supports_timeout_override() {
        let config = RuntimeConfig::from_pairs(vec![(HTTP_TIMEOUT_SECS_ENV, "9")]);
        assert_eq!(config.http_timeout_secs, 9);
    }

    #[test]
    fn config_falls_back_when_timeout_override_invalid() {
        let config = RuntimeConfig::from_pairs(vec![(HTTP_TIMEOUT_SECS_ENV, "abc")]);
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);

        let config = RuntimeConfig::from_pairs(vec![(HTTP_TIMEOUT_SECS_ENV, "0")]);
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn config_filters_blank_default_city() {
        let config = RuntimeConfig::from_pairs(vec![(DEFAULT_CITY_ENV, "   ")]);
        assert_eq!(config.default_city, None);

        let config = RuntimeConfig::from_pairs(vec![(DEFAULT_CITY_ENV, " Taipei ")]);
        assert_eq!(config.default_city, Some("Taipei".to_string()));
    }
}
