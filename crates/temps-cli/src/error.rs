use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

/// Terminal outcomes of one report generation. `FetchFailed` normally stays
/// internal to the today workflow: it is swallowed into a stale fallback on a
/// cache hit and escalates to `NoFallbackAvailable` on a miss. It surfaces
/// directly only from the instantaneous mode, which has no cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("forecast fetch failed: {0}")]
    FetchFailed(String),
    #[error("forecast fetch failed with no cached fallback: {0}")]
    NoFallbackAvailable(String),
}

impl ReportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::LocationUnavailable(_) => "location.unavailable",
            Self::FetchFailed(_) => "forecast.fetch_failed",
            Self::NoFallbackAvailable(_) => "forecast.no_fallback",
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::LocationUnavailable(_) => {
                "Could not determine a location. Check connectivity and retry, or pass --city."
            }
            Self::FetchFailed(_) => "The forecast service did not answer. Retry in a moment.",
            Self::NoFallbackAvailable(_) => {
                "The forecast service did not answer and nothing is cached yet. Retry in a moment."
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Runtime
    }
}
