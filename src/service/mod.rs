//! Holiday operations.
//!
//! [`HolidayService`] owns the provider clients, the fan-out settings and the
//! memo caches, and exposes one method per command. Caches are injected so
//! tests can run against [`NullCache`] or a fresh [`MemoryCache`].

pub mod build_totals;
pub mod lookup;
pub mod today;
pub mod top_days;
pub mod totals;

use crate::cache::{Cache, MemoryCache, NullCache};
use crate::cli::YEAR_RANGE;
use crate::config::Config;
use crate::fanout::{AggregateConfig, AggregateError, Aggregator, FetchError};
use crate::models::{CountReport, DetailsReport, TodayReport, TotalsReport};
use crate::providers::{build_http_client, normalize_iso2, CalendarificClient, NagerClient};
use chrono::{Datelike, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by single operations.
///
/// Fan-out batches never produce these for individual countries; a failed
/// country is reported as missing data inside the batch result.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("year {0} is outside 1900..=2100")]
    InvalidYear(i32),

    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("invalid ISO2 country code: {0:?}")]
    InvalidCountry(String),

    #[error("missing CALENDARIFIC_API_KEY (or CALENDARIFIC_KEY)")]
    MissingApiKey,

    #[error("no data source found under {}", .0.display())]
    NoDataSource(PathBuf),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] FetchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data file {}: {source}", path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServiceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Use `year` if given, otherwise the current year.
pub fn resolve_year(year: Option<i32>) -> Result<i32, ServiceError> {
    let year = year.unwrap_or_else(|| Utc::now().year());
    if YEAR_RANGE.contains(&year) {
        Ok(year)
    } else {
        Err(ServiceError::InvalidYear(year))
    }
}

/// Use `month` if given, otherwise the current month.
pub fn resolve_month(month: Option<u32>) -> Result<u32, ServiceError> {
    let month = month.unwrap_or_else(|| Utc::now().month());
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(ServiceError::InvalidMonth(month))
    }
}

pub fn validate_iso2(raw: &str) -> Result<String, ServiceError> {
    normalize_iso2(raw).ok_or_else(|| ServiceError::InvalidCountry(raw.to_string()))
}

/// Pick the Calendarific key: the explicit value, else `CALENDARIFIC_KEY`.
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| std::env::var("CALENDARIFIC_KEY").ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Normalize a country list, dropping invalid codes and repeats.
pub(crate) fn dedup_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    codes
        .into_iter()
        .filter_map(|c| normalize_iso2(c.as_ref()))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Memo key for a year-wide batch, narrowed by a normalized country list.
pub(crate) fn cache_key(year: i32, codes: Option<&[String]>) -> String {
    match codes {
        Some(codes) => format!("{}:{}", year, codes.join(",")),
        None => year.to_string(),
    }
}

/// Memo caches for every cached operation.
#[derive(Clone)]
pub struct ServiceCaches {
    pub totals: Arc<dyn Cache<TotalsReport>>,
    pub today: Arc<dyn Cache<TodayReport>>,
    pub universe: Arc<dyn Cache<Vec<String>>>,
    pub counts: Arc<dyn Cache<CountReport>>,
    pub details: Arc<dyn Cache<DetailsReport>>,
}

impl ServiceCaches {
    /// Process-lifetime in-memory caches.
    pub fn memory() -> Self {
        Self {
            totals: Arc::new(MemoryCache::new()),
            today: Arc::new(MemoryCache::new()),
            universe: Arc::new(MemoryCache::new()),
            counts: Arc::new(MemoryCache::new()),
            details: Arc::new(MemoryCache::new()),
        }
    }

    /// Caches that never hit.
    pub fn disabled() -> Self {
        Self {
            totals: Arc::new(NullCache),
            today: Arc::new(NullCache),
            universe: Arc::new(NullCache),
            counts: Arc::new(NullCache),
            details: Arc::new(NullCache),
        }
    }
}

impl Default for ServiceCaches {
    fn default() -> Self {
        Self::memory()
    }
}

/// Entry point for every holiday operation.
pub struct HolidayService {
    config: Config,
    http: reqwest::Client,
    nager: NagerClient,
    calendarific: Option<CalendarificClient>,
    caches: ServiceCaches,
    show_progress: bool,
}

impl HolidayService {
    /// Build the service and its HTTP clients from `config`.
    pub fn new(
        config: Config,
        api_key: Option<String>,
        caches: ServiceCaches,
    ) -> anyhow::Result<Self> {
        let http = build_http_client(Duration::from_secs(config.providers.request_timeout_seconds))?;
        let nager = NagerClient::new(http.clone(), config.providers.nager_url.as_str());
        let calendarific = api_key.map(|key| {
            CalendarificClient::new(http.clone(), config.providers.calendarific_url.as_str(), key)
        });

        Ok(Self {
            config,
            http,
            nager,
            calendarific,
            caches,
            show_progress: false,
        })
    }

    /// Draw a progress bar during fan-out batches.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn calendarific(&self) -> Result<&CalendarificClient, ServiceError> {
        self.calendarific.as_ref().ok_or(ServiceError::MissingApiKey)
    }

    fn aggregator(&self, config: AggregateConfig, label: &str) -> Aggregator {
        Aggregator::new(config)
            .with_label(label)
            .with_progress(self.show_progress)
    }
}
