//! Data models for the holiday reports.
//!
//! These are the JSON contracts handed to consumers. Field names follow the
//! camelCase convention of the original map front-end.

use crate::fanout::AggregateMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Which holiday types count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// National or federal holidays only
    #[default]
    National,
    /// National, federal, public and bank holidays
    Public,
    /// Every holiday the provider lists
    All,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::National => write!(f, "national"),
            Scope::Public => write!(f, "public"),
            Scope::All => write!(f, "all"),
        }
    }
}

impl Scope {
    /// Whether a holiday with these (any case) types is in scope.
    pub fn includes(&self, types: &[String]) -> bool {
        let joined = types
            .iter()
            .map(|t| t.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let national = joined.contains("national") || joined.contains("federal");
        match self {
            Scope::All => true,
            Scope::Public => national || joined.contains("public") || joined.contains("bank"),
            Scope::National => national,
        }
    }
}

/// Holiday count of one country in the totals report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryTotal {
    pub name: String,
    /// `None` when the provider call failed.
    pub count: Option<usize>,
}

/// Metrics block of the totals report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsMetrics {
    pub countries_attempted: usize,
    pub countries_ok: usize,
    pub duration_ms: u64,
}

impl From<AggregateMetrics> for TotalsMetrics {
    fn from(m: AggregateMetrics) -> Self {
        Self {
            countries_attempted: m.attempted,
            countries_ok: m.succeeded,
            duration_ms: m.elapsed_ms,
        }
    }
}

/// National holiday totals for every country of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsReport {
    pub year: i32,
    pub scope: Scope,
    pub totals: BTreeMap<String, CountryTotal>,
    pub metrics: TotalsMetrics,
    pub updated_at: DateTime<Utc>,
}

/// Countries with a public holiday today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayReport {
    /// Sorted ISO2 codes.
    pub today: Vec<String>,
    pub year: i32,
    pub generated_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AggregateMetrics>,
}

/// Holiday count for one country and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    pub iso2: String,
    pub year: i32,
    pub month: u32,
    pub scope: Scope,
    pub name: Option<String>,
    pub count: usize,
}

/// One holiday in the details report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayDetail {
    pub date: String,
    pub name: Option<String>,
    pub local_name: Option<String>,
    pub types: Vec<String>,
    pub global: bool,
    pub counties: Option<Vec<String>>,
}

/// Full holiday list of one country and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsReport {
    pub iso2: String,
    pub year: i32,
    pub holidays: Vec<HolidayDetail>,
}

/// A country observing a holiday on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub iso2: String,
    pub country: String,
    pub name: String,
}

/// A date and every country observing a holiday on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyDay {
    pub date: String,
    pub count: usize,
    pub items: Vec<DayEntry>,
}

/// Busiest holiday dates of a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopDaysReport {
    pub year: i32,
    pub top: Vec<BusyDay>,
}

/// National and regional counts of one country in the totals data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTotal {
    pub name: String,
    pub national: Option<usize>,
    pub regional: Option<usize>,
}

/// Contents of `totals-<year>.json` as written by `build-totals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsFile {
    pub year: i32,
    pub updated_at: DateTime<Utc>,
    pub totals: BTreeMap<String, BuiltTotal>,
    /// Unique holiday dates per ISO 3166-2 region code, per country.
    pub regions: BTreeMap<String, BTreeMap<String, usize>>,
}

/// What `build-totals` wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub year: i32,
    pub path: PathBuf,
    pub countries: usize,
    pub metrics: TotalsMetrics,
    pub updated_at: DateTime<Utc>,
}

/// Output of any command, serialized as the inner report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Totals(TotalsReport),
    Today(TodayReport),
    Count(CountReport),
    Details(DetailsReport),
    TopDays(TopDaysReport),
    Build(BuildSummary),
}

impl Report {
    /// Whether a fan-out behind this report had failed items.
    pub fn is_partial(&self) -> bool {
        match self {
            Report::Totals(r) => r.metrics.countries_ok < r.metrics.countries_attempted,
            Report::Build(r) => r.metrics.countries_ok < r.metrics.countries_attempted,
            Report::Today(r) => r
                .metrics
                .is_some_and(|m| m.succeeded < m.attempted),
            Report::Count(_) | Report::Details(_) | Report::TopDays(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scope_national() {
        assert!(Scope::National.includes(&types(&["National holiday"])));
        assert!(Scope::National.includes(&types(&["Federal Holiday"])));
        assert!(!Scope::National.includes(&types(&["Bank holiday"])));
        assert!(!Scope::National.includes(&[]));
    }

    #[test]
    fn test_scope_public_and_all() {
        assert!(Scope::Public.includes(&types(&["Bank holiday"])));
        assert!(Scope::Public.includes(&types(&["Public"])));
        assert!(Scope::Public.includes(&types(&["National holiday"])));
        assert!(!Scope::Public.includes(&types(&["Observance"])));
        assert!(Scope::All.includes(&types(&["Observance"])));
        assert!(Scope::All.includes(&[]));
    }

    #[test]
    fn test_totals_report_json_shape() {
        let mut totals = BTreeMap::new();
        totals.insert(
            "FR".to_string(),
            CountryTotal {
                name: "France".to_string(),
                count: Some(11),
            },
        );
        totals.insert(
            "XX".to_string(),
            CountryTotal {
                name: "Nowhere".to_string(),
                count: None,
            },
        );

        let report = TotalsReport {
            year: 2025,
            scope: Scope::National,
            totals,
            metrics: TotalsMetrics {
                countries_attempted: 2,
                countries_ok: 1,
                duration_ms: 12,
            },
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scope"], "national");
        assert_eq!(json["totals"]["FR"]["count"], 11);
        assert!(json["totals"]["XX"]["count"].is_null());
        assert_eq!(json["metrics"]["countriesAttempted"], 2);
        assert_eq!(json["metrics"]["countriesOk"], 1);
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_report_partial() {
        let today = TodayReport {
            today: vec!["AL".to_string()],
            year: 2025,
            generated_at: Utc::now(),
            ttl_seconds: 900,
            metrics: Some(AggregateMetrics {
                attempted: 3,
                succeeded: 2,
                elapsed_ms: 40,
            }),
        };
        assert!(Report::Today(today.clone()).is_partial());

        let cached = TodayReport {
            metrics: None,
            ..today
        };
        assert!(!Report::Today(cached).is_partial());

        let details = DetailsReport {
            iso2: "FR".to_string(),
            year: 2025,
            holidays: Vec::new(),
        };
        let json = serde_json::to_value(Report::Details(details)).unwrap();
        assert_eq!(json["iso2"], "FR");
    }
}
