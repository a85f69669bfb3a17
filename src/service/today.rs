//! Countries observing a public holiday today.

use super::{dedup_codes, HolidayService, ServiceError};
use crate::fanout::{Completion, FetchError, WorkItem, WorkItems};
use crate::models::TodayReport;
use chrono::Utc;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Only the keys of `totals` matter for the universe.
#[derive(Debug, Deserialize)]
struct UniverseFile {
    #[serde(default)]
    totals: BTreeMap<String, IgnoredAny>,
}

pub fn totals_path(data_dir: &Path, year: i32) -> PathBuf {
    data_dir.join(format!("totals-{}.json", year))
}

/// ISO2 codes listed in `<data_dir>/totals-<year>.json`.
///
/// A missing or unreadable file yields an empty list.
pub fn load_universe(data_dir: &Path, year: i32) -> Vec<String> {
    let path = totals_path(data_dir, year);
    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No totals file for the today universe");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<UniverseFile>(&content) {
        Ok(file) => dedup_codes(file.totals.keys()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed totals file");
            Vec::new()
        }
    }
}

impl HolidayService {
    fn universe(&self, year: i32) -> Vec<String> {
        let key = year.to_string();
        if let Some(codes) = self.caches.universe.get(&key) {
            return codes;
        }

        let codes = load_universe(&self.config.general.data_dir, year);
        if !codes.is_empty() {
            self.caches
                .universe
                .set(&key, codes.clone(), self.config.cache.today_ttl());
        }
        codes
    }

    /// Which countries of the universe have a public holiday today.
    ///
    /// A fresh cached answer is served with its remaining lifetime in
    /// `ttl_seconds`. When the batch hits its deadline the countries
    /// confirmed so far are returned with `ttl_seconds: 0` and nothing is
    /// cached.
    pub async fn today(
        &self,
        year: i32,
        countries: Option<&[String]>,
    ) -> Result<TodayReport, ServiceError> {
        let ttl = self.config.cache.today_ttl();
        let overrides = countries.map(dedup_codes);
        let cache_key = super::cache_key(year, overrides.as_deref());

        if let Some((mut report, age)) = self.caches.today.get_with_age(&cache_key) {
            debug!(year, age_secs = age.as_secs(), "Serving today set from cache");
            report.ttl_seconds = ttl.saturating_sub(age).as_secs();
            report.metrics = None;
            return Ok(report);
        }

        let universe = match overrides {
            Some(codes) => codes,
            None => self.universe(year),
        };
        if universe.is_empty() {
            info!(year, "No countries to check for today");
            return Ok(TodayReport {
                today: Vec::new(),
                year,
                generated_at: Utc::now(),
                ttl_seconds: 0,
                metrics: None,
            });
        }

        let items = WorkItems::from_ids(universe)?;
        let nager = self.nager.clone();
        let result = self
            .aggregator(self.config.today.fanout(), "today")
            .run(items, move |item: WorkItem<()>| {
                let nager = nager.clone();
                async move { Ok::<_, FetchError>(nager.is_today_public_holiday(&item.id).await?) }
            })
            .await;

        let today: Vec<String> = result
            .successes()
            .filter(|(_, is_today)| **is_today)
            .map(|(code, _)| code.to_string())
            .collect();

        let complete = result.completion == Completion::Drained;
        let report = TodayReport {
            today,
            year,
            generated_at: Utc::now(),
            ttl_seconds: if complete { ttl.as_secs() } else { 0 },
            metrics: Some(result.metrics),
        };

        if complete {
            self.caches.today.set(&cache_key, report.clone(), ttl);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{service_with_config, service_with_data, test_config};
    use super::super::ServiceCaches;
    use super::*;
    use crate::models::Report;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_totals(dir: &Path, year: i32, codes: &[&str]) {
        let totals: serde_json::Map<String, serde_json::Value> = codes
            .iter()
            .map(|c| (c.to_string(), json!({"name": c, "national": 10, "regional": 0})))
            .collect();
        let body = json!({"year": year, "updatedAt": "2025-01-01T00:00:00Z", "totals": totals, "regions": {}});
        std::fs::write(totals_path(dir, year), body.to_string()).unwrap();
    }

    async fn mount_today(server: &MockServer, code: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/IsTodayPublicHoliday/{}", code)))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_load_universe() {
        let dir = TempDir::new().unwrap();
        assert!(load_universe(dir.path(), 2025).is_empty());

        write_totals(dir.path(), 2025, &["FR", "AL", "us"]);
        assert_eq!(load_universe(dir.path(), 2025), vec!["AL", "FR", "US"]);

        std::fs::write(totals_path(dir.path(), 2024), "not json").unwrap();
        assert!(load_universe(dir.path(), 2024).is_empty());
    }

    #[tokio::test]
    async fn test_today_set() {
        let server = MockServer::start().await;
        mount_today(&server, "AL", 200).await;
        mount_today(&server, "FR", 204).await;
        mount_today(&server, "US", 500).await;

        let dir = TempDir::new().unwrap();
        write_totals(dir.path(), 2025, &["AL", "FR", "US"]);

        let service = service_with_data(&server.uri(), dir.path(), ServiceCaches::memory());
        let report = service.today(2025, None).await.unwrap();

        assert_eq!(report.today, vec!["AL"]);
        assert_eq!(report.ttl_seconds, 900);
        let metrics = report.metrics.unwrap();
        assert_eq!(metrics.attempted, 3);
        assert_eq!(metrics.succeeded, 2);

        // Served from cache: no second round of requests.
        let cached = service.today(2025, None).await.unwrap();
        assert_eq!(cached.today, vec!["AL"]);
        assert!(cached.ttl_seconds <= 900);
        assert!(cached.metrics.is_none());
    }

    #[tokio::test]
    async fn test_empty_universe() {
        let dir = TempDir::new().unwrap();
        let service = service_with_data("http://127.0.0.1:9", dir.path(), ServiceCaches::disabled());

        let report = service.today(2025, None).await.unwrap();
        assert!(report.today.is_empty());
        assert_eq!(report.ttl_seconds, 0);
        assert_eq!(report.year, 2025);
    }

    #[tokio::test]
    async fn test_country_override_skips_data_file() {
        let server = MockServer::start().await;
        mount_today(&server, "FR", 200).await;

        let dir = TempDir::new().unwrap();
        let service = service_with_data(&server.uri(), dir.path(), ServiceCaches::disabled());
        let codes = vec!["fr".to_string()];

        let report = service.today(2025, Some(codes.as_slice())).await.unwrap();
        assert_eq!(report.today, vec!["FR"]);
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_uncached_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/IsTodayPublicHoliday/AL"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        for code in ["FR", "US"] {
            Mock::given(method("GET"))
                .and(path(format!("/IsTodayPublicHoliday/{}", code)))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&server.uri());
        config.general.data_dir = dir.path().to_path_buf();
        config.today.concurrency = 1;
        config.today.per_item_timeout_ms = 300;
        config.today.overall_timeout_ms = 500;
        let service = service_with_config(config, None, ServiceCaches::memory());
        let codes = vec!["AL".to_string(), "FR".to_string(), "US".to_string()];

        let report = service.today(2025, Some(codes.as_slice())).await.unwrap();
        assert_eq!(report.today, vec!["AL"]);
        assert_eq!(report.ttl_seconds, 0);
        let metrics = report.metrics.unwrap();
        assert_eq!(metrics.attempted, 3);
        assert_eq!(metrics.succeeded, 1);
        assert!(Report::Today(report).is_partial());

        // Nothing was cached, so the next call asks again.
        let again = service.today(2025, Some(codes.as_slice())).await.unwrap();
        assert!(again.metrics.is_some());
        let al_requests = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/IsTodayPublicHoliday/AL")
            .count();
        assert_eq!(al_requests, 2);
    }
}
