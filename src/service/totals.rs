//! National holiday totals for every country.

use super::{dedup_codes, HolidayService, ServiceError};
use crate::analysis::count_unique_holidays;
use crate::fanout::{Completion, FetchError, WorkItem, WorkItems};
use crate::models::{CountryTotal, Scope, TotalsMetrics, TotalsReport};
use crate::providers::calendarific::HolidayQuery;
use crate::providers::{fetch_world_countries, Country};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

impl HolidayService {
    /// Count national holidays of `year` in every country.
    ///
    /// The country universe is the world GeoJSON list, or `countries` when
    /// given (names then fall back to the code). Countries whose request
    /// failed carry `count: null`.
    pub async fn totals(
        &self,
        year: i32,
        countries: Option<&[String]>,
    ) -> Result<TotalsReport, ServiceError> {
        let client = self.calendarific()?.clone();

        let overrides = countries.map(dedup_codes);
        let cache_key = super::cache_key(year, overrides.as_deref());
        if let Some(report) = self.caches.totals.get(&cache_key) {
            debug!(year, "Serving totals from cache");
            return Ok(report);
        }

        let universe: Vec<Country> = match overrides {
            Some(codes) => codes
                .into_iter()
                .map(|code| Country {
                    name: code.clone(),
                    iso2: code,
                })
                .collect(),
            None => fetch_world_countries(&self.http, &self.config.providers.world_geojson_url).await?,
        };
        info!(year, countries = universe.len(), "Collecting national holiday totals");

        let items = WorkItems::try_new(
            universe
                .iter()
                .map(|c| WorkItem::new(c.iso2.clone(), year))
                .collect(),
        )?;

        let result = self
            .aggregator(self.config.aggregator.fanout(), "totals")
            .run(items, move |item: WorkItem<i32>| {
                let client = client.clone();
                async move {
                    let query = HolidayQuery::year(item.id, item.params);
                    let parsed = client.holidays(&query).await?;
                    Ok::<_, FetchError>(count_unique_holidays(&parsed.holidays, Scope::National))
                }
            })
            .await;

        if result.is_partial() {
            warn!(year, failed = result.failed(), "Some countries have no total");
        }
        let complete = result.completion == Completion::Drained;

        let totals: BTreeMap<String, CountryTotal> = universe
            .into_iter()
            .map(|country| {
                let count = result
                    .get(&country.iso2)
                    .and_then(|outcome| outcome.value())
                    .copied();
                (
                    country.iso2,
                    CountryTotal {
                        name: country.name,
                        count,
                    },
                )
            })
            .collect();

        let report = TotalsReport {
            year,
            scope: Scope::National,
            totals,
            metrics: TotalsMetrics::from(result.metrics),
            updated_at: Utc::now(),
        };

        if complete {
            self.caches
                .totals
                .set(&cache_key, report.clone(), self.config.cache.totals_ttl());
        } else {
            debug!(year, "Deadline cut the batch short; not caching totals");
        }
        Ok(report)
    }
}
