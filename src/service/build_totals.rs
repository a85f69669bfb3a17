//! Rebuild `totals-<year>.json` from Nager.Date.

use super::today::totals_path;
use super::{HolidayService, ServiceError};
use crate::analysis::{national_count, regional_counts};
use crate::fanout::{WorkItem, WorkItems};
use crate::models::{BuildSummary, BuiltTotal, TotalsFile, TotalsMetrics};
use crate::providers::NagerCountry;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

impl HolidayService {
    /// Fetch every available country's public holidays for `year` and write
    /// national and regional counts to the data directory.
    ///
    /// A country whose request failed keeps its name with both counts null
    /// and an empty region map.
    pub async fn build_totals(&self, year: i32) -> Result<BuildSummary, ServiceError> {
        let available = self.nager.available_countries().await?;

        let mut seen = HashSet::new();
        let countries: Vec<NagerCountry> = available
            .into_iter()
            .filter_map(|c| {
                let code = super::validate_iso2(&c.country_code).ok()?;
                seen.insert(code.clone()).then(|| NagerCountry {
                    country_code: code,
                    name: c.name,
                })
            })
            .collect();
        info!(year, countries = countries.len(), "Building holiday totals");

        let items = WorkItems::try_new(
            countries
                .iter()
                .map(|c| WorkItem::new(c.country_code.clone(), year))
                .collect(),
        )?;

        let nager = self.nager.clone();
        let result = self
            .aggregator(self.config.aggregator.fanout(), "build-totals")
            .run(items, move |item: WorkItem<i32>| {
                let nager = nager.clone();
                async move { nager.public_holidays(item.params, &item.id).await }
            })
            .await;

        if result.is_partial() {
            warn!(year, failed = result.failed(), "Some countries have no counts");
        }

        let mut totals = BTreeMap::new();
        let mut regions = BTreeMap::new();
        for country in &countries {
            let rows = result
                .get(&country.country_code)
                .and_then(|outcome| outcome.value());

            let (national, regional, per_region) = match rows {
                Some(rows) => {
                    let counts = regional_counts(rows);
                    (Some(national_count(rows)), Some(counts.regional), counts.per_region)
                }
                None => (None, None, BTreeMap::new()),
            };

            totals.insert(
                country.country_code.clone(),
                BuiltTotal {
                    name: country.name.clone(),
                    national,
                    regional,
                },
            );
            regions.insert(country.country_code.clone(), per_region);
        }

        let file = TotalsFile {
            year,
            updated_at: Utc::now(),
            totals,
            regions,
        };

        let data_dir = &self.config.general.data_dir;
        std::fs::create_dir_all(data_dir).map_err(|e| ServiceError::io(data_dir, e))?;
        let path = totals_path(data_dir, year);
        let json = serde_json::to_string_pretty(&file).map_err(|source| ServiceError::DataFile {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| ServiceError::io(&path, e))?;
        info!(path = %path.display(), "Wrote totals file");

        Ok(BuildSummary {
            year,
            path,
            countries: countries.len(),
            metrics: TotalsMetrics::from(result.metrics),
            updated_at: file.updated_at,
        })
    }
}
