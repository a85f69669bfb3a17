//! Single-country lookups: monthly count and yearly details.

use super::{HolidayService, ServiceError};
use crate::analysis::count_unique_holidays;
use crate::models::{CountReport, DetailsReport, HolidayDetail, Scope};
use crate::providers::calendarific::HolidayQuery;
use crate::providers::NagerHoliday;
use tracing::debug;

impl From<NagerHoliday> for HolidayDetail {
    fn from(h: NagerHoliday) -> Self {
        let types = h.types_or_public();
        let global = h.is_global();
        Self {
            date: h.date,
            name: h.name,
            local_name: h.local_name,
            types,
            global,
            counties: h.counties,
        }
    }
}

impl HolidayService {
    /// Count in-scope holidays of one country and month.
    ///
    /// `kind` is forwarded to Calendarific as its `type` filter; for the
    /// national scope it defaults to `national` to keep the payload small.
    pub async fn count(
        &self,
        iso2: &str,
        year: i32,
        month: u32,
        scope: Scope,
        kind: Option<&str>,
    ) -> Result<CountReport, ServiceError> {
        let client = self.calendarific()?;

        let kind = kind
            .map(str::to_lowercase)
            .or_else(|| (scope == Scope::National).then(|| "national".to_string()));
        let cache_key = format!(
            "{}-{}-{}-{}-{}",
            iso2,
            year,
            month,
            scope,
            kind.as_deref().unwrap_or("")
        );
        if let Some(report) = self.caches.counts.get(&cache_key) {
            debug!(key = %cache_key, "Serving count from cache");
            return Ok(report);
        }

        let query = HolidayQuery {
            country: iso2.to_string(),
            year,
            month: Some(month),
            kind,
        };
        let parsed = client.holidays(&query).await?;

        let report = CountReport {
            iso2: iso2.to_string(),
            year,
            month,
            scope,
            name: parsed.country_name,
            count: count_unique_holidays(&parsed.holidays, scope),
        };

        self.caches
            .counts
            .set(&cache_key, report.clone(), self.config.cache.lookup_ttl());
        Ok(report)
    }

    /// Every public holiday of one country and year, sorted by date.
    pub async fn details(&self, iso2: &str, year: i32) -> Result<DetailsReport, ServiceError> {
        let cache_key = format!("{}-{}", iso2, year);
        if let Some(report) = self.caches.details.get(&cache_key) {
            debug!(key = %cache_key, "Serving details from cache");
            return Ok(report);
        }

        let rows = self.nager.public_holidays(year, iso2).await?;
        let mut holidays: Vec<HolidayDetail> = rows.into_iter().map(HolidayDetail::from).collect();
        holidays.sort_by(|a, b| a.date.cmp(&b.date));

        let report = DetailsReport {
            iso2: iso2.to_string(),
            year,
            holidays,
        };

        self.caches
            .details
            .set(&cache_key, report.clone(), self.config.cache.lookup_ttl());
        Ok(report)
    }
}
