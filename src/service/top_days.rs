//! Busiest holiday dates, computed from local data files.
//!
//! Sources are tried in order and the first one present wins:
//!
//! 1. `top-days-<year>.json`, a ready-made ranking
//! 2. `holidays-by-date-<year>.json`, `{ date: [{iso2, country, name}] }`
//! 3. `totals-<year>.json` with per-country holiday lists
//! 4. `countries/<ISO2>/<year>.json`, one holiday array per country

use super::{HolidayService, ServiceError};
use crate::analysis::{busiest_days, DatedHoliday, TOP_DAYS_LIMIT};
use crate::models::{DayEntry, TopDaysReport};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// One row of the by-date file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByDateRow {
    iso2: Option<String>,
    code: Option<String>,
    country_code: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
    name: Option<String>,
    title: Option<String>,
}

/// A holiday as found in hand-built data files.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LooseHoliday {
    date: Option<LooseDate>,
    iso_date: Option<String>,
    on: Option<String>,
    d: Option<String>,
    month: Option<u32>,
    day: Option<u32>,
    name: Option<String>,
    title: Option<String>,
    local_name: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseDate {
    Plain(String),
    Iso { iso: String },
    Other(IgnoredAny),
}

impl LooseHoliday {
    fn date(&self, year: i32) -> Option<String> {
        if let Some(LooseDate::Plain(s)) = &self.date {
            return Some(s.clone());
        }
        self.iso_date
            .clone()
            .or_else(|| self.on.clone())
            .or_else(|| self.d.clone())
            .or_else(|| match &self.date {
                Some(LooseDate::Iso { iso }) => Some(iso.clone()),
                _ => None,
            })
            .or_else(|| match (self.month, self.day) {
                (Some(m), Some(d)) => Some(format!("{}-{:02}-{:02}", year, m, d)),
                _ => None,
            })
    }

    fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| self.local_name.clone())
            .unwrap_or_else(|| "Holiday".to_string())
    }
}

/// A country record of the totals file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountryRecord {
    iso2: Option<String>,
    code: Option<String>,
    country_code: Option<String>,
    id: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
    name: Option<String>,
    holidays: Option<Vec<Lenient<LooseHoliday>>>,
    days: Option<Vec<Lenient<LooseHoliday>>>,
    entries: Option<Vec<Lenient<LooseHoliday>>>,
    items: Option<Vec<Lenient<LooseHoliday>>>,
    list: Option<Vec<Lenient<LooseHoliday>>>,
}

impl CountryRecord {
    fn holidays(self) -> Vec<LooseHoliday> {
        self.holidays
            .or(self.days)
            .or(self.entries)
            .or(self.items)
            .or(self.list)
            .unwrap_or_default()
            .into_iter()
            .map(|Lenient(h)| h)
            .collect()
    }
}

/// Accepted layouts of the totals file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalsLayout {
    Wrapped {
        totals: BTreeMap<String, Lenient<CountryRecord>>,
    },
    Keyed(BTreeMap<String, Lenient<CountryRecord>>),
    Listed(Vec<Lenient<CountryRecord>>),
}

/// A value that falls back to its default when it has another shape.
#[derive(Debug, Default)]
struct Lenient<T>(T);

impl<'de, T: DeserializeOwned + Default> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Lenient(serde_json::from_value(value).unwrap_or_default()))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ServiceError> {
    let content = std::fs::read(path).map_err(|e| ServiceError::io(path, e))?;
    serde_json::from_slice(&content).map_err(|source| ServiceError::DataFile {
        path: path.to_path_buf(),
        source,
    })
}

fn from_by_date(path: &Path) -> Result<Vec<DatedHoliday>, ServiceError> {
    let by_date: BTreeMap<String, Option<Vec<Lenient<ByDateRow>>>> = read_json(path)?;

    let mut out = Vec::new();
    for (date, rows) in by_date {
        for Lenient(row) in rows.unwrap_or_default() {
            let iso2 = row
                .iso2
                .or(row.code)
                .or(row.country_code)
                .unwrap_or_default();
            let country = row
                .country
                .or(row.country_name)
                .or_else(|| row.name.clone())
                .unwrap_or_else(|| iso2.clone());
            let name = row
                .name
                .or(row.title)
                .unwrap_or_else(|| "Holiday".to_string());
            out.push(DatedHoliday {
                date: date.clone(),
                entry: DayEntry { iso2, country, name },
            });
        }
    }
    Ok(out)
}

fn from_totals(path: &Path, year: i32) -> Result<Vec<DatedHoliday>, ServiceError> {
    let records: Vec<(Option<String>, CountryRecord)> = match read_json::<TotalsLayout>(path)? {
        TotalsLayout::Wrapped { totals } | TotalsLayout::Keyed(totals) => totals
            .into_iter()
            .map(|(key, Lenient(record))| (Some(key), record))
            .collect(),
        TotalsLayout::Listed(list) => list.into_iter().map(|Lenient(r)| (None, r)).collect(),
    };

    let mut out = Vec::new();
    for (key, mut record) in records {
        let iso2 = record
            .iso2
            .take()
            .or_else(|| record.code.take())
            .or_else(|| record.country_code.take())
            .or_else(|| record.id.take())
            .or(key)
            .unwrap_or_default();
        let country = record
            .country
            .take()
            .or_else(|| record.country_name.take())
            .or_else(|| record.name.take())
            .unwrap_or_else(|| iso2.clone());

        for holiday in record.holidays() {
            if let Some(date) = holiday.date(year) {
                out.push(DatedHoliday {
                    date,
                    entry: DayEntry {
                        iso2: iso2.clone(),
                        country: country.clone(),
                        name: holiday.display_name(),
                    },
                });
            }
        }
    }
    Ok(out)
}

fn from_country_dirs(dir: &Path, year: i32) -> Result<Vec<DatedHoliday>, ServiceError> {
    let mut codes: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| ServiceError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    codes.sort();

    let mut out = Vec::new();
    for iso2 in codes {
        let path = dir.join(&iso2).join(format!("{}.json", year));
        if !path.exists() {
            continue;
        }
        let holidays: Vec<Lenient<LooseHoliday>> = match read_json(&path) {
            Ok(list) => list,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable country file");
                Vec::new()
            }
        };
        for Lenient(holiday) in holidays {
            if let Some(date) = holiday.date(year) {
                let country = holiday
                    .country
                    .clone()
                    .or_else(|| holiday.country_name.clone())
                    .unwrap_or_else(|| iso2.clone());
                out.push(DatedHoliday {
                    date,
                    entry: DayEntry {
                        iso2: iso2.clone(),
                        country,
                        name: holiday.display_name(),
                    },
                });
            }
        }
    }
    Ok(out)
}

/// Rank the busiest dates of `year` from the files under `data_dir`.
pub fn top_days(data_dir: &Path, year: i32) -> Result<TopDaysReport, ServiceError> {
    let prebuilt = data_dir.join(format!("top-days-{}.json", year));
    if prebuilt.exists() {
        info!(path = %prebuilt.display(), "Serving prebuilt top days");
        return read_json(&prebuilt);
    }

    let by_date = data_dir.join(format!("holidays-by-date-{}.json", year));
    let totals = data_dir.join(format!("totals-{}.json", year));
    let countries = data_dir.join("countries");

    let holidays = if by_date.exists() {
        from_by_date(&by_date)?
    } else if totals.exists() {
        from_totals(&totals, year)?
    } else if countries.is_dir() {
        from_country_dirs(&countries, year)?
    } else {
        return Err(ServiceError::NoDataSource(data_dir.to_path_buf()));
    };

    Ok(TopDaysReport {
        year,
        top: busiest_days(holidays, TOP_DAYS_LIMIT),
    })
}

impl HolidayService {
    pub fn top_days(&self, year: i32) -> Result<TopDaysReport, ServiceError> {
        top_days(&self.config.general.data_dir, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(path: &Path, value: serde_json::Value) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, value.to_string()).unwrap();
    }

    #[test]
    fn test_no_source() {
        let dir = TempDir::new().unwrap();
        let err = top_days(dir.path(), 2025).unwrap_err();
        assert!(matches!(err, ServiceError::NoDataSource(_)));
    }

    #[test]
    fn test_prebuilt_wins() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("top-days-2025.json"),
            json!({"year": 2025, "top": [{"date": "2025-01-01", "count": 99, "items": []}]}),
        );
        write(
            &dir.path().join("holidays-by-date-2025.json"),
            json!({"2025-05-01": [{"iso2": "FR", "country": "France", "name": "Labour Day"}]}),
        );

        let report = top_days(dir.path(), 2025).unwrap();
        assert_eq!(report.top.len(), 1);
        assert_eq!(report.top[0].count, 99);
    }

    #[test]
    fn test_by_date_source() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("holidays-by-date-2025.json"),
            json!({
                "2025-05-01": [
                    {"iso2": "FR", "country": "France", "name": "Labour Day"},
                    {"code": "AL", "title": "Dita e Punës"}
                ],
                "2025-01-01": [{"countryCode": "US", "countryName": "United States", "name": "New Year's Day"}],
                "2025-12-25": null
            }),
        );

        let report = top_days(dir.path(), 2025).unwrap();
        assert_eq!(report.year, 2025);
        assert_eq!(report.top.len(), 2);
        assert_eq!(report.top[0].date, "2025-05-01");
        assert_eq!(report.top[0].count, 2);
        assert_eq!(report.top[0].items[1].iso2, "AL");
        assert_eq!(report.top[0].items[1].country, "AL");
        assert_eq!(report.top[0].items[1].name, "Dita e Punës");
        assert_eq!(report.top[1].items[0].country, "United States");
    }

    #[test]
    fn test_totals_source_with_holiday_lists() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("totals-2025.json"),
            json!({
                "CA": {"name": "Canada", "holidays": [
                    {"date": "2025-07-01", "name": "Canada Day"},
                    {"date": {"iso": "2025-12-25"}, "name": "Christmas Day"}
                ]},
                "FR": {"name": "France", "days": [
                    {"isoDate": "2025-12-25", "localName": "Noël"},
                    {"month": 7, "day": 14, "title": "Fête nationale"}
                ]},
                "XX": 42
            }),
        );

        let report = top_days(dir.path(), 2025).unwrap();
        assert_eq!(report.top[0].date, "2025-12-25");
        assert_eq!(report.top[0].count, 2);
        assert_eq!(report.top[0].items[1].name, "Noël");
        assert_eq!(report.top.len(), 3);
        assert!(report.top.iter().any(|d| d.date == "2025-07-14"));
    }

    #[test]
    fn test_built_totals_file_has_no_lists() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("totals-2025.json"),
            json!({
                "year": 2025,
                "updatedAt": "2025-01-01T00:00:00Z",
                "totals": {"FR": {"name": "France", "national": 11, "regional": 2}},
                "regions": {}
            }),
        );

        let report = top_days(dir.path(), 2025).unwrap();
        assert!(report.top.is_empty());
    }

    #[test]
    fn test_country_dirs_source() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("countries/FR/2025.json"),
            json!([{"date": "2025-01-01", "name": "Jour de l'an"}, {"on": "2025-05-01"}]),
        );
        write(
            &dir.path().join("countries/AL/2025.json"),
            json!([{"d": "2025-01-01", "name": "Viti i Ri", "country": "Albania"}]),
        );
        write(&dir.path().join("countries/US/2024.json"), json!([{"date": "2024-01-01"}]));

        let report = top_days(dir.path(), 2025).unwrap();
        assert_eq!(report.top[0].date, "2025-01-01");
        assert_eq!(report.top[0].count, 2);
        assert_eq!(report.top[0].items[0].country, "Albania");
        assert_eq!(report.top[1].items[0].name, "Holiday");
    }
}
