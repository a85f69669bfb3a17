//! Holiday aggregation and statistics.
//!
//! Pure functions that turn provider rows into counts: scope filtering with
//! "(observed)" de-duplication, national and regional unique-date counts,
//! and the busiest-dates ranking.

use crate::models::{BusyDay, DayEntry, Scope};
use crate::providers::{CalendarificHoliday, NagerHoliday};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const OBSERVED: &str = "(observed)";

/// Default length of the busiest-dates ranking.
pub const TOP_DAYS_LIMIT: usize = 20;

/// Drop the first "(observed)" marker (any case) and the whitespace before it.
pub fn strip_observed(name: &str) -> String {
    let found = name.char_indices().find(|(i, _)| {
        name.get(*i..*i + OBSERVED.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(OBSERVED))
    });

    match found {
        Some((start, _)) => {
            let head = name[..start].trim_end();
            let tail = &name[start + OBSERVED.len()..];
            format!("{}{}", head, tail)
        }
        None => name.to_string(),
    }
}

/// Count in-scope holidays, treating entries with the same date and the same
/// name (once "(observed)" is stripped) as one.
pub fn count_unique_holidays(holidays: &[CalendarificHoliday], scope: Scope) -> usize {
    holidays
        .iter()
        .filter(|h| scope.includes(&h.types))
        .map(|h| (h.date.as_str(), strip_observed(&h.name)))
        .collect::<HashSet<_>>()
        .len()
}

/// Unique dates of global public holidays.
pub fn national_count(rows: &[NagerHoliday]) -> usize {
    rows.iter()
        .filter(|h| h.is_public() && h.is_global())
        .map(|h| h.date.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Regional holiday statistics of one country.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionalCounts {
    /// Unique dates with at least one regional public holiday.
    pub regional: usize,
    /// Unique dates per upper-cased region code.
    pub per_region: BTreeMap<String, usize>,
}

/// Count regional (non-global) public holidays, overall and per region.
pub fn regional_counts(rows: &[NagerHoliday]) -> RegionalCounts {
    let public: Vec<&NagerHoliday> = rows.iter().filter(|h| h.is_public()).collect();

    let regional = public
        .iter()
        .filter(|h| h.is_regional())
        .map(|h| h.date.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut per_region: HashMap<String, BTreeSet<&str>> = HashMap::new();
    for holiday in public.iter().filter(|h| h.global == Some(false)) {
        for county in holiday.counties.iter().flatten() {
            per_region
                .entry(county.to_uppercase())
                .or_default()
                .insert(holiday.date.as_str());
        }
    }

    RegionalCounts {
        regional,
        per_region: per_region
            .into_iter()
            .map(|(code, dates)| (code, dates.len()))
            .collect(),
    }
}

/// A holiday observed somewhere on a given date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedHoliday {
    pub date: String,
    pub entry: DayEntry,
}

/// Group holidays by date and rank dates by how many entries they carry.
///
/// Ties are broken by the earlier date. Entries without a date are skipped.
pub fn busiest_days<I>(holidays: I, limit: usize) -> Vec<BusyDay>
where
    I: IntoIterator<Item = DatedHoliday>,
{
    let mut by_date: BTreeMap<String, Vec<DayEntry>> = BTreeMap::new();
    for holiday in holidays {
        if holiday.date.is_empty() {
            continue;
        }
        by_date.entry(holiday.date).or_default().push(holiday.entry);
    }

    let mut days: Vec<BusyDay> = by_date
        .into_iter()
        .map(|(date, items)| BusyDay {
            date,
            count: items.len(),
            items,
        })
        .collect();

    days.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.date.cmp(&b.date)));
    days.truncate(limit);
    days
}
