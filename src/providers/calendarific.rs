//! Calendarific client.
//!
//! `GET {base}/holidays?api_key&country&year[&month][&type]` returns
//! `{ meta: { code }, response: { holidays: [...] } }`. A `meta.code` other
//! than 200 is treated as an upstream error carrying that code.

use super::get_ok;
use crate::fanout::FetchError;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

/// Upstream `type` values Calendarific accepts as a server-side filter.
pub const UPSTREAM_TYPES: &[&str] = &["national", "local", "religious", "observance"];

/// One holiday, reduced to the fields the counts need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarificHoliday {
    pub name: String,
    /// Lower-cased holiday types, e.g. `["national holiday"]`.
    pub types: Vec<String>,
    /// ISO date (or datetime) string; empty when the entry had none.
    pub date: String,
}

/// Parsed holidays for one country request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarificHolidays {
    pub holidays: Vec<CalendarificHoliday>,
    pub country_name: Option<String>,
}

/// Parameters for one holidays request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayQuery {
    pub country: String,
    pub year: i32,
    pub month: Option<u32>,
    /// Raw upstream `type` filter; ignored unless it is in [`UPSTREAM_TYPES`].
    pub kind: Option<String>,
}

impl HolidayQuery {
    pub fn year(country: impl Into<String>, year: i32) -> Self {
        Self {
            country: country.into(),
            year,
            month: None,
            kind: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    code: Option<u16>,
}

/// Calendarific answers `"response": []` when it has nothing. Any other
/// list in that position carries no holidays either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Holidays {
        #[serde(default)]
        holidays: Vec<RawHoliday>,
        #[serde(default)]
        country: Option<NamedCountry>,
    },
    Empty(Vec<IgnoredAny>),
}

#[derive(Debug, Deserialize)]
struct RawHoliday {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    types: Vec<String>,
    #[serde(default)]
    date: Option<DateShape>,
    #[serde(default)]
    country: Option<NamedCountry>,
}

#[derive(Debug, Deserialize)]
struct NamedCountry {
    #[serde(default)]
    name: Option<String>,
}

/// Accepted shapes of a holiday's `date` field, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateShape {
    /// `{ "iso": "2025-01-01", ... }`
    Iso { iso: String },
    /// `{ "datetime": { "iso": "..." } }` or `{ "datetime": "..." }`
    DateTime { datetime: DateTimeShape },
    /// `"2025-01-01"`
    Plain(String),
    Unrecognized(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateTimeShape {
    Iso { iso: String },
    Plain(String),
    Unrecognized(IgnoredAny),
}

impl DateShape {
    fn into_iso(self) -> String {
        match self {
            DateShape::Iso { iso } => iso,
            DateShape::DateTime {
                datetime: DateTimeShape::Iso { iso },
            } => iso,
            DateShape::DateTime {
                datetime: DateTimeShape::Plain(s),
            } => s,
            DateShape::Plain(s) => s,
            DateShape::DateTime {
                datetime: DateTimeShape::Unrecognized(_),
            }
            | DateShape::Unrecognized(_) => String::new(),
        }
    }
}

impl From<RawHoliday> for CalendarificHoliday {
    fn from(raw: RawHoliday) -> Self {
        Self {
            name: raw.name.unwrap_or_default(),
            types: raw.types.iter().map(|t| t.to_lowercase()).collect(),
            date: raw.date.map(DateShape::into_iso).unwrap_or_default(),
        }
    }
}

/// Parse a holidays response body.
pub fn parse_holidays(body: &[u8]) -> Result<CalendarificHolidays, FetchError> {
    let envelope: Envelope = serde_json::from_slice(body)?;

    let code = envelope.meta.and_then(|m| m.code);
    if code != Some(200) {
        return Err(FetchError::Upstream {
            status: code.unwrap_or(502),
        });
    }

    let (raw, envelope_country) = match envelope.response {
        Some(ResponseBody::Holidays { holidays, country }) => (holidays, country),
        Some(ResponseBody::Empty(entries)) => {
            if !entries.is_empty() {
                debug!(entries = entries.len(), "Ignoring list-shaped response body");
            }
            (Vec::new(), None)
        }
        None => (Vec::new(), None),
    };

    let country_name = raw
        .first()
        .and_then(|h| h.country.as_ref())
        .and_then(|c| c.name.clone())
        .or_else(|| envelope_country.and_then(|c| c.name));

    Ok(CalendarificHolidays {
        holidays: raw.into_iter().map(CalendarificHoliday::from).collect(),
        country_name,
    })
}

/// Calendarific API client.
#[derive(Debug, Clone)]
pub struct CalendarificClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CalendarificClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Fetch holidays for one country and period.
    pub async fn holidays(&self, query: &HolidayQuery) -> Result<CalendarificHolidays, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("country", query.country.clone()),
            ("year", query.year.to_string()),
        ];
        if let Some(month) = query.month {
            params.push(("month", month.to_string()));
        }
        if let Some(kind) = query.kind.as_deref() {
            if UPSTREAM_TYPES.contains(&kind) {
                params.push(("type", kind.to_string()));
            }
        }

        let request = self
            .http
            .get(format!("{}/holidays", self.base_url))
            .query(&params);

        let response = get_ok(request).await?;
        let body = response.bytes().await?;
        parse_holidays(&body)
    }
}
