//! Upstream holiday-data providers.
//!
//! Each provider wraps one `reqwest::Client` and turns raw responses into
//! typed values. Response bodies are parsed against an explicit set of
//! accepted shapes; anything else is a [`FetchError::Malformed`].

pub mod calendarific;
pub mod nager;
pub mod world;

pub use calendarific::{CalendarificClient, CalendarificHoliday};
pub use nager::{NagerClient, NagerCountry, NagerHoliday};
pub use world::{fetch_world_countries, Country};

use crate::fanout::FetchError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Build the shared HTTP client used by every provider.
pub fn build_http_client(request_timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("holiday-atlas/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Send a GET and hand back the response if its status is a success.
pub(crate) async fn get_ok(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, FetchError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        debug!(url = %response.url(), %status, "Upstream returned an error status");
        return Err(FetchError::Upstream {
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Read the body and parse it into `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Normalize an ISO 3166-1 alpha-2 code: two ASCII letters, upper-cased.
pub fn normalize_iso2(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_iso2() {
        assert_eq!(normalize_iso2("fr"), Some("FR".to_string()));
        assert_eq!(normalize_iso2(" US "), Some("US".to_string()));
        assert_eq!(normalize_iso2("USA"), None);
        assert_eq!(normalize_iso2("-9"), None);
        assert_eq!(normalize_iso2(""), None);
    }
}
