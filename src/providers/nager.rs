//! Nager.Date client (`/api/v3`).

use super::{get_ok, read_json};
use crate::fanout::FetchError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// One entry of `PublicHolidays/{year}/{code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NagerHoliday {
    pub date: String,
    #[serde(default)]
    pub local_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub counties: Option<Vec<String>>,
}

impl NagerHoliday {
    /// Holiday types, defaulting to `Public` when the entry lists none.
    pub fn types_or_public(&self) -> Vec<String> {
        match &self.types {
            Some(types) => types.clone(),
            None => vec!["Public".to_string()],
        }
    }

    pub fn is_public(&self) -> bool {
        self.types_or_public()
            .iter()
            .any(|t| t.to_lowercase().contains("public"))
    }

    pub fn is_global(&self) -> bool {
        self.global == Some(true)
    }

    /// Non-global holidays that name at least one region.
    pub fn is_regional(&self) -> bool {
        self.global == Some(false)
            && self.counties.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// One entry of `AvailableCountries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NagerCountry {
    pub country_code: String,
    pub name: String,
}

/// Interpret an `IsTodayPublicHoliday` answer.
///
/// 200 means yes and 204 means no. A JSON boolean body is honoured when
/// present; any other body is malformed.
pub fn parse_is_today(status: StatusCode, body: &[u8]) -> Result<bool, FetchError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(FetchError::Upstream {
            status: status.as_u16(),
        });
    }

    let text = std::str::from_utf8(body)
        .map_err(|e| FetchError::Malformed(e.to_string()))?
        .trim();
    if text.is_empty() {
        return Ok(true);
    }
    serde_json::from_str::<bool>(text).map_err(FetchError::from)
}

/// Nager.Date API client.
#[derive(Debug, Clone)]
pub struct NagerClient {
    http: reqwest::Client,
    base_url: String,
}

impl NagerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public holidays of one country for one year.
    pub async fn public_holidays(&self, year: i32, code: &str) -> Result<Vec<NagerHoliday>, FetchError> {
        let url = format!("{}/PublicHolidays/{}/{}", self.base_url, year, code);
        let response = get_ok(self.http.get(url)).await?;
        read_json(response).await
    }

    /// Whether today is a public holiday in `code`.
    pub async fn is_today_public_holiday(&self, code: &str) -> Result<bool, FetchError> {
        let url = format!("{}/IsTodayPublicHoliday/{}", self.base_url, code);
        let response = self
            .http
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        parse_is_today(status, &body)
    }

    /// Countries Nager.Date has data for.
    pub async fn available_countries(&self) -> Result<Vec<NagerCountry>, FetchError> {
        let url = format!("{}/AvailableCountries", self.base_url);
        let response = get_ok(self.http.get(url)).await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FailureReason;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_is_today() {
        assert!(parse_is_today(StatusCode::OK, b"").unwrap());
        assert!(parse_is_today(StatusCode::OK, b"true").unwrap());
        assert!(!parse_is_today(StatusCode::OK, b" false\n").unwrap());
        assert!(!parse_is_today(StatusCode::NO_CONTENT, b"").unwrap());

        let err = parse_is_today(StatusCode::NOT_FOUND, b"").unwrap_err();
        assert_eq!(err.reason(), FailureReason::UpstreamError { status: 404 });

        let err = parse_is_today(StatusCode::OK, b"{\"x\":1}").unwrap_err();
        assert_eq!(err.reason(), FailureReason::NetworkError);
    }

    #[test]
    fn test_holiday_classification() {
        let regional: NagerHoliday = serde_json::from_value(json!({
            "date": "2025-03-19",
            "localName": "San José",
            "name": "Saint Joseph's Day",
            "global": false,
            "counties": ["ES-MC", "ES-VC"],
            "types": ["Public"]
        }))
        .unwrap();
        assert!(regional.is_public());
        assert!(regional.is_regional());
        assert!(!regional.is_global());

        let untyped: NagerHoliday = serde_json::from_value(json!({
            "date": "2025-01-01",
            "global": true
        }))
        .unwrap();
        assert!(untyped.is_public());
        assert!(untyped.is_global());
        assert_eq!(untyped.types_or_public(), vec!["Public"]);

        let bank: NagerHoliday = serde_json::from_value(json!({
            "date": "2025-08-25",
            "global": false,
            "counties": [],
            "types": ["Bank"]
        }))
        .unwrap();
        assert!(!bank.is_public());
        assert!(!bank.is_regional());
    }

    #[tokio::test]
    async fn test_client_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PublicHolidays/2025/FR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"date": "2025-07-14", "localName": "Fête nationale", "name": "Bastille Day", "global": true, "types": ["Public"]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/IsTodayPublicHoliday/FR"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/IsTodayPublicHoliday/AL"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/AvailableCountries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"countryCode": "FR", "name": "France"}
            ])))
            .mount(&server)
            .await;

        let client = NagerClient::new(reqwest::Client::new(), server.uri());

        let holidays = client.public_holidays(2025, "FR").await.unwrap();
        assert_eq!(holidays.len(), 1);
        assert_eq!(holidays[0].name.as_deref(), Some("Bastille Day"));

        assert!(!client.is_today_public_holiday("FR").await.unwrap());
        assert!(client.is_today_public_holiday("AL").await.unwrap());

        let countries = client.available_countries().await.unwrap();
        assert_eq!(countries[0].country_code, "FR");
    }
}
