//! World country list from a Natural Earth style GeoJSON file.

use super::get_ok;
use crate::fanout::FetchError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Property names that may hold the ISO2 code, in priority order.
const ISO2_KEYS: &[&str] = &["ISO_A2", "iso_a2", "iso2", "cca2"];

/// Property names that may hold the display name, in priority order.
const NAME_KEYS: &[&str] = &["NAME", "ADMIN", "name_long", "name"];

/// Codes the dataset uses for "no code" or disputed territories.
const SKIPPED_CODES: &[&str] = &["-99", "XK"];

/// A country of the aggregation universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub iso2: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

fn first_string(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match props.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Extract `(iso2, name)` pairs from a GeoJSON body.
///
/// Empty and placeholder codes are skipped and a repeated code keeps its
/// first feature.
pub fn parse_world_countries(body: &[u8]) -> Result<Vec<Country>, FetchError> {
    let collection: FeatureCollection = serde_json::from_slice(body)?;
    let mut seen = HashSet::new();
    let mut countries = Vec::new();

    for props in collection.features.into_iter().filter_map(|f| f.properties) {
        let iso2 = first_string(&props, ISO2_KEYS)
            .unwrap_or_default()
            .to_uppercase();
        if iso2.is_empty() || SKIPPED_CODES.contains(&iso2.as_str()) {
            continue;
        }
        if !seen.insert(iso2.clone()) {
            continue;
        }
        let name = first_string(&props, NAME_KEYS).unwrap_or_else(|| "Unknown".to_string());
        countries.push(Country { iso2, name });
    }

    Ok(countries)
}

/// Download and parse the world country list.
pub async fn fetch_world_countries(
    http: &reqwest::Client,
    url: &str,
) -> Result<Vec<Country>, FetchError> {
    let response = get_ok(http.get(url)).await?;
    let body = response.bytes().await?;
    parse_world_countries(&body)
}
