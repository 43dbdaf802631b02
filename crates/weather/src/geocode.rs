//! Location-name → coordinates resolution.
//!
//! A small built-in table answers for the cities users actually ask about
//! (including their Japanese spellings) without a network round trip; every
//! other name falls through to the geocoding provider.

use serde::Deserialize;

use sky_domain::error::{Error, Result};

/// Resolved coordinates for a place.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Built-in table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct BuiltinCity {
    /// Accepted spellings, matched case-insensitively.
    names: &'static [&'static str],
    city: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
    timezone: &'static str,
}

#[rustfmt::skip]
static BUILTIN: &[BuiltinCity] = &[
    BuiltinCity { names: &["tokyo", "東京"], city: "Tokyo", country: "Japan", latitude: 35.6762, longitude: 139.6503, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["osaka", "大阪"], city: "Osaka", country: "Japan", latitude: 34.6937, longitude: 135.5023, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["kyoto", "京都"], city: "Kyoto", country: "Japan", latitude: 35.0116, longitude: 135.7681, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["sapporo", "札幌"], city: "Sapporo", country: "Japan", latitude: 43.0618, longitude: 141.3545, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["fukuoka", "福岡"], city: "Fukuoka", country: "Japan", latitude: 33.5902, longitude: 130.4017, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["naha", "那覇"], city: "Naha", country: "Japan", latitude: 26.2124, longitude: 127.6809, timezone: "Asia/Tokyo" },
    BuiltinCity { names: &["london", "ロンドン"], city: "London", country: "United Kingdom", latitude: 51.5074, longitude: -0.1278, timezone: "Europe/London" },
    BuiltinCity { names: &["paris", "パリ"], city: "Paris", country: "France", latitude: 48.8566, longitude: 2.3522, timezone: "Europe/Paris" },
    BuiltinCity { names: &["berlin", "ベルリン"], city: "Berlin", country: "Germany", latitude: 52.5200, longitude: 13.4050, timezone: "Europe/Berlin" },
    BuiltinCity { names: &["new york", "ニューヨーク"], city: "New York", country: "United States", latitude: 40.7128, longitude: -74.0060, timezone: "America/New_York" },
    BuiltinCity { names: &["los angeles", "ロサンゼルス"], city: "Los Angeles", country: "United States", latitude: 34.0522, longitude: -118.2437, timezone: "America/Los_Angeles" },
    BuiltinCity { names: &["honolulu", "ホノルル"], city: "Honolulu", country: "United States", latitude: 21.3069, longitude: -157.8583, timezone: "Pacific/Honolulu" },
    BuiltinCity { names: &["sydney", "シドニー"], city: "Sydney", country: "Australia", latitude: -33.8688, longitude: 151.2093, timezone: "Australia/Sydney" },
    BuiltinCity { names: &["singapore", "シンガポール"], city: "Singapore", country: "Singapore", latitude: 1.3521, longitude: 103.8198, timezone: "Asia/Singapore" },
    BuiltinCity { names: &["seoul", "ソウル"], city: "Seoul", country: "South Korea", latitude: 37.5665, longitude: 126.9780, timezone: "Asia/Seoul" },
    BuiltinCity { names: &["beijing", "北京", "ペキン"], city: "Beijing", country: "China", latitude: 39.9042, longitude: 116.4074, timezone: "Asia/Shanghai" },
    BuiltinCity { names: &["shanghai", "上海", "シャンハイ"], city: "Shanghai", country: "China", latitude: 31.2304, longitude: 121.4737, timezone: "Asia/Shanghai" },
    BuiltinCity { names: &["bangkok", "バンコク"], city: "Bangkok", country: "Thailand", latitude: 13.7563, longitude: 100.5018, timezone: "Asia/Bangkok" },
    BuiltinCity { names: &["delhi", "デリー"], city: "Delhi", country: "India", latitude: 28.7041, longitude: 77.1025, timezone: "Asia/Kolkata" },
    BuiltinCity { names: &["mumbai", "ムンバイ"], city: "Mumbai", country: "India", latitude: 19.0760, longitude: 72.8777, timezone: "Asia/Kolkata" },
    BuiltinCity { names: &["varanasi", "バラナシ", "ワーラーナシー"], city: "Varanasi", country: "India", latitude: 25.3176, longitude: 82.9739, timezone: "Asia/Kolkata" },
    BuiltinCity { names: &["moscow", "モスクワ"], city: "Moscow", country: "Russia", latitude: 55.7558, longitude: 37.6173, timezone: "Europe/Moscow" },
];

/// Resolve a name against the built-in table. Case-insensitive, exact match
/// after trimming.
pub fn builtin_lookup(name: &str) -> Option<Coordinates> {
    let needle = name.trim().to_lowercase();
    BUILTIN
        .iter()
        .find(|c| c.names.iter().any(|n| *n == needle))
        .map(|c| Coordinates {
            city: c.city.into(),
            country: c.country.into(),
            latitude: c.latitude,
            longitude: c.longitude,
            timezone: Some(c.timezone.into()),
        })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Geocoding provider fallback
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

/// Client for the geocoding search endpoint.
pub struct GeocodingClient {
    base_url: String,
    client: reqwest::Client,
}

impl GeocodingClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Resolve a free-form place name to coordinates. The top-ranked match
    /// wins; no match is a [`Error::LocationNotFound`].
    pub async fn resolve(&self, name: &str) -> Result<Coordinates> {
        let url = format!("{}/search", self.base_url);
        tracing::debug!(name, "geocoding lookup");

        let resp = self
            .client
            .get(&url)
            .query(&[("name", name), ("count", "1"), ("format", "json")])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "geocoding returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: GeocodingResponse = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        let hit = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::LocationNotFound(name.to_string()))?;

        Ok(Coordinates {
            country: hit
                .country
                .or(hit.country_code)
                .unwrap_or_default(),
            city: hit.name,
            latitude: hit.latitude,
            longitude: hit.longitude,
            timezone: hit.timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_case_insensitive() {
        let hit = builtin_lookup("  TOKYO ").unwrap();
        assert_eq!(hit.city, "Tokyo");
        assert_eq!(hit.country, "Japan");
    }

    #[test]
    fn builtin_accepts_japanese_spellings() {
        let hit = builtin_lookup("東京").unwrap();
        assert_eq!(hit.city, "Tokyo");
        assert_eq!(builtin_lookup("ロンドン").unwrap().city, "London");
    }

    #[test]
    fn unknown_name_misses_builtin() {
        assert!(builtin_lookup("Atlantis").is_none());
    }
}
