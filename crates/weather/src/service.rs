//! The weather lookup service behind the `get_weather` tool.
//!
//! One lookup = resolve coordinates (built-in table, then geocoding
//! provider), classify the requested date, then hit the matching data
//! source: the live-conditions query for the current day, a single-day
//! range against the forecast or archive endpoint otherwise.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use sky_domain::config::WeatherConfig;
use sky_domain::context::Timeframe;
use sky_domain::error::{Error, Result};

use crate::dates::{classify, DateClassification};
use crate::geocode::{builtin_lookup, Coordinates, GeocodingClient};
use crate::observation::{describe_weather_code, WeatherObservation};

/// One completed lookup: the observation plus the coordinates it was
/// resolved against (callers fold the latter into conversational context).
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub observation: WeatherObservation,
    pub coordinates: Coordinates,
}

/// The seam the orchestrator fans out over. Mocked in turn-flow tests.
#[async_trait::async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, location: &str, date: Option<&str>) -> Result<LookupOutcome>;
}

pub struct WeatherService {
    geocoder: GeocodingClient,
    client: reqwest::Client,
    forecast_url: String,
    archive_url: String,
}

impl WeatherService {
    pub fn from_config(cfg: &WeatherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            geocoder: GeocodingClient::new(&cfg.geocoding_url, cfg.timeout_ms)?,
            client,
            forecast_url: cfg.forecast_url.clone(),
            archive_url: cfg.archive_url.clone(),
        })
    }

    async fn resolve_coordinates(&self, location: &str) -> Result<Coordinates> {
        match builtin_lookup(location) {
            Some(hit) => Ok(hit),
            None => self.geocoder.resolve(location).await,
        }
    }

    // ── Current conditions ─────────────────────────────────────────

    async fn fetch_current(&self, coords: &Coordinates) -> Result<WeatherObservation> {
        let resp = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,precipitation,weather_code,wind_speed_10m"
                        .into(),
                ),
                ("daily", "uv_index_max".into()),
                ("forecast_days", "1".into()),
                ("timezone", "auto".into()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "weather endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: CurrentResponse = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        let current = body.current;

        Ok(WeatherObservation {
            city: coords.city.clone(),
            country: coords.country.clone(),
            temperature: current.temperature_2m.round() as i32,
            description: describe_weather_code(current.weather_code).to_string(),
            humidity: current.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
            wind_speed: current.wind_speed_10m,
            precipitation: current.precipitation,
            uv_index: body
                .daily
                .as_ref()
                .and_then(|d| first(&d.uv_index_max))
                .unwrap_or(0.0),
            timestamp: Utc::now(),
            date_type: Timeframe::Current,
            target_date: None,
        })
    }

    // ── Single-day range (forecast or archive) ─────────────────────

    async fn fetch_day(
        &self,
        coords: &Coordinates,
        date_type: Timeframe,
        target: NaiveDate,
    ) -> Result<WeatherObservation> {
        let url = match date_type {
            Timeframe::Historical => &self.archive_url,
            _ => &self.forecast_url,
        };
        let day = target.format("%Y-%m-%d").to_string();

        let resp = self
            .client
            .get(url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,\
                     wind_speed_10m_max,uv_index_max,relative_humidity_2m_mean"
                        .into(),
                ),
                ("start_date", day.clone()),
                ("end_date", day),
                ("timezone", "auto".into()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "weather endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: DailyResponse = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        let daily = body.daily;

        let t_max = first(&daily.temperature_2m_max);
        let t_min = first(&daily.temperature_2m_min);
        let (t_max, t_min) = match (t_max, t_min) {
            (Some(max), Some(min)) => (max, min),
            _ => {
                return Err(Error::Tool {
                    tool: "get_weather".into(),
                    message: format!("no daily temperatures for {target}"),
                })
            }
        };

        Ok(WeatherObservation {
            city: coords.city.clone(),
            country: coords.country.clone(),
            // One representative value for the day.
            temperature: ((t_max + t_min) / 2.0).round() as i32,
            description: daily
                .weather_code
                .first()
                .and_then(|c| *c)
                .map(describe_weather_code)
                .unwrap_or("unknown conditions")
                .to_string(),
            humidity: first(&daily.relative_humidity_2m_mean)
                .map(|h| h.round().clamp(0.0, 100.0) as u8)
                .unwrap_or(0),
            wind_speed: first(&daily.wind_speed_10m_max).unwrap_or(0.0),
            precipitation: first(&daily.precipitation_sum).unwrap_or(0.0),
            uv_index: first(&daily.uv_index_max).unwrap_or(0.0),
            timestamp: Utc::now(),
            date_type,
            target_date: Some(target),
        })
    }
}

#[async_trait::async_trait]
impl WeatherLookup for WeatherService {
    async fn lookup(&self, location: &str, date: Option<&str>) -> Result<LookupOutcome> {
        let coords = self.resolve_coordinates(location).await?;
        let DateClassification {
            date_type,
            target_date,
        } = classify(date, Utc::now().date_naive());

        tracing::debug!(
            city = %coords.city,
            ?date_type,
            target = ?target_date,
            "weather lookup"
        );

        let observation = match target_date {
            None => self.fetch_current(&coords).await?,
            Some(target) => self.fetch_day(&coords, date_type, target).await?,
        };
        Ok(LookupOutcome {
            observation,
            coordinates: coords,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// External JSON is parsed into these typed shapes at the boundary; a
// malformed payload surfaces as a typed HTTP error, not a panic deep in
// the call chain.

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
    #[serde(default)]
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    #[serde(default)]
    precipitation: f64,
    weather_code: u8,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailyBlock,
}

/// Daily arrays are parallel per-day series; a one-day range yields
/// single-element arrays. Fields the archive endpoint doesn't serve
/// default to empty.
#[derive(Debug, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    weather_code: Vec<Option<u8>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    uv_index_max: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m_mean: Vec<Option<f64>>,
}

fn first(series: &[Option<f64>]) -> Option<f64> {
    series.first().copied().flatten()
}
