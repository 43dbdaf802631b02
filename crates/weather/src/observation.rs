//! The weather payload returned to the completion provider and to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use sky_domain::context::Timeframe;

/// A single resolved weather observation.
///
/// `temperature` is the representative value in °C: the live reading for
/// current-day lookups, the rounded mean of the daily max/min otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherObservation {
    pub city: String,
    pub country: String,
    pub temperature: i32,
    pub description: String,
    pub humidity: u8,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub uv_index: f64,
    pub timestamp: DateTime<Utc>,
    pub date_type: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

/// Label for a WMO weather interpretation code.
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 | 63 | 65 => "rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 => "snowfall",
        77 => "snow grains",
        80 | 81 | 82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unknown conditions",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_labels() {
        assert_eq!(describe_weather_code(0), "clear sky");
        assert_eq!(describe_weather_code(63), "rain");
        assert_eq!(describe_weather_code(95), "thunderstorm");
        assert_eq!(describe_weather_code(42), "unknown conditions");
    }

    #[test]
    fn observation_serializes_camel_case() {
        let obs = WeatherObservation {
            city: "Tokyo".into(),
            country: "Japan".into(),
            temperature: 31,
            description: "clear sky".into(),
            humidity: 62,
            wind_speed: 3.4,
            precipitation: 0.0,
            uv_index: 8.5,
            timestamp: Utc::now(),
            date_type: Timeframe::Current,
            target_date: None,
        };
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["dateType"], "current");
        assert_eq!(json["windSpeed"], 3.4);
        assert!(json.get("targetDate").is_none());
    }
}
