//! Wire types for the WeatherAPI.com endpoints we call
//!
//! Every field is optional: the provider omits fields for some locations
//! and the reports pass `null` through rather than failing.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiLocation {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCondition {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAirQuality {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    #[serde(rename = "us-epa-index")]
    pub us_epa_index: Option<u8>,
    #[serde(rename = "gb-defra-index")]
    pub gb_defra_index: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCurrent {
    pub temp_c: Option<f64>,
    pub feelslike_c: Option<f64>,
    pub is_day: Option<u8>,
    #[serde(default)]
    pub condition: ApiCondition,
    pub wind_kph: Option<f64>,
    pub wind_dir: Option<String>,
    pub wind_degree: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure_mb: Option<f64>,
    pub cloud: Option<f64>,
    pub vis_km: Option<f64>,
    pub precip_mm: Option<f64>,
    pub uv: Option<f64>,
    pub dewpoint_c: Option<f64>,
    #[serde(default)]
    pub air_quality: ApiAirQuality,
}

/// Body of `current.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub location: ApiLocation,
    #[serde(default)]
    pub current: ApiCurrent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAstro {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub moon_phase: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub moon_illumination: Option<f64>,
    pub is_sun_up: Option<u8>,
    pub is_moon_up: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAstronomy {
    #[serde(default)]
    pub astro: ApiAstro,
}

/// Body of `astronomy.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AstronomyResponse {
    #[serde(default)]
    pub location: ApiLocation,
    #[serde(default)]
    pub astronomy: ApiAstronomy,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[allow(dead_code)] // Part of API response, message is what we surface
    pub code: Option<i64>,
    pub message: String,
}

/// Older API versions send some numeric fields as strings ("45").
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
