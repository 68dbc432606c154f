//! Report shapes returned by the weather functions

use super::api::{ApiLocation, AstronomyResponse, CurrentResponse};
use serde::Serialize;

/// Resolved location as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInfo {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub localtime: Option<String>,
}

impl From<ApiLocation> for LocationInfo {
    fn from(loc: ApiLocation) -> Self {
        Self {
            name: loc.name,
            region: loc.region,
            country: loc.country,
            localtime: loc.localtime,
        }
    }
}

// ============================================================================
// Current weather
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub condition: Option<String>,
    pub is_day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindSummary {
    pub speed_kph: Option<f64>,
    pub direction: Option<String>,
    pub degree: Option<f64>,
}

/// Temperature, feels-like, wind and condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeatherReport {
    pub location: LocationInfo,
    pub weather: WeatherSummary,
    pub wind: WindSummary,
}

impl From<CurrentResponse> for CurrentWeatherReport {
    fn from(resp: CurrentResponse) -> Self {
        let current = resp.current;
        Self {
            location: resp.location.into(),
            weather: WeatherSummary {
                temperature_c: current.temp_c,
                feels_like_c: current.feelslike_c,
                condition: current.condition.text,
                is_day: current.is_day,
            },
            wind: WindSummary {
                speed_kph: current.wind_kph,
                direction: current.wind_dir,
                degree: current.wind_degree,
            },
        }
    }
}

// ============================================================================
// Atmospheric conditions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtmosphericConditions {
    pub humidity_percent: Option<f64>,
    pub pressure_mb: Option<f64>,
    pub cloudcover_percent: Option<f64>,
    pub visibility_km: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub uv_index: Option<f64>,
    pub dewpoint_c: Option<f64>,
}

/// Humidity, pressure, cloud cover, visibility, precipitation and UV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtmosphericReport {
    pub location: LocationInfo,
    pub atmospheric_conditions: AtmosphericConditions,
}

impl From<CurrentResponse> for AtmosphericReport {
    fn from(resp: CurrentResponse) -> Self {
        let current = resp.current;
        Self {
            location: resp.location.into(),
            atmospheric_conditions: AtmosphericConditions {
                humidity_percent: current.humidity,
                pressure_mb: current.pressure_mb,
                cloudcover_percent: current.cloud,
                visibility_km: current.vis_km,
                precipitation_mm: current.precip_mm,
                uv_index: current.uv,
                dewpoint_c: current.dewpoint_c,
            },
        }
    }
}

// ============================================================================
// Astronomy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunTimes {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub is_sun_up: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoonTimes {
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub phase: Option<String>,
    pub illumination_percent: Option<f64>,
    pub is_moon_up: Option<u8>,
}

/// Sunrise, sunset, moonrise, moonset and moon phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstronomyReport {
    pub location: LocationInfo,
    pub sun: SunTimes,
    pub moon: MoonTimes,
}

impl From<AstronomyResponse> for AstronomyReport {
    fn from(resp: AstronomyResponse) -> Self {
        let astro = resp.astronomy.astro;
        Self {
            location: resp.location.into(),
            sun: SunTimes {
                sunrise: astro.sunrise,
                sunset: astro.sunset,
                is_sun_up: astro.is_sun_up,
            },
            moon: MoonTimes {
                moonrise: astro.moonrise,
                moonset: astro.moonset,
                phase: astro.moon_phase,
                illumination_percent: astro.moon_illumination,
                is_moon_up: astro.is_moon_up,
            },
        }
    }
}

// ============================================================================
// Air quality
// ============================================================================

/// Gas concentrations in µg/m³
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pollutants {
    pub co_carbon_monoxide_ug_m3: Option<f64>,
    pub no2_nitrogen_dioxide_ug_m3: Option<f64>,
    pub o3_ozone_ug_m3: Option<f64>,
    pub so2_sulfur_dioxide_ug_m3: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticulateMatter {
    pub pm2_5_ug_m3: Option<f64>,
    pub pm10_ug_m3: Option<f64>,
}

/// US EPA index is 1-6 (Good..Hazardous); UK DEFRA index is 1-10.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityIndex {
    pub us_epa_index: Option<u8>,
    pub gb_defra_index: Option<u8>,
}

/// CO, NO2, O3, SO2, PM2.5, PM10 and the standardized indices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReport {
    pub location: LocationInfo,
    pub pollutants: Pollutants,
    pub particulate_matter: ParticulateMatter,
    pub air_quality_index: AirQualityIndex,
}

impl From<CurrentResponse> for AirQualityReport {
    fn from(resp: CurrentResponse) -> Self {
        let aq = resp.current.air_quality;
        Self {
            location: resp.location.into(),
            pollutants: Pollutants {
                co_carbon_monoxide_ug_m3: aq.co,
                no2_nitrogen_dioxide_ug_m3: aq.no2,
                o3_ozone_ug_m3: aq.o3,
                so2_sulfur_dioxide_ug_m3: aq.so2,
            },
            particulate_matter: ParticulateMatter {
                pm2_5_ug_m3: aq.pm2_5,
                pm10_ug_m3: aq.pm10,
            },
            air_quality_index: AirQualityIndex {
                us_epa_index: aq.us_epa_index,
                gb_defra_index: aq.gb_defra_index,
            },
        }
    }
}
