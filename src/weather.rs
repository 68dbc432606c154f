//! Weather data functions backed by WeatherAPI.com
//!
//! Each function is one outbound HTTP request plus a response-shape
//! transform into a report the model can read.

mod api;
mod client;
mod reports;

pub use client::{WeatherApiClient, WeatherConfig, DEFAULT_WEATHER_BASE_URL};
pub use reports::{AirQualityReport, AstronomyReport, AtmosphericReport, CurrentWeatherReport};

use thiserror::Error;

/// Errors from the weather provider
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("API key not found (set WEATHER_API_KEY)")]
    MissingApiKey,
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Weather API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to decode weather response: {0}")]
    Decode(String),
}
