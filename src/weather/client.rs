//! HTTP client for WeatherAPI.com

use super::api::{ApiErrorResponse, AstronomyResponse, CurrentResponse};
use super::reports::{AirQualityReport, AstronomyReport, AtmosphericReport, CurrentWeatherReport};
use super::WeatherError;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Configuration for the weather provider
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Thin client over the two endpoints the weather functions need
#[derive(Clone)]
pub struct WeatherApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `current.json` with air quality enabled
    async fn current(&self, location: &str) -> Result<CurrentResponse, WeatherError> {
        self.get("current.json", &[("q", location), ("aqi", "yes")])
            .await
    }

    /// `astronomy.json` for the given day
    async fn astronomy(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> Result<AstronomyResponse, WeatherError> {
        let dt = date.format("%Y-%m-%d").to_string();
        self.get("astronomy.json", &[("q", location), ("dt", dt.as_str())])
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("{}/{endpoint}", self.base_url);

        tracing::debug!(endpoint, "Weather API request");

        let response = self
            .client
            .get(&url)
            .query(&[("key", key)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))
    }

    pub async fn current_weather(&self, location: &str) -> Result<CurrentWeatherReport, WeatherError> {
        self.current(location).await.map(Into::into)
    }

    pub async fn atmospheric_conditions(
        &self,
        location: &str,
    ) -> Result<AtmosphericReport, WeatherError> {
        self.current(location).await.map(Into::into)
    }

    /// Astronomy for `date`, or the local calendar day when `None`
    pub async fn astronomical_data(
        &self,
        location: &str,
        date: Option<NaiveDate>,
    ) -> Result<AstronomyReport, WeatherError> {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        self.astronomy(location, date).await.map(Into::into)
    }

    pub async fn air_quality(&self, location: &str) -> Result<AirQualityReport, WeatherError> {
        self.current(location).await.map(Into::into)
    }
}
