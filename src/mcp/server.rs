//! The weather functions, served over MCP
//!
//! Each function takes a single free-text `location` and returns a report.
//! Provider failures come back as error results carrying the provider's
//! message, never as protocol errors or panics.

use crate::weather::{WeatherApiClient, WeatherError};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

/// Input shared by every weather function
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LocationRequest {
    /// The city name or location (e.g., "New York", "London", "Tehran")
    pub location: String,
}

#[derive(Clone)]
pub struct WeatherServer {
    client: WeatherApiClient,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WeatherServer {
    pub fn new(client: WeatherApiClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get current weather and wind for a location: temperature and feels-like temperature in Celsius, condition text (e.g. \"Partly cloudy\"), wind speed in kph, wind direction as a compass point, wind degree, and whether it is day or night.",
        annotations(read_only_hint = true)
    )]
    async fn get_current_weather(
        &self,
        Parameters(request): Parameters<LocationRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(lookup("get_current_weather", request, |location| async move {
            self.client.current_weather(&location).await
        })
        .await)
    }

    #[tool(
        description = "Get current atmospheric conditions for a location: humidity (%), pressure (mb), cloud cover (%), visibility (km), precipitation (mm), UV index and dew point (Celsius).",
        annotations(read_only_hint = true)
    )]
    async fn get_current_atmospheric_conditions(
        &self,
        Parameters(request): Parameters<LocationRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(
            lookup("get_current_atmospheric_conditions", request, |location| async move {
                self.client.atmospheric_conditions(&location).await
            })
            .await,
        )
    }

    #[tool(
        description = "Get today's astronomical data for a location: sunrise and sunset, moonrise and moonset (local time, e.g. \"06:30 AM\"), moon phase, moon illumination (%), and whether the sun and moon are currently up.",
        annotations(read_only_hint = true)
    )]
    async fn get_current_astronomical_data(
        &self,
        Parameters(request): Parameters<LocationRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(
            lookup("get_current_astronomical_data", request, |location| async move {
                self.client.astronomical_data(&location, None).await
            })
            .await,
        )
    }

    #[tool(
        description = "Get current air quality for a location: CO, NO2, O3 and SO2 in µg/m³, PM2.5 and PM10 in µg/m³, the US EPA index (1=Good .. 6=Hazardous) and the UK DEFRA index (1-3 Low, 4-6 Moderate, 7-9 High, 10 Very High).",
        annotations(read_only_hint = true)
    )]
    async fn get_current_air_quality(
        &self,
        Parameters(request): Parameters<LocationRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(lookup("get_current_air_quality", request, |location| async move {
            self.client.air_quality(&location).await
        })
        .await)
    }
}

#[tool_handler]
impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Current weather, atmospheric conditions, astronomy and air quality for any location. \
                 Every function is read-only and takes a single `location`."
                    .into(),
            ),
        }
    }
}

async fn lookup<T, F, Fut>(function: &'static str, request: LocationRequest, fetch: F) -> CallToolResult
where
    T: Serialize,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, WeatherError>>,
{
    let LocationRequest { location } = request;
    let location = location.trim();
    if location.is_empty() {
        return CallToolResult::error(vec![Content::text(
            "Invalid input: location must not be empty",
        )]);
    }
    let location = location.to_string();

    let started = Instant::now();
    let report = fetch(location.clone())
        .await
        .map_err(|e| e.to_string())
        .and_then(|report| {
            serde_json::to_value(report).map_err(|e| format!("Failed to encode report: {e}"))
        });
    tracing::info!(
        function,
        %location,
        success = report.is_ok(),
        duration_ms = %started.elapsed().as_millis(),
        "Weather lookup finished"
    );

    match report {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_default();
            let mut result = CallToolResult::success(vec![Content::text(text)]);
            result.structured_content = Some(value);
            result
        }
        Err(message) => {
            tracing::warn!(function, error = %message, "Weather lookup failed");
            CallToolResult::error(vec![Content::text(message)])
        }
    }
}
