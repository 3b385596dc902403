use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ToolContext, ToolEffect, ToolHandler, ToolOutcome, ToolRequest, ToolResponse};
use crate::core::realtime::ToolDefinition;

pub const GET_WEATHER_TOOL: &str = "get_weather";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m";

/// A value with its unit label, e.g. `14.2 °C`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub units: String,
}

/// Map position, optionally annotated with current weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<Measurement>,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            location: None,
            temperature: None,
            wind_speed: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = (!location.is_empty()).then_some(location);
        self
    }
}

impl Default for Coordinates {
    /// San Francisco
    fn default() -> Self {
        Self::new(37.775593, -122.418137)
    }
}

/// Pull `current.<field>` and `current_units.<field>` out of a forecast body.
fn measurement(forecast: &Value, field: &str) -> Option<Measurement> {
    let value = forecast.get("current")?.get(field)?.as_f64()?;
    let units = forecast
        .get("current_units")
        .and_then(|u| u.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(Measurement { value, units })
}

/// Current weather lookup against an Open-Meteo compatible API.
pub struct WeatherTool {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn forecast_url(&self) -> String {
        format!("{}/v1/forecast", self.base_url)
    }

    async fn fetch_forecast(&self, lat: f64, lng: f64) -> Result<Value, reqwest::Error> {
        self.http
            .get(self.forecast_url())
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lng.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            GET_WEATHER_TOOL,
            "Retrieves the weather for a given lat, lng coordinate pair. Specify a label for the location.",
            json!({
                "type": "object",
                "properties": {
                    "lat": { "type": "number", "description": "Latitude" },
                    "lng": { "type": "number", "description": "Longitude" },
                    "location": { "type": "string", "description": "Name of the location" }
                },
                "required": ["lat", "lng", "location"]
            }),
        )
    }

    async fn call(&self, request: ToolRequest, _ctx: &ToolContext) -> ToolOutcome {
        let ToolRequest::GetWeather { lat, lng, location } = request else {
            return ToolOutcome::new(ToolResponse::error(format!(
                "{GET_WEATHER_TOOL} cannot handle {}",
                request.name()
            )));
        };

        let position = Coordinates::new(lat, lng).with_location(location);
        let pending = [
            ToolEffect::SetMarker(position.clone()),
            ToolEffect::SetCoords(position.clone()),
        ];

        let (response, marker) = match self.fetch_forecast(lat, lng).await {
            Ok(forecast) => {
                let marker = Coordinates {
                    temperature: measurement(&forecast, "temperature_2m"),
                    wind_speed: measurement(&forecast, "wind_speed_10m"),
                    ..position
                };
                info!(lat, lng, "Weather lookup completed");
                (ToolResponse::Json(forecast), Some(marker))
            }
            Err(e) => {
                warn!(lat, lng, "Weather lookup failed: {}", e);
                (ToolResponse::error(e.to_string()), None)
            }
        };

        let mut outcome = ToolOutcome::new(response);
        outcome.effects.extend(pending);
        if let Some(marker) = marker {
            outcome.effects.push(ToolEffect::SetMarker(marker));
        }
        outcome
    }
}
