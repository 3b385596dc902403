//! Tool calls exposed to the realtime model.
//!
//! Each tool is a [`ToolHandler`]: a schema-described definition the
//! collaborator advertises to the model, plus an async callback. Handlers
//! return a [`ToolOutcome`] holding the result relayed back to the model and
//! the UI effects the console applies afterwards.
//!
//! # Tools
//!
//! - `set_memory` - save a short note
//! - `get_weather` - current temperature and wind for a coordinate pair
//! - `tool_multitask_api` - forward a question to the automation endpoint
//!   (tracker updates, database queries, chart generation)

mod automation;
mod memory;
mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::realtime::{FunctionCallRequest, ToolDefinition};

pub use automation::{
    DEFAULT_AUTOMATION_BASE_URL, DEFAULT_CHATFLOW_ID, FILE_STORAGE_PREFIX, MULTITASK_TOOL,
    MultitaskTool,
};
pub use memory::{MemoryTool, SET_MEMORY_TOOL};
pub use weather::{
    Coordinates, DEFAULT_WEATHER_BASE_URL, GET_WEATHER_TOOL, Measurement, WeatherTool,
};

/// Errors raised while decoding a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments are not valid JSON or miss required fields
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    /// No handler registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SetMemory {
        key: String,
        value: String,
    },
    GetWeather {
        lat: f64,
        lng: f64,
        location: String,
    },
    MultitaskApi {
        question: String,
    },
    /// Any tool this crate has no typed shape for
    Other {
        name: String,
        arguments: Value,
    },
}

#[derive(Deserialize)]
struct SetMemoryArgs {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct GetWeatherArgs {
    lat: f64,
    lng: f64,
    #[serde(default)]
    location: String,
}

#[derive(Deserialize)]
struct MultitaskArgs {
    question: String,
}

fn decode<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

impl ToolRequest {
    /// Decode the raw name and JSON argument string sent by the model.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let args: Value = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments {
                tool: name.to_string(),
                message: e.to_string(),
            })?
        };

        let request = match name {
            SET_MEMORY_TOOL => {
                let SetMemoryArgs { key, value } = decode(name, args)?;
                Self::SetMemory { key, value }
            }
            GET_WEATHER_TOOL => {
                let GetWeatherArgs { lat, lng, location } = decode(name, args)?;
                Self::GetWeather { lat, lng, location }
            }
            MULTITASK_TOOL => {
                let MultitaskArgs { question } = decode(name, args)?;
                Self::MultitaskApi { question }
            }
            _ => Self::Other {
                name: name.to_string(),
                arguments: args,
            },
        };
        Ok(request)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SetMemory { .. } => SET_MEMORY_TOOL,
            Self::GetWeather { .. } => GET_WEATHER_TOOL,
            Self::MultitaskApi { .. } => MULTITASK_TOOL,
            Self::Other { name, .. } => name,
        }
    }
}

/// Result relayed back into the model's context.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Ack { ok: bool },
    Json(Value),
    Text(String),
}

impl ToolResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Json(json!({ "error": message.into() }))
    }

    /// JSON-encoded output string for the collaborator.
    pub fn to_output(&self) -> String {
        match self {
            Self::Ack { ok } => json!({ "ok": ok }).to_string(),
            Self::Json(value) => value.to_string(),
            Self::Text(text) => Value::String(text.clone()).to_string(),
        }
    }
}

/// UI change requested by a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    SetNote { key: String, value: String },
    SetMarker(Coordinates),
    SetCoords(Coordinates),
    AddChart(String),
    SetImageUrl(String),
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub response: ToolResponse,
    pub effects: Vec<ToolEffect>,
}

impl ToolOutcome {
    pub fn new(response: ToolResponse) -> Self {
        Self {
            response,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: ToolEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Per-call context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Correlation id of the current connection
    pub session_id: String,
}

/// A tool the console exposes to the model.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, request: ToolRequest, ctx: &ToolContext) -> ToolOutcome;
}

/// Where the HTTP-backed tools send their requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEndpoints {
    pub weather_base_url: String,
    pub automation_base_url: String,
    pub chatflow_id: String,
}

impl Default for ToolEndpoints {
    fn default() -> Self {
        Self {
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            automation_base_url: DEFAULT_AUTOMATION_BASE_URL.to_string(),
            chatflow_id: DEFAULT_CHATFLOW_ID.to_string(),
        }
    }
}

/// Capability map of tool handlers keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    order: Vec<String>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `set_memory`, `get_weather` and `tool_multitask_api`.
    pub fn with_defaults(http: reqwest::Client, endpoints: &ToolEndpoints) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MemoryTool));
        registry.register(Arc::new(WeatherTool::new(
            http.clone(),
            &endpoints.weather_base_url,
        )));
        registry.register(Arc::new(MultitaskTool::new(
            http,
            &endpoints.automation_base_url,
            &endpoints.chatflow_id,
        )));
        registry
    }

    /// Add or replace a handler under its definition name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name().to_string();
        if self.handlers.insert(name.clone(), handler).is_none() {
            self.order.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.definition())
            .collect()
    }

    /// Decode and run one model tool call. Failures become error outputs.
    pub async fn dispatch(&self, call: &FunctionCallRequest, ctx: &ToolContext) -> ToolOutcome {
        let request = match ToolRequest::parse(&call.name, &call.arguments) {
            Ok(request) => request,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.call_id, "Rejected tool call: {}", e);
                return ToolOutcome::new(ToolResponse::error(e.to_string()));
            }
        };

        let Some(handler) = self.handlers.get(request.name()) else {
            let err = ToolError::UnknownTool(call.name.clone());
            warn!(call_id = %call.call_id, "{}", err);
            return ToolOutcome::new(ToolResponse::error(err.to_string()));
        };

        debug!(tool = %call.name, call_id = %call.call_id, "Dispatching tool call");
        handler.call(request, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> FunctionCallRequest {
        FunctionCallRequest {
            call_id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
            item_id: None,
        }
    }

    #[test]
    fn test_parse_known_tools() {
        assert_eq!(
            ToolRequest::parse("set_memory", r#"{"key":"TODO","value":"buy milk"}"#).unwrap(),
            ToolRequest::SetMemory {
                key: "TODO".to_string(),
                value: "buy milk".to_string()
            }
        );
        assert_eq!(
            ToolRequest::parse("get_weather", r#"{"lat":1.5,"lng":-2,"location":"X"}"#).unwrap(),
            ToolRequest::GetWeather {
                lat: 1.5,
                lng: -2.0,
                location: "X".to_string()
            }
        );
        assert_eq!(
            ToolRequest::parse("tool_multitask_api", r#"{"question":"top customers"}"#)
                .unwrap()
                .name(),
            "tool_multitask_api"
        );
    }

    #[test]
    fn test_parse_unknown_tool_falls_back() {
        let request = ToolRequest::parse("tool_database_query", r#"{"sqlquery":"SELECT 1"}"#)
            .unwrap();
        match request {
            ToolRequest::Other { name, arguments } => {
                assert_eq!(name, "tool_database_query");
                assert_eq!(arguments["sqlquery"], "SELECT 1");
            }
            other => panic!("Expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(matches!(
            ToolRequest::parse("get_weather", r#"{"lat":"north"}"#),
            Err(ToolError::InvalidArguments { .. })
        ));
        assert!(ToolRequest::parse("set_memory", "not json").is_err());
    }

    #[test]
    fn test_response_outputs() {
        assert_eq!(ToolResponse::Ack { ok: true }.to_output(), r#"{"ok":true}"#);
        assert_eq!(ToolResponse::Text("hi".to_string()).to_output(), r#""hi""#);
        assert!(ToolResponse::error("boom").to_output().contains("boom"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_returns_error_output() {
        let registry = ToolRegistry::new();
        let outcome = registry
            .dispatch(&call("launch_rocket", "{}"), &ToolContext::default())
            .await;
        assert!(outcome.effects.is_empty());
        assert!(outcome.response.to_output().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_dispatch_set_memory() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MemoryTool));
        let outcome = registry
            .dispatch(
                &call("set_memory", r#"{"key":"NAME","value":"Ada"}"#),
                &ToolContext::default(),
            )
            .await;
        assert_eq!(outcome.response, ToolResponse::Ack { ok: true });
        assert_eq!(
            outcome.effects,
            vec![ToolEffect::SetNote {
                key: "NAME".to_string(),
                value: "Ada".to_string()
            }]
        );
    }

    #[test]
    fn test_default_registry_definitions_in_order() {
        let registry = ToolRegistry::with_defaults(reqwest::Client::new(), &ToolEndpoints::default());
        let names: Vec<String> = registry
            .definitions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["set_memory", "get_weather", "tool_multitask_api"]);
    }

    #[test]
    fn test_register_replaces_without_duplicating() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MemoryTool));
        registry.register(Arc::new(MemoryTool));
        assert_eq!(registry.definitions().len(), 1);
        assert!(registry.contains("set_memory"));
    }
}
