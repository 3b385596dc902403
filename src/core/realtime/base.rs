//! Base traits and types for the realtime voice collaborator.
//!
//! The console does not speak the realtime wire protocol itself. It drives an
//! external session object through the [`RealtimeClient`] trait and reacts to
//! the events that object reports.
//!
//! # Audio Format
//!
//! Input and output audio are PCM 16-bit signed little-endian at 24kHz.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use super::items::ConversationItem;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Session Types
// =============================================================================

/// Turn detection mode.
///
/// `Manual` is push-to-talk: the user decides when a turn ends. `ServerVad`
/// lets the provider's voice-activity detector decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TurnDetection {
    #[serde(rename = "none")]
    Manual,
    #[default]
    #[serde(rename = "server_vad")]
    ServerVad,
}

impl TurnDetection {
    /// Parse the mode from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "manual" | "push_to_talk" => Some(Self::Manual),
            "server_vad" | "vad" => Some(Self::ServerVad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "none",
            Self::ServerVad => "server_vad",
        }
    }

    /// Session-update representation: `null` for manual, `{type: server_vad}` otherwise.
    pub fn to_session_value(&self) -> Value {
        match self {
            Self::Manual => Value::Null,
            Self::ServerVad => json!({ "type": "server_vad" }),
        }
    }
}

impl fmt::Display for TurnDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for input audio transcription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputTranscriptionConfig {
    /// Model to use for transcription (e.g., "whisper-1")
    pub model: String,
}

/// Partial session update. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub instructions: Option<String>,
    pub input_audio_transcription: Option<InputTranscriptionConfig>,
    pub turn_detection: Option<TurnDetection>,
}

impl SessionUpdate {
    pub fn instructions(text: impl Into<String>) -> Self {
        Self {
            instructions: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn transcription(model: impl Into<String>) -> Self {
        Self {
            input_audio_transcription: Some(InputTranscriptionConfig {
                model: model.into(),
            }),
            ..Default::default()
        }
    }

    pub fn turn_detection(mode: TurnDetection) -> Self {
        Self {
            turn_detection: Some(mode),
            ..Default::default()
        }
    }

    /// JSON body of the update as the provider expects it.
    pub fn to_json(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(ref instructions) = self.instructions {
            body.insert("instructions".into(), json!(instructions));
        }
        if let Some(ref transcription) = self.input_audio_transcription {
            body.insert(
                "input_audio_transcription".into(),
                json!({ "model": transcription.model }),
            );
        }
        if let Some(mode) = self.turn_detection {
            body.insert("turn_detection".into(), mode.to_session_value());
        }
        Value::Object(body)
    }
}

/// Tool definition for function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: Some(description.to_string()),
                parameters: Some(parameters),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Function definition for tool calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Function call request from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    /// Call ID for the function call
    pub call_id: String,
    /// Function name
    pub name: String,
    /// JSON arguments
    pub arguments: String,
    /// Item ID
    pub item_id: Option<String>,
}

/// Content sent as a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    /// Base64 encoded PCM16
    InputAudio { audio: String },
}

/// Position in the playback stream where the user barged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSampleOffset {
    pub track_id: String,
    pub offset: u64,
}

/// Where the realtime client connects to.
#[derive(Clone, PartialEq, Eq)]
pub enum RealtimeEndpoint {
    /// A local relay server that holds the API key itself.
    Relay { url: String },
    /// Direct connection with a key supplied by the user.
    Direct { api_key: String },
}

impl fmt::Debug for RealtimeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay { url } => f.debug_struct("Relay").field("url", url).finish(),
            Self::Direct { .. } => f
                .debug_struct("Direct")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

// =============================================================================
// Collaborator Trait
// =============================================================================

/// Contract of the external realtime session object.
///
/// Implementations own the websocket and the conversation. The console only
/// issues these calls and mirrors [`conversation_items`](Self::conversation_items)
/// after each update.
#[async_trait]
pub trait RealtimeClient: Send {
    /// Open the realtime connection.
    async fn connect(&mut self) -> RealtimeResult<()>;

    /// Close the realtime connection.
    async fn disconnect(&mut self) -> RealtimeResult<()>;

    /// Check if the connection is open.
    fn is_connected(&self) -> bool;

    /// Apply a partial session update.
    async fn update_session(&mut self, update: SessionUpdate) -> RealtimeResult<()>;

    /// Expose a tool to the model.
    fn add_tool(&mut self, tool: ToolDefinition) -> RealtimeResult<()>;

    /// Add a user message and trigger a response.
    async fn send_user_message_content(&mut self, content: Vec<ContentPart>)
    -> RealtimeResult<()>;

    /// Append captured PCM16 audio to the input buffer.
    async fn append_input_audio(&mut self, audio: Bytes) -> RealtimeResult<()>;

    /// Request the model to generate a response.
    async fn create_response(&mut self) -> RealtimeResult<()>;

    /// Cancel the in-flight response, truncating at the played sample offset.
    async fn cancel_response(&mut self, track_id: &str, sample_offset: u64)
    -> RealtimeResult<()>;

    /// Remove an item from the conversation.
    async fn delete_item(&mut self, item_id: &str) -> RealtimeResult<()>;

    /// Relay a tool result back into the model's context.
    async fn submit_tool_output(&mut self, call_id: &str, output: &str) -> RealtimeResult<()>;

    /// Current turn detection mode of the session.
    fn turn_detection(&self) -> TurnDetection;

    /// Snapshot of the conversation.
    fn conversation_items(&self) -> Vec<ConversationItem>;

    /// Reset the client to its defaults (tools, session, conversation).
    /// Called once when the console is torn down.
    fn reset(&mut self);
}
