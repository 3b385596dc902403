//! Realtime voice collaborator contract.
//!
//! The realtime client (websocket session with the voice model) lives outside
//! this crate. This module defines what the console needs from it:
//! - `RealtimeClient` trait for connection, session and conversation control
//! - Conversation item snapshots mirrored into console state
//! - Session update and tool definition types
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian at 24kHz, mono.

mod base;
mod items;

pub use base::{
    ContentPart, FunctionCallRequest, FunctionDefinition, InputTranscriptionConfig,
    RealtimeClient, RealtimeEndpoint, RealtimeError, RealtimeResult, SessionUpdate,
    ToolDefinition, TrackSampleOffset, TurnDetection,
};
pub use items::{
    ConversationItem, FormattedItem, ItemDelta, ItemRole, ItemStatus, ItemType, ToolInvocation,
};

/// Sample rate of realtime audio in both directions.
pub const REALTIME_SAMPLE_RATE: u32 = 24_000;

/// Transcription model requested for user audio.
pub const INPUT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Greeting sent as the first user message after connecting.
pub const GREETING_TEXT: &str = "Hello!";
