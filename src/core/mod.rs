pub mod audio;
pub mod console;
pub mod credentials;
pub mod pages;
pub mod realtime;
pub mod text;
pub mod tools;
pub mod voice_bot;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioRecorder, AudioResult, RecorderStatus, StreamPlayer};

pub use console::{
    ChartCarousel, ConsoleError, ConsoleEvent, ConsoleFeatures, ConsoleSession, EventLog,
    RealtimeEvent, SessionPhase,
};

pub use credentials::{
    CredentialError, CredentialProvider, FileCredentialStore, StaticCredentials, resolve_endpoint,
};

pub use realtime::{
    ConversationItem, RealtimeClient, RealtimeEndpoint, RealtimeError, RealtimeResult,
    TurnDetection,
};

pub use tools::{
    ToolContext, ToolEffect, ToolEndpoints, ToolError, ToolHandler, ToolRegistry, ToolRequest,
    ToolResponse,
};

pub use voice_bot::{VoiceBot, VoiceBotConfig, VoiceBotError, VoiceBotResult};
