//! Simple voice bot.
//!
//! A turn-based alternative to the realtime console: captured audio is
//! transcribed, answered by a chat model and spoken back, each step a plain
//! HTTPS request against an OpenAI-compatible API.
//!
//! ```text
//! Idle ─► Recording ─► Transcribing ─► Thinking ─► Speaking ─► Idle
//! ```

mod bot;
mod config;
mod messages;

use thiserror::Error;

use crate::core::audio::AudioError;

pub use bot::{TurnOutcome, VoiceBot, VoiceBotPhase};
pub use config::{
    ChatModel, DEFAULT_OPENAI_BASE_URL, DEFAULT_SYSTEM_PROMPT, SpeechFormat, SpeechModel,
    TranscriptionModel, Voice, VoiceBotConfig,
};
pub use messages::{ChatMessage, ChatRole};

#[derive(Debug, Error)]
pub enum VoiceBotError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Voice bot is busy ({0:?})")]
    Busy(VoiceBotPhase),

    #[error("No speech detected")]
    NoSpeech,

    #[error("Chat completion returned no choices")]
    EmptyReply,

    #[error("OpenAI API error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl From<reqwest::Error> for VoiceBotError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

pub type VoiceBotResult<T> = Result<T, VoiceBotError>;
