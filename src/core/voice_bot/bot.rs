use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use super::config::VoiceBotConfig;
use super::messages::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAIErrorResponse,
    SpeechRequest, TranscriptionResponse,
};
use super::{VoiceBotError, VoiceBotResult};
use crate::core::audio::encode_wav;
use crate::core::credentials::CredentialProvider;

/// Where the bot is in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceBotPhase {
    #[default]
    Idle,
    Recording,
    Transcribing,
    Thinking,
    Speaking,
}

/// Result of one spoken exchange.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub transcript: String,
    pub reply: String,
    /// Synthesized reply in the configured speech format
    pub audio: Bytes,
}

/// Record, transcribe, answer and speak, one turn at a time.
pub struct VoiceBot {
    http: Client,
    config: VoiceBotConfig,
    credentials: Arc<dyn CredentialProvider>,
    history: Vec<ChatMessage>,
    phase: VoiceBotPhase,
}

impl VoiceBot {
    pub fn new(
        http: Client,
        config: VoiceBotConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
            history: Vec::new(),
            phase: VoiceBotPhase::Idle,
        }
    }

    pub fn phase(&self) -> VoiceBotPhase {
        self.phase
    }

    /// Previous user and assistant messages, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn config(&self) -> &VoiceBotConfig {
        &self.config
    }

    /// Sample rate of the PCM passed to the next `run_turn`.
    pub fn set_input_sample_rate(&mut self, sample_rate: u32) {
        self.config.input_sample_rate = sample_rate;
    }

    /// Forget the conversation.
    pub fn reset(&mut self) {
        self.history.clear();
        self.phase = VoiceBotPhase::Idle;
    }

    /// Mark the microphone as capturing. Only valid while idle.
    pub fn start_recording(&mut self) -> VoiceBotResult<()> {
        if self.phase != VoiceBotPhase::Idle {
            return Err(VoiceBotError::Busy(self.phase));
        }
        self.phase = VoiceBotPhase::Recording;
        Ok(())
    }

    /// Run one turn over raw PCM16 mono audio.
    pub async fn run_turn(&mut self, pcm: &[u8]) -> VoiceBotResult<TurnOutcome> {
        if matches!(
            self.phase,
            VoiceBotPhase::Transcribing | VoiceBotPhase::Thinking | VoiceBotPhase::Speaking
        ) {
            return Err(VoiceBotError::Busy(self.phase));
        }

        let result = self.pipeline(pcm).await;
        self.phase = VoiceBotPhase::Idle;
        if let Err(ref e) = result {
            warn!("Voice bot turn failed: {}", e);
        }
        result
    }

    async fn pipeline(&mut self, pcm: &[u8]) -> VoiceBotResult<TurnOutcome> {
        let api_key = self
            .credentials
            .api_key()
            .ok_or(VoiceBotError::MissingApiKey)?;

        self.phase = VoiceBotPhase::Transcribing;
        let wav = encode_wav(pcm, self.config.input_sample_rate, 1)?;
        let transcript = self.transcribe(&api_key, wav).await?;
        if transcript.trim().is_empty() {
            return Err(VoiceBotError::NoSpeech);
        }

        self.phase = VoiceBotPhase::Thinking;
        let reply = self.complete(&api_key, &transcript).await?;

        self.phase = VoiceBotPhase::Speaking;
        let audio = self.synthesize(&api_key, &reply).await?;

        self.history.push(ChatMessage::user(transcript.clone()));
        self.history.push(ChatMessage::assistant(reply.clone()));
        info!(
            transcript_len = transcript.len(),
            reply_len = reply.len(),
            audio_bytes = audio.len(),
            "Voice bot turn complete"
        );

        Ok(TurnOutcome {
            transcript,
            reply,
            audio,
        })
    }

    async fn transcribe(&self, api_key: &str, wav: Vec<u8>) -> VoiceBotResult<String> {
        let file = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceBotError::Request(format!("Invalid MIME type: {e}")))?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.config.transcription_model.as_str().to_string());

        let response = self
            .http
            .post(self.config.transcriptions_url())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: TranscriptionResponse = response.json().await?;
        debug!(chars = body.text.len(), "Transcription received");
        Ok(body.text)
    }

    async fn complete(&self, api_key: &str, transcript: &str) -> VoiceBotResult<String> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.config.system_prompt.clone()));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(transcript));

        let request = ChatCompletionRequest {
            model: self.config.chat_model.as_str(),
            messages: &messages,
        };
        let response = self
            .http
            .post(self.config.chat_completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: ChatCompletionResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(VoiceBotError::EmptyReply)
    }

    async fn synthesize(&self, api_key: &str, text: &str) -> VoiceBotResult<Bytes> {
        let request = SpeechRequest {
            model: self.config.speech_model.as_str(),
            input: text,
            voice: self.config.voice.as_str(),
            response_format: self.config.speech_format.as_str(),
        };
        let response = self
            .http
            .post(self.config.speech_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }
}

/// Turn a non-2xx response into a `Provider` error, preferring OpenAI's own
/// error message.
async fn check_status(response: Response) -> VoiceBotResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    };
    Err(VoiceBotError::Provider {
        status: status.as_u16(),
        message,
    })
}
