//! Console session state machine.
//!
//! [`ConsoleSession`] owns the console's view of one realtime conversation.
//! It drives the realtime collaborator and both audio devices through the
//! connect, push-to-talk and disconnect lifecycle, folds collaborator
//! callbacks into console state and dispatches tool calls.
//!
//! ```text
//! Disconnected ──connect──► Connecting ──ok──► Connected(Idle)
//!      ▲                        │                 │  ▲
//!      │                        └──error──────────┤  │ conversation.updated
//!      │                                          ▼  │
//!      └──────disconnect / error───── Connected(Recording ─► AwaitingResponse)
//! ```
//!
//! Failures of any external call are logged, flip the connected flag and are
//! returned to the caller. Nothing is retried.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::charts::ChartCarousel;
use super::event_log::{EventLog, RealtimeEvent, format_elapsed};
use super::view::{ConsoleFeatures, ConsoleView};
use crate::core::audio::{AudioError, AudioRecorder, AudioSink, RecorderStatus, StreamPlayer, encode_wav};
use crate::core::realtime::{
    ContentPart, ConversationItem, FunctionCallRequest, GREETING_TEXT, INPUT_TRANSCRIPTION_MODEL,
    ItemDelta, REALTIME_SAMPLE_RATE, RealtimeClient, RealtimeError, SessionUpdate, TurnDetection,
};
use crate::core::text::{escape_html, format_text};
use crate::core::tools::{Coordinates, ToolContext, ToolEffect, ToolRegistry};

/// How long the voice indicator stays lit after the last audio delta.
pub const VOICE_ACTIVITY_WINDOW: Duration = Duration::from_secs(2);

/// Errors surfaced by console operations.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Sub-state while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectedPhase {
    Idle,
    Recording,
    AwaitingResponse,
}

/// Coarse lifecycle state of a console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected(ConnectedPhase),
}

/// Callbacks delivered by the realtime collaborator.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    /// Raw client or server event for the log
    Realtime(RealtimeEvent),
    /// Collaborator reported an error
    Error(Value),
    /// The user started speaking over the assistant
    ConversationInterrupted,
    /// An item changed
    ConversationUpdated {
        item: ConversationItem,
        delta: Option<ItemDelta>,
    },
    /// The model called a tool
    ToolCall(FunctionCallRequest),
}

/// One realtime conversation as seen by the console.
pub struct ConsoleSession<R, M, P> {
    client: R,
    recorder: M,
    player: P,
    tools: ToolRegistry,
    features: ConsoleFeatures,
    view: ConsoleView,

    connected: bool,
    connecting: bool,
    recording: bool,
    awaiting_response: bool,
    turn_detection: TurnDetection,

    items: Vec<ConversationItem>,
    events: EventLog,
    notes: BTreeMap<String, String>,
    coords: Coordinates,
    marker: Option<Coordinates>,
    charts: ChartCarousel,
    image_url: Option<String>,

    session_id: String,
    start_time: OffsetDateTime,
    last_voice_activity: Option<Instant>,

    audio_tx: AudioSink,
    audio_rx: mpsc::UnboundedReceiver<Bytes>,
}

impl<R, M, P> ConsoleSession<R, M, P>
where
    R: RealtimeClient,
    M: AudioRecorder,
    P: StreamPlayer,
{
    pub fn new(
        client: R,
        recorder: M,
        player: P,
        tools: ToolRegistry,
        features: ConsoleFeatures,
    ) -> Self {
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        Self {
            client,
            recorder,
            player,
            tools,
            features,
            view: ConsoleView::default(),
            connected: false,
            connecting: false,
            recording: false,
            awaiting_response: false,
            turn_detection: TurnDetection::ServerVad,
            items: Vec::new(),
            events: EventLog::new(),
            notes: BTreeMap::new(),
            coords: Coordinates::default(),
            marker: None,
            charts: ChartCarousel::new(),
            image_url: None,
            session_id: String::new(),
            start_time: OffsetDateTime::now_utc(),
            last_voice_activity: None,
            audio_tx,
            audio_rx,
        }
    }

    /// Configure the collaborator: instructions, transcription, server VAD
    /// and the registered tools.
    pub async fn install(&mut self) -> Result<(), ConsoleError> {
        let instructions = self.features.instructions.clone();
        self.client
            .update_session(SessionUpdate::instructions(instructions))
            .await?;
        self.client
            .update_session(SessionUpdate::transcription(INPUT_TRANSCRIPTION_MODEL))
            .await?;
        self.client
            .update_session(SessionUpdate::turn_detection(TurnDetection::ServerVad))
            .await?;
        self.turn_detection = TurnDetection::ServerVad;

        for definition in self.tools.definitions() {
            debug!(tool = %definition.name(), "Registering tool");
            self.client.add_tool(definition)?;
        }
        Ok(())
    }

    /// Acquire the devices, open the realtime connection and greet the model.
    pub async fn connect(&mut self) -> Result<(), ConsoleError> {
        if self.connected {
            return Ok(());
        }

        self.start_time = OffsetDateTime::now_utc();
        self.items.clear();
        self.events.clear();
        self.session_id = Uuid::new_v4().to_string();
        self.connecting = true;
        info!(session_id = %self.session_id, "Connecting console session");

        let result = self.open().await;
        self.connecting = false;
        if let Err(e) = result {
            return Err(self.fail("connect", e));
        }
        Ok(())
    }

    async fn open(&mut self) -> Result<(), ConsoleError> {
        self.recorder.begin().await?;
        self.player.connect().await?;
        self.client.connect().await?;
        self.connected = true;
        self.items = self.client.conversation_items();

        let settle = Duration::from_millis(self.features.settle_delay_ms);
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        // The connection may have dropped while settling
        if !self.client.is_connected() {
            return Err(RealtimeError::NotConnected.into());
        }

        self.client
            .send_user_message_content(vec![ContentPart::InputText {
                text: GREETING_TEXT.to_string(),
            }])
            .await?;

        if self.client.turn_detection() == TurnDetection::ServerVad {
            self.recorder.record(self.audio_tx.clone()).await?;
        }
        info!(session_id = %self.session_id, "Console session connected");
        Ok(())
    }

    /// Tear down the connection and reset per-connection state.
    ///
    /// Teardown failures are logged and do not stop the remaining steps.
    pub async fn disconnect(&mut self) {
        self.connected = false;
        self.connecting = false;
        self.recording = false;
        self.awaiting_response = false;
        self.last_voice_activity = None;

        self.events.clear();
        self.items.clear();
        self.coords = Coordinates::default();
        self.marker = None;
        if !self.features.persist_notes {
            self.notes.clear();
        }
        if !self.features.persist_charts {
            self.charts.clear();
            self.image_url = None;
        }
        self.view.collapse_all();

        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to close realtime connection: {}", e);
        }
        if let Err(e) = self.recorder.end().await {
            warn!("Failed to release microphone: {}", e);
        }
        if let Err(e) = self.player.interrupt().await {
            warn!("Failed to stop playback: {}", e);
        }
        while self.audio_rx.try_recv().is_ok() {}

        info!(session_id = %self.session_id, "Console session disconnected");
    }

    /// Disconnect and return the realtime client to its defaults. Tools and
    /// session settings must be installed again before the next connect.
    pub async fn teardown(&mut self) {
        self.disconnect().await;
        self.client.reset();
        debug!(session_id = %self.session_id, "Realtime client reset");
    }

    /// Push-to-talk pressed.
    pub async fn start_recording(&mut self) -> Result<(), ConsoleError> {
        self.recording = true;
        self.awaiting_response = false;

        if !self.client.is_connected() {
            warn!("Cannot start recording: realtime client is not connected");
            return Ok(());
        }

        let result = self.barge_in_and_record().await;
        result.map_err(|e| self.fail("start recording", e))
    }

    async fn barge_in_and_record(&mut self) -> Result<(), ConsoleError> {
        if let Some(offset) = self.player.interrupt().await? {
            self.client
                .cancel_response(&offset.track_id, offset.offset)
                .await?;
        }
        self.recorder.record(self.audio_tx.clone()).await?;
        Ok(())
    }

    /// Push-to-talk released.
    pub async fn stop_recording(&mut self) -> Result<(), ConsoleError> {
        self.recording = false;
        self.awaiting_response = true;

        let result = self.pause_and_respond().await;
        result.map_err(|e| self.fail("stop recording", e))
    }

    async fn pause_and_respond(&mut self) -> Result<(), ConsoleError> {
        if self.recorder.status() == RecorderStatus::Recording {
            self.recorder.pause().await?;
        }
        if self.client.is_connected() {
            self.client.create_response().await?;
        } else {
            warn!("Cannot request a response: realtime client is not connected");
        }
        Ok(())
    }

    /// Switch between push-to-talk and server VAD.
    pub async fn change_turn_end_type(&mut self, mode: TurnDetection) -> Result<(), ConsoleError> {
        let result = self.apply_turn_detection(mode).await;
        result.map_err(|e| self.fail("change turn detection", e))
    }

    async fn apply_turn_detection(&mut self, mode: TurnDetection) -> Result<(), ConsoleError> {
        if mode == TurnDetection::Manual && self.recorder.status() == RecorderStatus::Recording {
            self.recorder.pause().await?;
        }
        self.client
            .update_session(SessionUpdate::turn_detection(mode))
            .await?;
        if mode == TurnDetection::ServerVad && self.client.is_connected() {
            self.recorder.record(self.audio_tx.clone()).await?;
        }
        self.turn_detection = mode;
        info!(turn_detection = %mode, "Turn detection changed");
        Ok(())
    }

    pub async fn delete_conversation_item(&mut self, item_id: &str) -> Result<(), ConsoleError> {
        let result = self.client.delete_item(item_id).await;
        result.map_err(|e| self.fail("delete item", e.into()))
    }

    /// Fold one collaborator callback into console state.
    pub async fn handle_event(&mut self, event: ConsoleEvent) -> Result<(), ConsoleError> {
        match event {
            ConsoleEvent::Realtime(record) => {
                self.events.push(record);
                Ok(())
            }
            ConsoleEvent::Error(payload) => {
                error!(error = %payload, "Realtime client error");
                self.connected = false;
                Ok(())
            }
            ConsoleEvent::ConversationInterrupted => {
                let result = self.barge_in().await;
                result.map_err(|e| self.fail("interrupt", e))
            }
            ConsoleEvent::ConversationUpdated { item, delta } => {
                let result = self.on_conversation_updated(&item, delta);
                result.map_err(|e| self.fail("conversation update", e))
            }
            ConsoleEvent::ToolCall(call) => {
                let result = self.run_tool(call).await;
                result.map_err(|e| self.fail("tool call", e))
            }
        }
    }

    async fn barge_in(&mut self) -> Result<(), ConsoleError> {
        if let Some(offset) = self.player.interrupt().await? {
            self.client
                .cancel_response(&offset.track_id, offset.offset)
                .await?;
        }
        Ok(())
    }

    fn on_conversation_updated(
        &mut self,
        item: &ConversationItem,
        delta: Option<ItemDelta>,
    ) -> Result<(), ConsoleError> {
        if let Some(audio) = delta.and_then(|d| d.audio) {
            self.player.add_16bit_pcm(audio, &item.id)?;
            self.last_voice_activity = Some(Instant::now());
        }

        let mut files: HashMap<String, Bytes> = self
            .items
            .drain(..)
            .filter_map(|i| i.formatted.file.map(|file| (i.id, file)))
            .collect();

        let mut items = self.client.conversation_items();
        for snapshot in &mut items {
            if snapshot.formatted.file.is_some() {
                continue;
            }
            if let Some(file) = files.remove(&snapshot.id) {
                snapshot.formatted.file = Some(file);
            } else if snapshot.is_completed() && !snapshot.formatted.audio.is_empty() {
                let wav = encode_wav(&snapshot.formatted.audio, REALTIME_SAMPLE_RATE, 1)?;
                snapshot.formatted.file = Some(Bytes::from(wav));
            }
        }
        self.items = items;
        self.awaiting_response = false;
        Ok(())
    }

    async fn run_tool(&mut self, call: FunctionCallRequest) -> Result<(), ConsoleError> {
        let ctx = ToolContext {
            session_id: self.session_id.clone(),
        };
        let outcome = self.tools.dispatch(&call, &ctx).await;
        for effect in outcome.effects {
            self.apply_effect(effect);
        }
        self.client
            .submit_tool_output(&call.call_id, &outcome.response.to_output())
            .await?;
        Ok(())
    }

    fn apply_effect(&mut self, effect: ToolEffect) {
        match effect {
            ToolEffect::SetNote { key, value } => {
                self.notes.insert(key, value);
            }
            ToolEffect::SetMarker(marker) => self.marker = Some(marker),
            ToolEffect::SetCoords(coords) => self.coords = coords,
            ToolEffect::AddChart(url) => self.charts.add_chart(url),
            ToolEffect::SetImageUrl(url) => self.image_url = Some(url),
        }
    }

    /// Drain captured microphone chunks into the realtime input buffer.
    ///
    /// Chunks captured while disconnected are dropped. Returns how many
    /// chunks were forwarded.
    pub async fn forward_captured_audio(&mut self) -> Result<usize, ConsoleError> {
        let mut forwarded = 0;
        while let Ok(chunk) = self.audio_rx.try_recv() {
            if !self.connected || !self.client.is_connected() {
                continue;
            }
            if let Err(e) = self.client.append_input_audio(chunk).await {
                return Err(self.fail("forward audio", e.into()));
            }
            forwarded += 1;
        }
        Ok(forwarded)
    }

    fn fail(&mut self, operation: &str, e: ConsoleError) -> ConsoleError {
        error!(session_id = %self.session_id, operation, "Console operation failed: {}", e);
        self.connected = false;
        e
    }

    pub fn phase(&self) -> SessionPhase {
        if self.connecting {
            SessionPhase::Connecting
        } else if !self.connected {
            SessionPhase::Disconnected
        } else if self.recording {
            SessionPhase::Connected(ConnectedPhase::Recording)
        } else if self.awaiting_response {
            SessionPhase::Connected(ConnectedPhase::AwaitingResponse)
        } else {
            SessionPhase::Connected(ConnectedPhase::Idle)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn can_push_to_talk(&self) -> bool {
        self.turn_detection == TurnDetection::Manual
    }

    /// Whether assistant audio arrived within the last two seconds.
    pub fn is_active(&self, now: Instant) -> bool {
        self.last_voice_activity
            .is_some_and(|at| now.saturating_duration_since(at) < VOICE_ACTIVITY_WINDOW)
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    /// Item text ready for display.
    pub fn render_item_text(&self, item: &ConversationItem) -> String {
        if self.features.markdown_rendering {
            format_text(item.display_text())
        } else {
            escape_html(item.display_text())
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// `mm:ss.hh` offset of an event from the connect time.
    pub fn event_offset(&self, event: &RealtimeEvent) -> String {
        format_elapsed(self.start_time, event.time)
    }

    pub fn notes(&self) -> &BTreeMap<String, String> {
        &self.notes
    }

    pub fn coords(&self) -> &Coordinates {
        &self.coords
    }

    pub fn marker(&self) -> Option<&Coordinates> {
        self.marker.as_ref()
    }

    pub fn charts(&self) -> &ChartCarousel {
        &self.charts
    }

    pub fn charts_mut(&mut self) -> &mut ChartCarousel {
        &mut self.charts
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn features(&self) -> &ConsoleFeatures {
        &self.features
    }

    pub fn view(&self) -> &ConsoleView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ConsoleView {
        &mut self.view
    }
}
