//! Presentation flags of the console page: embedded widgets, modals and
//! expanded event rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Third-party widget that can be embedded next to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedPanel {
    /// Stable identifier, e.g. `sheet` or `docs`
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Modal dialogs the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modal {
    Events,
    Notes,
    Charts,
    ApiKey,
}

/// Page variant switches collapsed into one console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleFeatures {
    /// Keep the chart list across disconnect/reconnect
    pub persist_charts: bool,
    /// Keep the notes map across disconnect/reconnect
    pub persist_notes: bool,
    /// Render assistant text through `format_text`
    pub markdown_rendering: bool,
    /// Widgets offered in the embed toggle
    pub embeds: Vec<EmbedPanel>,
    /// Modals this page variant exposes
    pub modals: Vec<Modal>,
    /// Delay between connecting and sending the greeting
    pub settle_delay_ms: u64,
    /// System instructions for the realtime session
    pub instructions: String,
}

impl Default for ConsoleFeatures {
    fn default() -> Self {
        Self {
            persist_charts: true,
            persist_notes: false,
            markdown_rendering: true,
            embeds: Vec::new(),
            modals: vec![Modal::Events, Modal::Notes, Modal::Charts],
            settle_delay_ms: 1000,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

/// Instructions used when none are configured.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful voice assistant for data analysis. \
Keep answers short and conversational. Use the available tools to save notes, \
look up the weather, and forward analysis, database and chart requests to the automation API.";

/// Which embed is visible and a key that forces the frame to reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedState {
    active: Option<String>,
    refresh_key: u64,
}

impl EmbedState {
    /// Show `id`, or hide it when it is already showing.
    pub fn toggle(&mut self, id: &str) {
        if self.active.as_deref() == Some(id) {
            self.active = None;
        } else {
            self.active = Some(id.to_string());
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Bump the reload key of the embedded frame.
    pub fn refresh(&mut self) {
        self.refresh_key = self.refresh_key.wrapping_add(1);
    }

    pub fn refresh_key(&self) -> u64 {
        self.refresh_key
    }
}

/// UI-only state of the console page.
#[derive(Debug, Clone, Default)]
pub struct ConsoleView {
    pub embeds: EmbedState,
    open_modals: HashSet<Modal>,
    expanded_events: HashSet<String>,
}

impl ConsoleView {
    pub fn open(&mut self, modal: Modal) {
        self.open_modals.insert(modal);
    }

    pub fn close(&mut self, modal: Modal) {
        self.open_modals.remove(&modal);
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        self.open_modals.contains(&modal)
    }

    /// Expand or collapse one event row.
    pub fn toggle_expanded(&mut self, event_id: &str) {
        if !self.expanded_events.remove(event_id) {
            self.expanded_events.insert(event_id.to_string());
        }
    }

    pub fn is_expanded(&self, event_id: &str) -> bool {
        self.expanded_events.contains(event_id)
    }

    pub fn collapse_all(&mut self) {
        self.expanded_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_toggle_switches_and_hides() {
        let mut embeds = EmbedState::default();
        embeds.toggle("sheet");
        assert_eq!(embeds.active(), Some("sheet"));
        embeds.toggle("docs");
        assert_eq!(embeds.active(), Some("docs"));
        embeds.toggle("docs");
        assert_eq!(embeds.active(), None);
    }

    #[test]
    fn test_refresh_key_increments() {
        let mut embeds = EmbedState::default();
        embeds.refresh();
        embeds.refresh();
        assert_eq!(embeds.refresh_key(), 2);
    }

    #[test]
    fn test_expand_toggle() {
        let mut view = ConsoleView::default();
        view.toggle_expanded("evt_1");
        assert!(view.is_expanded("evt_1"));
        view.toggle_expanded("evt_1");
        assert!(!view.is_expanded("evt_1"));
    }

    #[test]
    fn test_modals() {
        let mut view = ConsoleView::default();
        view.open(Modal::Charts);
        assert!(view.is_open(Modal::Charts));
        view.close(Modal::Charts);
        assert!(!view.is_open(Modal::Charts));
    }

    #[test]
    fn test_features_from_partial_yaml() {
        let features: ConsoleFeatures = serde_yaml::from_str("persist_notes: true\n").unwrap();
        assert!(features.persist_notes);
        assert!(features.persist_charts);
        assert_eq!(features.settle_delay_ms, 1000);
    }
}
