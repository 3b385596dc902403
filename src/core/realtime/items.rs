//! Conversation items as mirrored from the realtime collaborator.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemRole {
    User,
    Assistant,
    System,
}

/// Kind of conversation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Message,
    FunctionCall,
    FunctionCallOutput,
}

/// Item status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}

/// Tool invocation attached to a `function_call` item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub call_id: String,
    pub arguments: String,
}

/// Display-ready payload of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedItem {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub transcript: String,
    /// Raw PCM16 audio accumulated for this item
    #[serde(skip)]
    pub audio: Bytes,
    /// WAV rendition of `audio`, attached once the item completes
    #[serde(skip)]
    pub file: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub role: Option<ItemRole>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub formatted: FormattedItem,
}

impl ConversationItem {
    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }

    /// Text to show for the item: transcript first, then text, then tool output.
    pub fn display_text(&self) -> &str {
        let formatted = &self.formatted;
        if !formatted.transcript.is_empty() {
            &formatted.transcript
        } else if !formatted.text.is_empty() {
            &formatted.text
        } else {
            formatted.output.as_deref().unwrap_or_default()
        }
    }
}

/// Incremental change that accompanies a `conversation.updated` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDelta {
    /// PCM16 audio chunk
    pub audio: Option<Bytes>,
    pub transcript: Option<String>,
    pub text: Option<String>,
    pub arguments: Option<String>,
}
