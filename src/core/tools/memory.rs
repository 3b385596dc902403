use async_trait::async_trait;
use serde_json::json;

use super::{ToolContext, ToolEffect, ToolHandler, ToolOutcome, ToolRequest, ToolResponse};
use crate::core::realtime::ToolDefinition;

pub const SET_MEMORY_TOOL: &str = "set_memory";

/// Saves quick notes requested by the user into the console's notes map.
pub struct MemoryTool;

#[async_trait]
impl ToolHandler for MemoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            SET_MEMORY_TOOL,
            "Add quick notes requested by the user",
            json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "A short heading for the notes value. Always use uppercase underscores, no other characters."
                    },
                    "value": {
                        "type": "string",
                        "description": "This is the note description that has been requested by the user to be saved. Maximum 30 words. Summarize as required. If no description is provided, then keep this empty"
                    }
                },
                "required": ["key", "value"]
            }),
        )
    }

    async fn call(&self, request: ToolRequest, _ctx: &ToolContext) -> ToolOutcome {
        match request {
            ToolRequest::SetMemory { key, value } => ToolOutcome::new(ToolResponse::Ack { ok: true })
                .with_effect(ToolEffect::SetNote { key, value }),
            other => ToolOutcome::new(ToolResponse::error(format!(
                "{SET_MEMORY_TOOL} cannot handle {}",
                other.name()
            ))),
        }
    }
}
