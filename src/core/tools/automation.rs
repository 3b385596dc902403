use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ToolContext, ToolEffect, ToolHandler, ToolOutcome, ToolRequest, ToolResponse};
use crate::core::realtime::ToolDefinition;

pub const MULTITASK_TOOL: &str = "tool_multitask_api";
pub const DEFAULT_AUTOMATION_BASE_URL: &str = "https://flowise2-4vzn.onrender.com";
pub const DEFAULT_CHATFLOW_ID: &str = "1bca2aa1-cadf-4916-9ab4-d4d92d2590bc";

/// Artifact data prefix for files kept in the automation server's storage.
pub const FILE_STORAGE_PREFIX: &str = "FILE-STORAGE::";

const IMAGE_GENERATED: &str = "Image generated successfully. It will be displayed in the chart area.";
const IMAGE_BLOB_RECEIVED: &str = "Image blob received. It will be displayed in the chart area.";
const UNKNOWN_RESPONSE: &str = "Unknown response type";

/// Chart artifact of a prediction: `png` or `gif` with string data.
struct ImageArtifact<'a> {
    kind: &'a str,
    data: &'a str,
}

impl<'a> ImageArtifact<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        let kind = value.get("type").and_then(Value::as_str)?;
        let data = value.get("data").and_then(Value::as_str)?;
        matches!(kind, "png" | "gif").then_some(Self { kind, data })
    }
}

enum Failure {
    Status(u16),
    Transport(String),
}

impl Failure {
    fn message(&self) -> String {
        match self {
            Self::Status(status) => format!("An error occurred: HTTP error! status: {status}"),
            Self::Transport(message) => format!("An error occurred: {message}"),
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Forwards free-form questions to a chatflow prediction endpoint that can
/// update trackers, query databases or render charts.
pub struct MultitaskTool {
    http: reqwest::Client,
    base_url: String,
    chatflow_id: String,
}

impl MultitaskTool {
    pub fn new(http: reqwest::Client, base_url: &str, chatflow_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            chatflow_id: chatflow_id.to_string(),
        }
    }

    pub fn prediction_url(&self) -> String {
        format!("{}/api/v1/prediction/{}", self.base_url, self.chatflow_id)
    }

    /// URL of a file held in the automation server's upload storage.
    pub fn upload_file_url(&self, chat_id: &str, file_name: &str) -> String {
        let raw = format!("{}/api/v1/get-upload-file", self.base_url);
        match Url::parse(&raw) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("chatflowId", &self.chatflow_id)
                    .append_pair("chatId", chat_id)
                    .append_pair("fileName", file_name);
                url.to_string()
            }
            Err(_) => format!(
                "{raw}?chatflowId={}&chatId={chat_id}&fileName={file_name}",
                self.chatflow_id
            ),
        }
    }

    fn artifact_url(&self, artifact: &ImageArtifact<'_>, chat_id: &str) -> String {
        match artifact.data.strip_prefix(FILE_STORAGE_PREFIX) {
            Some(file_name) => self.upload_file_url(chat_id, file_name),
            None => format!("data:image/{};base64,{}", artifact.kind, artifact.data),
        }
    }

    /// Fields are read one by one so an unexpected `artifacts` shape never
    /// hides `text`.
    fn interpret_json(&self, body: Value) -> ToolOutcome {
        let text = body
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let image = body
            .get("artifacts")
            .and_then(Value::as_array)
            .and_then(|artifacts| artifacts.iter().find_map(ImageArtifact::from_value));

        if let Some(artifact) = image {
            let chat_id = body
                .get("chatId")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let url = self.artifact_url(&artifact, chat_id);
            info!(kind = %artifact.kind, "Chart artifact received");
            let reply = text.unwrap_or_else(|| IMAGE_GENERATED.to_string());
            return ToolOutcome::new(ToolResponse::Text(reply)).with_effect(ToolEffect::AddChart(url));
        }

        let reply = text.unwrap_or_else(|| body.to_string());
        ToolOutcome::new(ToolResponse::Text(reply))
    }

    async fn ask(&self, question: &str, session_id: &str) -> Result<ToolOutcome, Failure> {
        let response = self
            .http
            .post(self.prediction_url())
            .json(&json!({
                "question": question,
                "overrideConfig": { "sessionId": session_id }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        debug!(content_type = %content_type, "Automation response received");

        if content_type.contains("application/json") {
            let body = response.json::<Value>().await?;
            Ok(self.interpret_json(body))
        } else if content_type.contains("text/plain")
            || content_type.contains("application/octet-stream")
        {
            let text = response.text().await?;
            Ok(ToolOutcome::new(ToolResponse::Text(text)))
        } else if content_type.contains("image/") {
            let mime = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            let bytes = response.bytes().await?;
            let url = format!("data:{mime};base64,{}", BASE64.encode(&bytes));
            Ok(ToolOutcome::new(ToolResponse::Text(IMAGE_BLOB_RECEIVED.to_string()))
                .with_effect(ToolEffect::SetImageUrl(url)))
        } else {
            warn!(content_type = %content_type, "Unknown automation response type");
            Ok(ToolOutcome::new(ToolResponse::Text(UNKNOWN_RESPONSE.to_string())))
        }
    }
}

#[async_trait]
impl ToolHandler for MultitaskTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            MULTITASK_TOOL,
            "This tool sends the user input to an API endpoint that performs multiple tasks: updating a tracker, querying a database (AWS/Azure), or generating a chart. The API can return a .txt file, a normal response, or a chart (GIF/PNG).",
            json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The user input or question to send to the API"
                    }
                },
                "required": ["question"]
            }),
        )
    }

    async fn call(&self, request: ToolRequest, ctx: &ToolContext) -> ToolOutcome {
        let ToolRequest::MultitaskApi { question } = request else {
            return ToolOutcome::new(ToolResponse::error(format!(
                "{MULTITASK_TOOL} cannot handle {}",
                request.name()
            )));
        };

        match self.ask(&question, &ctx.session_id).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                let message = failure.message();
                error!(session_id = %ctx.session_id, "Multitask call failed: {}", message);
                ToolOutcome::new(ToolResponse::Text(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FLOW: &str = "flow-123";

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: "session-abc".to_string(),
        }
    }

    fn ask(question: &str) -> ToolRequest {
        ToolRequest::MultitaskApi {
            question: question.to_string(),
        }
    }

    async fn mount(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/prediction/{FLOW}")))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_request_carries_question_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/prediction/{FLOW}")))
            .and(body_json(json!({
                "question": "update tracker",
                "overrideConfig": { "sessionId": "session-abc" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Done"})))
            .expect(1)
            .mount(&server)
            .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("update tracker"), &ctx()).await;
        assert_eq!(outcome.response, ToolResponse::Text("Done".to_string()));
        assert!(outcome.effects.is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_artifact_adds_upload_url_chart() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "text": "",
                "chatId": "chat-9",
                "artifacts": [{ "type": "png", "data": "FILE-STORAGE::chart.png" }]
            })),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("plot sales"), &ctx()).await;

        assert_eq!(
            outcome.response,
            ToolResponse::Text(IMAGE_GENERATED.to_string())
        );
        let expected = format!(
            "{}/api/v1/get-upload-file?chatflowId={FLOW}&chatId=chat-9&fileName=chart.png",
            server.uri()
        );
        assert_eq!(outcome.effects, vec![ToolEffect::AddChart(expected)]);
    }

    #[tokio::test]
    async fn test_inline_artifact_becomes_data_uri() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "text": "Here is your chart",
                "artifacts": [
                    { "type": "txt", "data": "ignored" },
                    { "type": "gif", "data": "R0lGOD" }
                ]
            })),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("animate"), &ctx()).await;

        assert_eq!(
            outcome.response,
            ToolResponse::Text("Here is your chart".to_string())
        );
        assert_eq!(
            outcome.effects,
            vec![ToolEffect::AddChart("data:image/gif;base64,R0lGOD".to_string())]
        );
    }

    #[tokio::test]
    async fn test_json_without_text_is_stringified() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "rows": 3 })),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("count"), &ctx()).await;
        assert_eq!(outcome.response, ToolResponse::Text(r#"{"rows":3}"#.to_string()));
    }

    #[tokio::test]
    async fn test_null_artifacts_keep_text() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "text": "Tracker updated",
                "chatId": "c1",
                "artifacts": null
            })),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("update tracker"), &ctx()).await;
        assert_eq!(
            outcome.response,
            ToolResponse::Text("Tracker updated".to_string())
        );
        assert!(outcome.effects.is_empty());
    }

    #[tokio::test]
    async fn test_non_image_artifact_with_object_data_keeps_text() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "text": "Here",
                "artifacts": [
                    { "type": "html", "data": { "k": 1 } },
                    { "type": "png", "data": { "k": 2 } }
                ]
            })),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("report"), &ctx()).await;
        assert_eq!(outcome.response, ToolResponse::Text("Here".to_string()));
        assert!(outcome.effects.is_empty());
    }

    #[tokio::test]
    async fn test_plain_text_body_is_returned() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_raw("tracker updated", "text/plain"),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("update"), &ctx()).await;
        assert_eq!(
            outcome.response,
            ToolResponse::Text("tracker updated".to_string())
        );
    }

    #[tokio::test]
    async fn test_image_body_sets_image_url() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("chart"), &ctx()).await;
        assert_eq!(
            outcome.response,
            ToolResponse::Text(IMAGE_BLOB_RECEIVED.to_string())
        );
        assert_eq!(
            outcome.effects,
            vec![ToolEffect::SetImageUrl("data:image/png;base64,AQID".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_content_type() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_raw("<p>hi</p>", "text/html"),
        )
        .await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("x"), &ctx()).await;
        assert_eq!(outcome.response, ToolResponse::Text(UNKNOWN_RESPONSE.to_string()));
    }

    #[tokio::test]
    async fn test_http_error_status_message() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(503)).await;

        let tool = MultitaskTool::new(reqwest::Client::new(), &server.uri(), FLOW);
        let outcome = tool.call(ask("x"), &ctx()).await;
        assert_eq!(
            outcome.response,
            ToolResponse::Text("An error occurred: HTTP error! status: 503".to_string())
        );
    }

    #[test]
    fn test_upload_url_encodes_file_name() {
        let tool = MultitaskTool::new(reqwest::Client::new(), "https://flows.example.com/", FLOW);
        assert_eq!(
            tool.upload_file_url("c1", "my chart.png"),
            "https://flows.example.com/api/v1/get-upload-file?chatflowId=flow-123&chatId=c1&fileName=my+chart.png"
        );
        assert_eq!(
            tool.prediction_url(),
            "https://flows.example.com/api/v1/prediction/flow-123"
        );
    }
}
