use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChunkStream, GenerateRequest, LanguageModel};
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<GeminiErrorBody>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl GeminiErrorBody {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("An error occurred during streaming");
        match (self.code, self.status.as_deref()) {
            (Some(code), Some(status)) => format!("[{} {}] {}", code, status, message),
            (Some(code), None) => format!("[{}] {}", code, message),
            _ => message.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_body(request: &GenerateRequest) -> GeminiRequest {
        let mut parts = vec![GeminiPart::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.attachments.iter().map(|attachment| GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: attachment.mime_type.clone(),
                data: STANDARD.encode(&attachment.bytes),
            },
        }));

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: request.thinking_budget.map(|budget| GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: budget,
                },
            }),
        }
    }

    /// Turns one SSE `data:` payload into a chunk.
    fn parse_event(data: &str) -> Result<Option<String>, ApiError> {
        if data.trim().is_empty() {
            return Ok(None);
        }

        let response: GenerateContentResponse = match serde_json::from_str(data) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to parse Gemini stream event: {}. Raw: '{}'", e, data);
                return Ok(None);
            }
        };

        if let Some(error) = response.error {
            return Err(ApiError::new(error.describe()));
        }

        if response.candidates.is_empty() {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ApiError::new(format!("Prompt was blocked: {}", reason)));
            }
            return Ok(None);
        }

        let text: String = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn stream(&self, request: GenerateRequest) -> Result<ChunkStream, ApiError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            attachments = request.attachments.len(),
            thinking_budget = ?request.thinking_budget,
            "Sending streaming request to Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::new(format!("Gemini API error {}: {}", status, text)));
        }

        let stream = response.bytes_stream().eventsource().map(|event| match event {
            Ok(event) => Self::parse_event(&event.data),
            Err(e) => Err(ApiError::new(format!("SSE stream error: {}", e))),
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Attachment;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: "Hello".to_string(),
            model: model.to_string(),
            attachments: Vec::new(),
            thinking_budget: None,
        }
    }

    fn sse(events: &[serde_json::Value]) -> String {
        events
            .iter()
            .map(|e| format!("data: {}\r\n\r\n", e))
            .collect()
    }

    fn text_event(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    async fn collect(client: &GeminiClient, req: GenerateRequest) -> Result<Vec<Option<String>>, ApiError> {
        let mut stream = client.stream(req).await?;
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }

    #[test]
    fn test_body_without_generation_config() {
        let body = serde_json::to_value(GeminiClient::build_body(&request("m"))).unwrap();
        assert_eq!(
            body,
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }] })
        );
    }

    #[test]
    fn test_body_with_attachment_and_thinking_budget() {
        let mut req = request("m");
        req.attachments.push(Attachment::new(b"%PDF-1.4".to_vec()));
        req.thinking_budget = Some(0);

        let body = serde_json::to_value(GeminiClient::build_body(&req)).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][1],
            json!({ "inlineData": { "mimeType": "application/pdf", "data": "JVBERi0xLjQ=" } })
        );
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    }

    #[test]
    fn test_parse_event_variants() {
        assert_eq!(GeminiClient::parse_event("").unwrap(), None);
        assert_eq!(GeminiClient::parse_event("not json").unwrap(), None);
        assert_eq!(
            GeminiClient::parse_event(&text_event("hi").to_string()).unwrap(),
            Some("hi".to_string())
        );

        let finish = json!({ "candidates": [{ "finishReason": "STOP" }] });
        assert_eq!(GeminiClient::parse_event(&finish.to_string()).unwrap(), None);

        let thought = json!({ "candidates": [{ "content": { "parts": [
            { "text": "pondering", "thought": true },
            { "text": "answer" }
        ] } }] });
        assert_eq!(
            GeminiClient::parse_event(&thought.to_string()).unwrap(),
            Some("answer".to_string())
        );
    }

    #[test]
    fn test_parse_event_errors() {
        let error = json!({ "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" } });
        let err = GeminiClient::parse_event(&error.to_string()).unwrap_err();
        assert_eq!(err.message, "[429 RESOURCE_EXHAUSTED] Quota exceeded");

        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GeminiClient::parse_event(&blocked.to_string()).unwrap_err();
        assert!(err.message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_in_order() {
        let server = MockServer::start().await;
        let body = sse(&[text_event("Hel"), text_event("lo"), json!({ "candidates": [{ "finishReason": "STOP" }] })]);

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("test-key", &server.uri());
        let chunks = collect(&client, request("gemini-2.0-flash")).await.unwrap();
        assert_eq!(
            chunks,
            vec![Some("Hel".to_string()), Some("lo".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_thinking_budget_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } } })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[text_event("ok")]), "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("k", &server.uri());
        let mut req = request("gemini-2.5-flash-preview-04-17");
        req.thinking_budget = Some(0);
        let chunks = collect(&client, req).await.unwrap();
        assert_eq!(chunks, vec![Some("ok".to_string())]);
    }

    #[tokio::test]
    async fn test_error_status_includes_code() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Resource has been exhausted"))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("k", &server.uri());
        let err = match client.stream(request("m")).await {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(err.message.contains("429"));
        assert!(err.message.contains("Resource has been exhausted"));
    }
}
