//! Gemini (Google) image editing and description provider.

use crate::error::{sanitize_error_message, EditorError, Result};
use crate::image::provider::{ImageDescriber, ImageEditor};
use crate::image::types::{EditRequest, EditedImage, EncodedPayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default REST endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction sent with every description request.
pub const DESCRIBE_INSTRUCTION: &str = "Describe this image in vivid detail so the description \
     can be used as a starting prompt for editing it. Cover the subject, clothing, pose, \
     setting, lighting and style in a single paragraph.";

/// Finish reason of a candidate that ended normally.
const FINISH_STOP: &str = "STOP";
/// Finish reason of an image request that produced no image.
const FINISH_NO_IMAGE: &str = "NO_IMAGE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    image_model: String,
    text_model: String,
    base_url: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl Default for GeminiProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            image_model: GeminiModel::default().as_str().to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the image model from a known variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.image_model = model.as_str().to_string();
        self
    }

    /// Sets the image model by identifier.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Sets the text model used for descriptions.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Overrides the API root (proxies, tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the per-request timeout. Ignored when a custom client is given.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses a preconfigured HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EditorError::Config(
                    "GEMINI_API_KEY / GOOGLE_API_KEY not set and no API key provided".into(),
                )
            })?;

        if self.image_model.is_empty() || self.text_model.is_empty() {
            return Err(EditorError::Config("model identifier must not be empty".into()));
        }

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| EditorError::Config(e.to_string()))?,
        };

        Ok(GeminiProvider {
            client,
            api_key,
            image_model: self.image_model,
            text_model: self.text_model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Gemini-backed editor and describer.
///
/// Holds its own credential; construct one at startup and pass it by
/// reference to whatever drives the editor.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    image_model: String,
    text_model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Returns the image model identifier.
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Returns the text model identifier.
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    async fn generate_content(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = sanitize_error_message(&text);
            if status.is_server_error() {
                return Err(EditorError::Transport(format!("HTTP {}: {}", status.as_u16(), message)));
            }
            return Err(EditorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn edit_impl(&self, request: &EditRequest) -> Result<EditedImage> {
        let start = Instant::now();
        let body = GeminiRequest::edit(request);

        tracing::debug!(
            model = %self.image_model,
            mime_type = %request.payload.media_type,
            "sending Gemini edit request"
        );
        let response = self.generate_content(&self.image_model, &body).await?;

        let result = classify_edit_response(response);
        match &result {
            Ok(_) => tracing::debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Gemini edit complete"
            ),
            Err(e) => tracing::warn!("Gemini returned no image: {e}"),
        }
        result
    }

    async fn describe_impl(&self, payload: &EncodedPayload) -> Result<String> {
        let start = Instant::now();
        let body = GeminiRequest::describe(payload);

        tracing::debug!(model = %self.text_model, "sending Gemini description request");
        let response = self.generate_content(&self.text_model, &body).await?;

        let result = classify_description_response(response);
        match &result {
            Ok(text) => tracing::debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                chars = text.len(),
                "Gemini description complete"
            ),
            Err(e) => tracing::warn!("Gemini returned no description: {e}"),
        }
        result
    }
}

#[async_trait]
impl ImageEditor for GeminiProvider {
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage> {
        self.edit_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

#[async_trait]
impl ImageDescriber for GeminiProvider {
    async fn describe(&self, payload: &EncodedPayload) -> Result<String> {
        self.describe_impl(payload).await
    }
}

/// Turns a generation response into an image or a precise failure.
fn classify_edit_response(response: GeminiResponse) -> Result<EditedImage> {
    let candidate = response.candidates.into_iter().next();

    let parts = candidate
        .as_ref()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
        return Ok(EditedImage::from_inline(&inline.mime_type, &inline.data));
    }

    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            return Err(EditorError::Blocked {
                reason,
                message: feedback.block_reason_message,
            });
        }
    }

    let Some(candidate) = candidate.as_ref() else {
        return Err(EditorError::Unknown);
    };

    if let Some(message) = candidate.finish_message.as_deref().filter(|m| !m.is_empty()) {
        return Err(EditorError::ModelRefused(message.to_string()));
    }

    let text = joined_text(parts);
    if !text.trim().is_empty() {
        return Err(EditorError::WrongModality(text));
    }

    match candidate.finish_reason.as_deref() {
        Some(FINISH_NO_IMAGE) => Err(EditorError::NoImageProduced),
        Some(reason) if !reason.is_empty() => Err(EditorError::OtherFinish(reason.to_string())),
        _ => Err(EditorError::Unknown),
    }
}

/// Turns a description response into text or a precise failure.
fn classify_description_response(response: GeminiResponse) -> Result<String> {
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            return Err(EditorError::Blocked {
                reason,
                message: feedback.block_reason_message,
            });
        }
    }

    let candidate = response.candidates.into_iter().next();
    let text = candidate
        .as_ref()
        .and_then(|c| c.content.as_ref())
        .map(|c| joined_text(&c.parts))
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate.and_then(|c| c.finish_reason) {
        Some(reason) if !reason.is_empty() && reason != FINISH_STOP => {
            Err(EditorError::ModelRefused(reason))
        }
        _ => Err(EditorError::EmptyResult),
    }
}

fn joined_text(parts: &[GeminiPartResponse]) -> String {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .concat()
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn image_part(payload: &EncodedPayload) -> GeminiRequestPart {
        GeminiRequestPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: payload.media_type.clone(),
                data: payload.data.clone(),
            },
        }
    }

    fn edit(req: &EditRequest) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![
                    Self::image_part(&req.payload),
                    GeminiRequestPart::Text {
                        text: req.instruction.clone(),
                    },
                ],
            }],
            generation_config: Some(GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            }),
        }
    }

    fn describe(payload: &EncodedPayload) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![
                    Self::image_part(payload),
                    GeminiRequestPart::Text {
                        text: DESCRIBE_INSTRUCTION.to_string(),
                    },
                ],
            }],
            generation_config: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    finish_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NO_IMAGE_GUIDANCE;

    fn parse(json: &str) -> GeminiResponse {
        serde_json::from_str(json).unwrap()
    }

    fn payload() -> EncodedPayload {
        EncodedPayload {
            data: "AQID".into(),
            media_type: "image/png".into(),
        }
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "nano-banana-pro-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::NanoBananaPro)
            .base_url("http://localhost:9999/v1beta/")
            .build()
            .unwrap();
        assert_eq!(provider.image_model(), "nano-banana-pro-preview");
        assert_eq!(provider.text_model(), "gemini-2.5-flash");
        assert_eq!(provider.base_url, "http://localhost:9999/v1beta");
    }

    #[test]
    fn test_builder_rejects_blank_key() {
        let err = GeminiProviderBuilder::new().api_key("  ").build().unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_empty_model() {
        let err = GeminiProviderBuilder::new()
            .api_key("k")
            .text_model("")
            .build()
            .unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = GeminiProvider::builder().api_key("secret-key").build().unwrap();
        assert!(!format!("{provider:?}").contains("secret-key"));
    }

    #[test]
    fn test_edit_request_serialization() {
        let req = EditRequest::new(payload(), "Make it blue");
        let json = serde_json::to_value(GeminiRequest::edit(&req)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "Make it blue");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE"])
        );
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_describe_request_has_no_modality() {
        let json = serde_json::to_value(GeminiRequest::describe(&payload())).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 2);
        assert_eq!(parts[1]["text"], DESCRIBE_INSTRUCTION);
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_edit_returns_first_image_part() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/"}},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#,
        );
        let image = classify_edit_response(resp).unwrap();
        assert_eq!(image.data_uri, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_edit_image_wins_over_block_reason() {
        let resp = parse(
            r#"{
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AA=="}}]}}],
            "promptFeedback": {"blockReason": "SAFETY"}
        }"#,
        );
        assert!(classify_edit_response(resp).is_ok());
    }

    #[test]
    fn test_edit_block_reason_takes_priority() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {"parts": [{"text": "I can't do that"}]},
                "finishReason": "NO_IMAGE",
                "finishMessage": "declined"
            }],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#,
        );
        match classify_edit_response(resp).unwrap_err() {
            EditorError::Blocked { reason, message } => {
                assert_eq!(reason, "SAFETY");
                assert_eq!(message.as_deref(), Some("Prompt was blocked due to safety"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_edit_block_without_candidates() {
        let resp = parse(r#"{"candidates": [], "promptFeedback": {"blockReason": "OTHER"}}"#);
        assert!(matches!(
            classify_edit_response(resp).unwrap_err(),
            EditorError::Blocked { ref reason, message: None } if reason == "OTHER"
        ));
    }

    #[test]
    fn test_edit_finish_message_is_refusal() {
        let resp = parse(
            r#"{"candidates": [{
                "content": {"parts": [{"text": "some text"}]},
                "finishReason": "IMAGE_SAFETY",
                "finishMessage": "Unable to show the generated image."
            }]}"#,
        );
        assert!(matches!(
            classify_edit_response(resp).unwrap_err(),
            EditorError::ModelRefused(ref m) if m == "Unable to show the generated image."
        ));
    }

    #[test]
    fn test_edit_text_only_is_wrong_modality() {
        let resp = parse(
            r#"{"candidates": [{
                "content": {"parts": [{"text": "I would "}, {"text": "rather describe it."}]},
                "finishReason": "STOP"
            }]}"#,
        );
        assert!(matches!(
            classify_edit_response(resp).unwrap_err(),
            EditorError::WrongModality(ref t) if t == "I would rather describe it."
        ));
    }

    #[test]
    fn test_edit_no_image_finish_reason() {
        let resp = parse(r#"{"candidates": [{"finishReason": "NO_IMAGE"}]}"#);
        let err = classify_edit_response(resp).unwrap_err();
        assert!(matches!(err, EditorError::NoImageProduced));
        assert!(err.to_string().contains(NO_IMAGE_GUIDANCE));
    }

    #[test]
    fn test_edit_other_finish_reason() {
        let resp = parse(r#"{"candidates": [{"content": {"parts": []}, "finishReason": "IMAGE_SAFETY"}]}"#);
        assert!(matches!(
            classify_edit_response(resp).unwrap_err(),
            EditorError::OtherFinish(ref r) if r == "IMAGE_SAFETY"
        ));
    }

    #[test]
    fn test_edit_unknown_failure() {
        assert!(matches!(
            classify_edit_response(parse(r#"{"candidates": [{}]}"#)).unwrap_err(),
            EditorError::Unknown
        ));
        assert!(matches!(
            classify_edit_response(parse("{}")).unwrap_err(),
            EditorError::Unknown
        ));
    }

    #[test]
    fn test_describe_returns_text_verbatim() {
        let resp = parse(
            r#"{"candidates": [{
                "content": {"parts": [{"text": "A red square "}, {"text": "on white."}]},
                "finishReason": "STOP"
            }]}"#,
        );
        assert_eq!(
            classify_description_response(resp).unwrap(),
            "A red square on white."
        );
    }

    #[test]
    fn test_describe_blocked() {
        let resp = parse(
            r#"{"promptFeedback": {"blockReason": "PROHIBITED_CONTENT", "blockReasonMessage": "nope"}}"#,
        );
        assert!(matches!(
            classify_description_response(resp).unwrap_err(),
            EditorError::Blocked { ref reason, .. } if reason == "PROHIBITED_CONTENT"
        ));
    }

    #[test]
    fn test_describe_empty_with_stop_is_empty_result() {
        let resp = parse(r#"{"candidates": [{"content": {"parts": [{"text": ""}]}, "finishReason": "STOP"}]}"#);
        assert!(matches!(
            classify_description_response(resp).unwrap_err(),
            EditorError::EmptyResult
        ));
    }

    #[test]
    fn test_describe_empty_with_safety_is_refusal() {
        let resp = parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#);
        assert!(matches!(
            classify_description_response(resp).unwrap_err(),
            EditorError::ModelRefused(ref r) if r == "SAFETY"
        ));
    }

    #[test]
    fn test_describe_no_candidates_is_empty_result() {
        assert!(matches!(
            classify_description_response(parse(r#"{"candidates": []}"#)).unwrap_err(),
            EditorError::EmptyResult
        ));
    }

    /// Serves one HTTP response on a local port and hands back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then as much body as Content-Length announces.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    fn provider_at(base_url: &str) -> GeminiProvider {
        GeminiProvider::builder()
            .api_key("test-key")
            .base_url(base_url)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_edit_over_http_returns_image() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]}, "finishReason": "STOP"}]}"#,
        )
        .await;

        let image = provider_at(&base_url)
            .edit(&EditRequest::new(payload(), "Make it blue"))
            .await
            .unwrap();
        assert_eq!(image.data_uri, "data:image/png;base64,AQID");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash-image:generateContent "));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""responseModalities":["IMAGE"]"#));
    }

    #[tokio::test]
    async fn test_describe_over_http_uses_text_model() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"candidates": [{"content": {"parts": [{"text": "A red square"}]}, "finishReason": "STOP"}]}"#,
        )
        .await;

        let text = provider_at(&base_url).describe(&payload()).await.unwrap();
        assert_eq!(text, "A red square");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent "));
    }

    #[tokio::test]
    async fn test_edit_over_http_classifies_refusal() {
        let (base_url, _server) =
            serve_once("200 OK", r#"{"candidates": [{"finishReason": "NO_IMAGE"}]}"#).await;

        let err = provider_at(&base_url)
            .edit(&EditRequest::new(payload(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::NoImageProduced));
    }

    #[tokio::test]
    async fn test_client_error_status_is_api_error() {
        let (base_url, _server) = serve_once(
            "400 Bad Request",
            r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#,
        )
        .await;

        let err = provider_at(&base_url)
            .edit(&EditRequest::new(payload(), "x"))
            .await
            .unwrap_err();
        match err {
            EditorError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_status_is_transport_error() {
        let (base_url, _server) =
            serve_once("503 Service Unavailable", "upstream unavailable").await;

        let err = provider_at(&base_url)
            .describe(&payload())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EditorError::Transport(ref m) if m == "HTTP 503: upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn test_malformed_http_body_is_transport_error() {
        let (base_url, _server) = serve_once("200 OK", "<html>not json</html>").await;

        let err = provider_at(&base_url)
            .edit(&EditRequest::new(payload(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Transport(ref m) if m.starts_with("malformed response")));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Bind then drop to get a local port nothing listens on.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let err = provider_at(&format!("http://{addr}/v1beta"))
            .edit(&EditRequest::new(payload(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Transport(ref m) if m.contains("generateContent")));
    }

    #[test]
    fn test_malformed_body_is_transport_error() {
        let err: EditorError = serde_json::from_str::<GeminiResponse>(r#"{"candidates": 3}"#)
            .unwrap_err()
            .into();
        assert!(matches!(err, EditorError::Transport(_)));
    }
}
