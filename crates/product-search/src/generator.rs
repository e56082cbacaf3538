//! AI content generators backed by a hosted inference API.
//!
//! [`GeneratorFactory`] maps a type key (`"text"`, `"image"`) to a
//! constructor. Every generator posts one JSON payload to
//! `{base_url}/{model}` with a static bearer header and reports the outcome
//! as a [`GenerationOutput`] instead of an error, so callers can always
//! surface a message to the user.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{CatalogError, CatalogResult};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_TEXT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";
pub const DEFAULT_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

const TEXT_TIMEOUT_SECS: u64 = 25;
const IMAGE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 50;
pub const DEFAULT_IMAGE_SIZE: u32 = 512;
pub const DEFAULT_IMAGE_STEPS: u32 = 20;

/// Marker the model is asked to answer after.
const REPLY_MARKER: &str = "Assistant:";

/// Start of the canned reply used when the model cannot suggest anything.
pub const NO_MATCH_MARKER: &str = "No products found";
const NO_MATCH_REPLY: &str = "No products found. Please describe what you need in more detail.";
const UNAVAILABLE_REPLY: &str = "The recommendation service is temporarily unavailable.";

const FORBIDDEN_IMAGE_WORDS: [&str; 3] = ["violence", "weapon", "drug"];

const TEXT_PROMPT_TEMPLATE: &str = "You are an expert in product recommendations for university students.
Reply ONLY in the format: \"Product name: short description (8 words max)\"

Example: \"Spiral notebook: 200 pages with metal binding\"

User: {prompt}
Assistant:";

/// Connection settings for the inference host.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub text_timeout: Duration,
    pub image_timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_timeout: Duration::from_secs(TEXT_TIMEOUT_SECS),
            image_timeout: Duration::from_secs(IMAGE_TIMEOUT_SECS),
        }
    }
}

impl InferenceConfig {
    pub fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), model)
    }
}

/// Shared HTTP client plus configuration handed to every generator.
#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    config: Arc<InferenceConfig>,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    async fn post_json(
        &self,
        model: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = self.config.model_url(model);
        let token = self.config.api_key.as_deref().unwrap_or_default();
        tracing::debug!(%url, "calling inference API");
        self.http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
    }
}

/// Optional knobs for a generation call; each generator reads the ones it
/// understands and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationParams {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<u32>,
}

/// Result of a generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    pub success: bool,
    /// Generated text or base64 image; on failure, an optional user-facing
    /// fallback message.
    pub content: Option<String>,
    pub error: Option<String>,
    /// MIME type of image content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl GenerationOutput {
    pub fn ok(content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
            mime: None,
        }
    }

    pub fn failed(error: impl Into<String>, fallback: Option<&str>) -> Self {
        Self {
            success: false,
            content: fallback.map(str::to_string),
            error: Some(error.into()),
            mime: None,
        }
    }
}

/// A content generator.
#[async_trait]
pub trait AiGenerator: Send + Sync {
    /// Registry key of this generator.
    fn kind(&self) -> &'static str;

    /// Whether `prompt` is acceptable input.
    fn validate_input(&self, prompt: &str) -> bool;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationOutput;
}

/// Product recommendations from an instruction-tuned language model.
pub struct TextGenerator {
    client: InferenceClient,
}

impl TextGenerator {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    fn build_prompt(prompt: &str) -> String {
        TEXT_PROMPT_TEMPLATE.replace("{prompt}", prompt)
    }

    /// Pull the reply out of the echoed completion.
    fn extract_reply(generated: &str) -> String {
        let reply = match generated.split(REPLY_MARKER).nth(1) {
            Some(after) => after,
            None => generated,
        };
        reply.trim().trim_matches('"').to_string()
    }
}

#[async_trait]
impl AiGenerator for TextGenerator {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn validate_input(&self, prompt: &str) -> bool {
        prompt.trim().chars().count() >= 3
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationOutput {
        if !self.validate_input(prompt) {
            return GenerationOutput::failed("Prompt must be at least 3 characters long", None);
        }

        let payload = json!({
            "inputs": Self::build_prompt(prompt),
            "parameters": {
                "temperature": params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                "max_new_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                "do_sample": true,
            }
        });

        let config = self.client.config();
        let response = match self
            .client
            .post_json(&config.text_model, &payload, config.text_timeout)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Text generation request failed: {e}");
                return GenerationOutput::failed(e.to_string(), Some(UNAVAILABLE_REPLY));
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            match response.json::<Value>().await {
                Ok(Value::Array(items)) if !items.is_empty() => {
                    let generated = items[0]
                        .get("generated_text")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    return GenerationOutput::ok(Self::extract_reply(generated));
                }
                Ok(other) => {
                    tracing::warn!("Unexpected text generation payload: {other}");
                }
                Err(e) => {
                    tracing::warn!("Text generation response was not JSON: {e}");
                }
            }
        }

        GenerationOutput::failed(
            format!("API error: {}", status.as_u16()),
            Some(NO_MATCH_REPLY),
        )
    }
}

/// Product photos from a diffusion model, returned as base64.
pub struct ImageGenerator {
    client: InferenceClient,
}

impl ImageGenerator {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "Professional photograph of {prompt}, white background, e-commerce style, high quality, 4k"
        )
    }

    fn sniff_mime(bytes: &[u8]) -> &'static str {
        image::guess_format(bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/png")
    }
}

#[async_trait]
impl AiGenerator for ImageGenerator {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn validate_input(&self, prompt: &str) -> bool {
        if prompt.trim().is_empty() {
            return false;
        }
        let lower = prompt.to_lowercase();
        !FORBIDDEN_IMAGE_WORDS.iter().any(|w| lower.contains(w))
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationOutput {
        if !self.validate_input(prompt) {
            return GenerationOutput::failed("Invalid prompt or inappropriate content", None);
        }

        let payload = json!({
            "inputs": Self::enhance_prompt(prompt),
            "parameters": {
                "width": params.width.unwrap_or(DEFAULT_IMAGE_SIZE),
                "height": params.height.unwrap_or(DEFAULT_IMAGE_SIZE),
                "num_inference_steps": params.steps.unwrap_or(DEFAULT_IMAGE_STEPS),
            }
        });

        let config = self.client.config();
        let response = match self
            .client
            .post_json(&config.image_model, &payload, config.image_timeout)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Image generation request failed: {e}");
                return GenerationOutput::failed(e.to_string(), None);
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return GenerationOutput::failed(
                format!("API error: {} - {}", status.as_u16(), body),
                None,
            );
        }

        match response.bytes().await {
            Ok(bytes) => {
                let mut out = GenerationOutput::ok(
                    base64::engine::general_purpose::STANDARD.encode(&bytes),
                );
                out.mime = Some(Self::sniff_mime(&bytes).to_string());
                out
            }
            Err(e) => GenerationOutput::failed(e.to_string(), None),
        }
    }
}

/// Builds a generator from the shared client.
pub type GeneratorConstructor = fn(InferenceClient) -> Box<dyn AiGenerator>;

fn build_text(client: InferenceClient) -> Box<dyn AiGenerator> {
    Box::new(TextGenerator::new(client))
}

fn build_image(client: InferenceClient) -> Box<dyn AiGenerator> {
    Box::new(ImageGenerator::new(client))
}

/// Registry of generator types.
#[derive(Clone)]
pub struct GeneratorFactory {
    client: InferenceClient,
    constructors: Vec<(String, GeneratorConstructor)>,
}

impl GeneratorFactory {
    /// Factory with the built-in `text` and `image` generators.
    pub fn new(config: InferenceConfig) -> Self {
        let mut factory = Self {
            client: InferenceClient::new(config),
            constructors: Vec::new(),
        };
        factory.register("text", build_text);
        factory.register("image", build_image);
        factory
    }

    /// Add a generator type, replacing any existing one with the same key.
    pub fn register(&mut self, kind: &str, constructor: GeneratorConstructor) {
        match self.constructors.iter_mut().find(|(k, _)| k == kind) {
            Some(entry) => entry.1 = constructor,
            None => self.constructors.push((kind.to_string(), constructor)),
        }
    }

    pub fn create(&self, kind: &str) -> CatalogResult<Box<dyn AiGenerator>> {
        self.constructors
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, build)| build(self.client.clone()))
            .ok_or_else(|| CatalogError::UnknownGenerator {
                requested: kind.to_string(),
                available: self.available_types().join(", "),
            })
    }

    pub fn available_types(&self) -> Vec<String> {
        self.constructors.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn config(&self) -> &InferenceConfig {
        self.client.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn config_for(server: &MockServer) -> InferenceConfig {
        InferenceConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            text_model: "text-model".to_string(),
            image_model: "image-model".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_reply() {
        let echoed = "User: a pen\nAssistant: \"Gel pen: smooth black ink\" ";
        assert_eq!(TextGenerator::extract_reply(echoed), "Gel pen: smooth black ink");
        assert_eq!(TextGenerator::extract_reply("  \"Ruler: 30cm\""), "Ruler: 30cm");
        assert_eq!(
            TextGenerator::extract_reply("Assistant: first Assistant: second"),
            "first"
        );
    }

    #[test]
    fn test_prompt_template_ends_with_marker() {
        let prompt = TextGenerator::build_prompt("a cheap calculator");
        assert!(prompt.contains("User: a cheap calculator"));
        assert!(prompt.ends_with(REPLY_MARKER));
        assert_eq!(prompt.matches(REPLY_MARKER).count(), 1);
    }

    #[test]
    fn test_image_input_validation() {
        let gen = ImageGenerator::new(InferenceClient::new(InferenceConfig::default()));
        assert!(gen.validate_input("Spiral notebook"));
        assert!(!gen.validate_input("   "));
        assert!(!gen.validate_input("toy WEAPON replica"));
    }

    #[test]
    fn test_model_url_trims_slash() {
        let config = InferenceConfig {
            base_url: "http://host/models/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.model_url("a/b"), "http://host/models/a/b");
    }

    #[test]
    fn test_factory_registry() {
        let mut factory = GeneratorFactory::new(InferenceConfig::default());
        assert_eq!(factory.available_types(), vec!["text", "image"]);
        assert_eq!(factory.create("image").unwrap().kind(), "image");

        let err = factory.create("audio").err().unwrap();
        assert!(err.to_string().contains("text, image"));

        factory.register("caption", build_text);
        assert_eq!(factory.available_types(), vec!["text", "image", "caption"]);
        factory.register("image", build_text);
        assert_eq!(factory.create("image").unwrap().kind(), "text");
        assert_eq!(factory.available_types().len(), 3);
    }

    #[tokio::test]
    async fn test_text_generation_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text-model"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "parameters": { "max_new_tokens": 80, "do_sample": true }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "generated_text": "prompt echo\nAssistant: \"Scientific calculator: 240 functions, solar powered\"" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let factory = GeneratorFactory::new(config_for(&server));
        let gen = factory.create("text").unwrap();
        let params = GenerationParams {
            max_tokens: Some(80),
            ..Default::default()
        };
        let out = gen.generate("a calculator for engineering", &params).await;
        assert!(out.success, "{out:?}");
        assert_eq!(
            out.content.as_deref(),
            Some("Scientific calculator: 240 functions, solar powered")
        );
    }

    #[tokio::test]
    async fn test_text_generation_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text-model"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gen = TextGenerator::new(InferenceClient::new(config_for(&server)));
        let out = gen.generate("a backpack", &GenerationParams::default()).await;
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("API error: 503"));
        assert_eq!(out.content.as_deref(), Some(NO_MATCH_REPLY));
    }

    #[tokio::test]
    async fn test_text_generation_rejects_short_prompt() {
        let server = MockServer::start().await;
        let gen = TextGenerator::new(InferenceClient::new(config_for(&server)));
        let out = gen.generate(" ab ", &GenerationParams::default()).await;
        assert!(!out.success);
        assert!(out.content.is_none());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_text_generation_unreachable_host() {
        let config = InferenceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            text_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let gen = TextGenerator::new(InferenceClient::new(config));
        let out = gen.generate("a lamp", &GenerationParams::default()).await;
        assert!(!out.success);
        assert_eq!(out.content.as_deref(), Some(UNAVAILABLE_REPLY));
    }

    #[tokio::test]
    async fn test_image_generation_base64() {
        let server = MockServer::start().await;
        let mut body = PNG_MAGIC.to_vec();
        body.extend_from_slice(b"rest-of-image");
        Mock::given(method("POST"))
            .and(path("/image-model"))
            .and(body_partial_json(json!({
                "parameters": { "width": 512, "height": 512, "num_inference_steps": 20 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let gen = ImageGenerator::new(InferenceClient::new(config_for(&server)));
        let out = gen.generate("Notebook", &GenerationParams::default()).await;
        assert!(out.success);
        let expected = base64::engine::general_purpose::STANDARD.encode(&body);
        assert_eq!(out.content.as_deref(), Some(expected.as_str()));
        assert_eq!(out.mime.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_only_200_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-model"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/text-model"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([
                { "generated_text": "Assistant: Pen: blue ink" }
            ])))
            .mount(&server)
            .await;

        let client = InferenceClient::new(config_for(&server));
        let image = ImageGenerator::new(client.clone())
            .generate("Notebook", &GenerationParams::default())
            .await;
        assert!(!image.success);
        assert_eq!(image.error.as_deref(), Some("API error: 204 - "));
        assert!(image.content.is_none());

        let text = TextGenerator::new(client)
            .generate("a pen", &GenerationParams::default())
            .await;
        assert!(!text.success);
        assert_eq!(text.error.as_deref(), Some("API error: 202"));
    }

    #[tokio::test]
    async fn test_image_generation_error_includes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-model"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let gen = ImageGenerator::new(InferenceClient::new(config_for(&server)));
        let out = gen.generate("Notebook", &GenerationParams::default()).await;
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("API error: 429 - rate limited"));
        assert!(out.content.is_none());
    }
}
