//! Recommendation pipeline: text suggestion, then an optional product image.

use serde::{Deserialize, Serialize};

use crate::generator::{
    GenerationParams, GeneratorFactory, DEFAULT_IMAGE_SIZE, DEFAULT_IMAGE_STEPS,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, NO_MATCH_MARKER,
};
use crate::storage::product_name_part;
use crate::types::{CatalogError, CatalogResult};

const MIN_DESCRIPTION_CHARS: usize = 3;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const TEMPERATURE_RANGE: (f64, f64) = (0.1, 2.0);
const MAX_TOKENS_RANGE: (u32, u32) = (10, 200);

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_generate_image() -> bool {
    true
}

/// Body of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generate_image")]
    pub generate_image: bool,
}

impl RecommendationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            generate_image: true,
        }
    }

    /// Trim the description and check every field's range.
    pub fn validate(mut self) -> CatalogResult<Self> {
        self.description = validate_description(&self.description)?;

        let (lo, hi) = TEMPERATURE_RANGE;
        if !(lo..=hi).contains(&self.temperature) {
            return Err(CatalogError::validation(
                "temperature",
                format!("Temperature must be between {lo} and {hi}."),
            ));
        }
        let (lo, hi) = MAX_TOKENS_RANGE;
        if !(lo..=hi).contains(&self.max_tokens) {
            return Err(CatalogError::validation(
                "max_tokens",
                format!("max_tokens must be between {lo} and {hi}."),
            ));
        }
        Ok(self)
    }
}

/// Trim a free-text product description and check it is usable.
pub fn validate_description(raw: &str) -> CatalogResult<String> {
    let description = raw.trim();
    let chars = description.chars().count();
    if chars < MIN_DESCRIPTION_CHARS {
        return Err(CatalogError::validation(
            "descripcion",
            "The description must be at least 3 characters long.",
        ));
    }
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(CatalogError::validation(
            "descripcion",
            "The description cannot exceed 1000 characters.",
        ));
    }
    if !description.chars().any(char::is_alphanumeric) {
        return Err(CatalogError::validation(
            "descripcion",
            "The description must contain letters or numbers.",
        ));
    }
    Ok(description.to_string())
}

/// What the generators produced for one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecommendationDraft {
    pub product: String,
    /// Base64 image, empty when none was generated.
    pub image_base64: String,
    pub image_mime: Option<String>,
}

impl RecommendationDraft {
    pub fn has_image(&self) -> bool {
        !self.image_base64.is_empty()
    }

    /// `data:` URL for storage, or an empty string without an image.
    pub fn image_data_url(&self) -> String {
        if !self.has_image() {
            return String::new();
        }
        let mime = self.image_mime.as_deref().unwrap_or("image/png");
        format!("data:{mime};base64,{}", self.image_base64)
    }
}

/// Drives the `text` and `image` generators for a request.
#[derive(Clone)]
pub struct Recommender {
    factory: GeneratorFactory,
}

impl Recommender {
    pub fn new(factory: GeneratorFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &GeneratorFactory {
        &self.factory
    }

    /// Generate a product suggestion for an already validated request.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> CatalogResult<RecommendationDraft> {
        let text = self.factory.create("text")?;
        let params = GenerationParams {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };
        let reply = text.generate(&request.description, &params).await;
        if !reply.success {
            let error = reply
                .error
                .unwrap_or_else(|| "text generation failed".to_string());
            tracing::warn!("Text generation failed: {error}");
            return Err(CatalogError::Generation(error));
        }

        let mut draft = RecommendationDraft {
            product: reply.content.unwrap_or_default(),
            ..Default::default()
        };

        if request.generate_image
            && !draft.product.is_empty()
            && !draft.product.contains(NO_MATCH_MARKER)
        {
            let name = product_name_part(&draft.product);
            let image = self.factory.create("image")?;
            let params = GenerationParams {
                width: Some(DEFAULT_IMAGE_SIZE),
                height: Some(DEFAULT_IMAGE_SIZE),
                steps: Some(DEFAULT_IMAGE_STEPS),
                ..Default::default()
            };
            let out = image.generate(name, &params).await;
            match (out.success, out.content) {
                (true, Some(b64)) => {
                    draft.image_base64 = b64;
                    draft.image_mime = out.mime;
                }
                _ => {
                    tracing::warn!(
                        product = name,
                        "Image generation failed: {}",
                        out.error.unwrap_or_default()
                    );
                }
            }
        }

        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::InferenceConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recommender(server: &MockServer) -> Recommender {
        Recommender::new(GeneratorFactory::new(InferenceConfig {
            base_url: server.uri(),
            api_key: Some("k".to_string()),
            text_model: "text".to_string(),
            image_model: "image".to_string(),
            ..Default::default()
        }))
    }

    async fn mount_text(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/text"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "generated_text": format!("Assistant: {reply}") }])),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: RecommendationRequest =
            serde_json::from_value(json!({ "descripcion": "a pen" })).unwrap();
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 50);
        assert!(req.generate_image);
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            RecommendationRequest::new("  a pen  ").validate().unwrap().description,
            "a pen"
        );
        assert!(RecommendationRequest::new("ab").validate().is_err());
        assert!(RecommendationRequest::new("!!!???").validate().is_err());
        assert!(RecommendationRequest::new("x".repeat(1001)).validate().is_err());

        let mut hot = RecommendationRequest::new("a pen");
        hot.temperature = 2.5;
        assert!(hot.validate().is_err());

        let mut short = RecommendationRequest::new("a pen");
        short.max_tokens = 5;
        let err = short.validate().unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "max_tokens"));
    }

    #[test]
    fn test_data_url() {
        assert_eq!(RecommendationDraft::default().image_data_url(), "");
        let draft = RecommendationDraft {
            product: "Pen".to_string(),
            image_base64: "QUJD".to_string(),
            image_mime: Some("image/jpeg".to_string()),
        };
        assert_eq!(draft.image_data_url(), "data:image/jpeg;base64,QUJD");
    }

    #[tokio::test]
    async fn test_recommend_with_image() {
        let server = MockServer::start().await;
        mount_text(&server, "Gel pen: smooth black ink").await;
        Mock::given(method("POST"))
            .and(path("/image"))
            .and(body_string_contains("Professional photograph of Gel pen,"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ABC".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let draft = recommender(&server)
            .recommend(&RecommendationRequest::new("something to write with"))
            .await
            .unwrap();
        assert_eq!(draft.product, "Gel pen: smooth black ink");
        assert_eq!(draft.image_base64, "QUJD");
        assert!(draft.image_data_url().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_no_match_skips_image() {
        let server = MockServer::start().await;
        mount_text(&server, "No products found for that.").await;
        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let draft = recommender(&server)
            .recommend(&RecommendationRequest::new("zzzz"))
            .await
            .unwrap();
        assert!(!draft.has_image());
    }

    #[tokio::test]
    async fn test_image_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount_text(&server, "Ruler: 30cm aluminium").await;
        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let draft = recommender(&server)
            .recommend(&RecommendationRequest::new("something to measure"))
            .await
            .unwrap();
        assert_eq!(draft.product, "Ruler: 30cm aluminium");
        assert!(!draft.has_image());
    }

    #[tokio::test]
    async fn test_text_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = recommender(&server)
            .recommend(&RecommendationRequest::new("a lamp"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Generation(ref e) if e == "API error: 503"));
    }
}
