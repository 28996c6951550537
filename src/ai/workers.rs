use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::dto::{CompletionRequest, GenerationOutput};
use super::error::ProviderError;
use super::gateway::GenerationBackend;
use crate::config::WorkersAiConfig;
use crate::embeddings::index::Embedder;

const PROVIDER: &str = "workers-ai";

/// Cloudflare Workers AI over its REST surface. Serves both text generation
/// and embeddings.
#[derive(Clone)]
pub struct WorkersAiClient {
    http: reqwest::Client,
    base: String,
    token: String,
    text_model: String,
    embedding_model: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResult {
    data: Vec<Vec<f32>>,
}

impl WorkersAiClient {
    pub fn new(http: reqwest::Client, cfg: &WorkersAiConfig) -> Self {
        Self {
            http,
            base: cfg.endpoint_base(),
            token: cfg.api_token.clone(),
            text_model: cfg.text_model.clone(),
            embedding_model: cfg.embedding_model.clone(),
        }
    }

    async fn run<T: for<'de> Deserialize<'de>>(&self, model: &str, body: Value) -> Result<T, ProviderError> {
        let res = self
            .http
            .post(format!("{}/{}", self.base, model))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = res.json().await.map_err(ProviderError::transport(PROVIDER))?;
        if envelope.success == Some(false) {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: format!("errors: {:?}", envelope.errors),
            });
        }
        envelope.result.ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            reason: "missing result".into(),
        })
    }
}

#[async_trait]
impl GenerationBackend for WorkersAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<GenerationOutput, ProviderError> {
        let body = json!({
            "messages": [
                { "role": "system", "content": req.system },
                { "role": "user", "content": req.prompt },
            ],
            "max_tokens": req.max_tokens,
            "temperature": 0,
        });
        debug!(model = %self.text_model, max_tokens = req.max_tokens, "workers-ai completion");
        let result: Value = self.run(&self.text_model, body).await?;

        let text = result
            .get("response")
            .map(|r| r.as_str().map(str::to_owned));
        match text {
            Some(Some(text)) => Ok(GenerationOutput::Text(text)),
            Some(None) => Ok(GenerationOutput::Nested(result)),
            None => Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: "result has no response field".into(),
            }),
        }
    }
}

#[async_trait]
impl Embedder for WorkersAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let result: EmbeddingResult = self
            .run(&self.embedding_model, json!({ "text": [text] }))
            .await?;
        result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: "no embedding in response".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WorkersAiClient {
        let cfg = WorkersAiConfig {
            account_id: "acct".into(),
            api_token: "cf-token".into(),
            gateway_id: None,
            base_url: Some(server.uri()),
            text_model: "@cf/meta/test-llm".into(),
            embedding_model: "@cf/baai/test-embed".into(),
        };
        WorkersAiClient::new(reqwest::Client::new(), &cfg)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "be precise".into(),
            prompt: "list ingredients".into(),
            max_tokens: 100,
            api_key: None,
        }
    }

    #[tokio::test]
    async fn completion_sends_deterministic_chat_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/@cf/meta/test-llm"))
            .and(header("authorization", "Bearer cf-token"))
            .and(body_partial_json(json!({ "temperature": 0, "max_tokens": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "response": "- 2 cups rolled oats" },
                "success": true,
                "errors": []
            })))
            .mount(&server)
            .await;

        let out = client(&server).complete(&request()).await.unwrap();
        assert_eq!(out, GenerationOutput::Text("- 2 cups rolled oats".into()));
    }

    #[tokio::test]
    async fn structured_response_is_returned_nested() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "response": { "totalCalories": 1200 } },
                "success": true
            })))
            .mount(&server)
            .await;

        let out = client(&server).complete(&request()).await.unwrap();
        assert_eq!(
            out,
            GenerationOutput::Nested(json!({ "response": { "totalCalories": 1200 } }))
        );
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/@cf/baai/test-embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "shape": [1, 3], "data": [[0.1, 0.2, 0.3]] },
                "success": true
            })))
            .mount(&server)
            .await;

        let v = client(&server).embed("oatmeal|grilled chicken").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }
}
