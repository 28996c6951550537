use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::dto::{CompletionRequest, GenerationOutput};
use super::error::ProviderError;
use super::gateway::GenerationBackend;
use crate::config::ClaudeConfig;

const PROVIDER: &str = "claude";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API backend. The credential arrives with each request.
#[derive(Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    base: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeClient {
    pub fn new(http: reqwest::Client, cfg: &ClaudeConfig) -> Self {
        Self {
            http,
            base: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for ClaudeClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<GenerationOutput, ProviderError> {
        let api_key = req
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("Claude"))?;

        let body = json!({
            "model": self.model,
            "max_tokens": req.max_tokens,
            "system": req.system,
            "messages": [{ "role": "user", "content": req.prompt }],
        });
        debug!(model = %self.model, max_tokens = req.max_tokens, "claude completion");

        let res = self
            .http
            .post(format!("{}/v1/messages", self.base))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
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

        let parsed: MessagesResponse = res.json().await.map_err(ProviderError::transport(PROVIDER))?;
        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();
        Ok(GenerationOutput::Text(text))
    }
}
