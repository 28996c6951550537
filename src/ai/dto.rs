use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which text-generation backend serves a request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "workers-ai")]
    WorkersAi,
    #[serde(rename = "claude")]
    Claude,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::WorkersAi => "workers-ai",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "workers-ai" => Some(ProviderKind::WorkersAi),
            "claude" => Some(ProviderKind::Claude),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime-wide backend choice, loaded per request and passed along explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderPreference {
    pub provider: ProviderKind,
    /// Per-installation Claude key; takes precedence over the deployment secret.
    pub api_key: Option<String>,
    pub explicitly_set: bool,
}

/// What a backend returned: plain text, or an object carrying a nested `response`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Text(String),
    Nested(Value),
}

impl GenerationOutput {
    /// Flattens the output to text, serialising structured payloads.
    pub fn into_text(self) -> String {
        match self {
            GenerationOutput::Text(s) => s,
            GenerationOutput::Nested(v) => match v.get("response") {
                Some(Value::String(s)) => s.clone(),
                Some(inner) => inner.to_string(),
                None => v.to_string(),
            },
        }
    }

    /// Raw form for diagnostics.
    pub fn raw(&self) -> String {
        match self {
            GenerationOutput::Text(s) => s.clone(),
            GenerationOutput::Nested(v) => v.to_string(),
        }
    }
}

/// A single system + user exchange sent to a backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProviderRequest {
    pub provider: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetProviderResponse {
    pub success: bool,
    pub provider: ProviderKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProviderResponse {
    pub success: bool,
    pub provider: ProviderKind,
    pub explicitly_set: bool,
}
