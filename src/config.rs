use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiConfig {
    pub account_id: String,
    pub api_token: String,
    /// Routes calls through an AI Gateway when set.
    pub gateway_id: Option<String>,
    /// Overrides the computed endpoint base (used against local mocks).
    pub base_url: Option<String>,
    pub text_model: String,
    pub embedding_model: String,
}

impl WorkersAiConfig {
    pub fn endpoint_base(&self) -> String {
        if let Some(base) = &self.base_url {
            return base.trim_end_matches('/').to_string();
        }
        match &self.gateway_id {
            Some(gw) => format!(
                "https://gateway.ai.cloudflare.com/v1/{}/{}/workers-ai",
                self.account_id, gw
            ),
            None => format!(
                "https://api.cloudflare.com/client/v4/accounts/{}/ai/run",
                self.account_id
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeConfig {
    /// Deployment-wide secret; a key stored through set-ai-provider wins over it.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    pub similarity_threshold: f32,
    pub cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.9,
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// In-memory stores are used when unset.
    pub database_url: Option<String>,
    pub workers_ai: WorkersAiConfig,
    pub claude: ClaudeConfig,
    pub resolver: ResolverConfig,
    pub upstream_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub kv_sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let workers_ai = WorkersAiConfig {
            account_id: std::env::var("CF_ACCOUNT_ID").unwrap_or_default(),
            api_token: std::env::var("CF_API_TOKEN").unwrap_or_default(),
            gateway_id: std::env::var("CF_AI_GATEWAY_ID").ok().filter(|v| !v.is_empty()),
            base_url: std::env::var("WORKERS_AI_BASE_URL").ok().filter(|v| !v.is_empty()),
            text_model: std::env::var("WORKERS_AI_TEXT_MODEL")
                .unwrap_or_else(|_| "@cf/meta/llama-3.3-70b-instruct-fp8-fast".into()),
            embedding_model: std::env::var("WORKERS_AI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "@cf/baai/bge-base-en-v1.5".into()),
        };
        let claude = ClaudeConfig {
            api_key: std::env::var("CLAUDE_API_KEY").ok().filter(|v| !v.is_empty()),
            base_url: std::env::var("CLAUDE_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".into()),
            model: std::env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".into()),
        };
        let defaults = ResolverConfig::default();
        let resolver = ResolverConfig {
            similarity_threshold: env_parse("SIMILARITY_THRESHOLD")
                .unwrap_or(defaults.similarity_threshold),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl_secs),
        };
        anyhow::ensure!(
            (0.0..=1.0).contains(&resolver.similarity_threshold),
            "SIMILARITY_THRESHOLD must be within [0, 1]"
        );

        Ok(Self {
            database_url,
            workers_ai,
            claude,
            resolver,
            upstream_timeout_secs: env_parse("UPSTREAM_TIMEOUT_SECS").unwrap_or(60),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(120),
            kv_sweep_interval_secs: env_parse("KV_SWEEP_INTERVAL_SECS").unwrap_or(300),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
