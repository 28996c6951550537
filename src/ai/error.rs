/// Failures talking to a generation or embedding backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} API error: {status}{}", body_excerpt(.body))]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{0} API key not configured")]
    MissingCredential(&'static str),
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned an unexpected payload: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

const BODY_EXCERPT_CHARS: usize = 200;

fn body_excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    let mut excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    if body.chars().count() > BODY_EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    format!(" - {excerpt}")
}

impl ProviderError {
    pub fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }
}
