use anyhow::Context;
use tracing::warn;

use super::dto::{ProviderKind, ProviderPreference};
use crate::kv::KvStore;

pub const PROVIDER_KEY: &str = "ai-provider";
pub const PROVIDER_SET_KEY: &str = "ai-provider-set";
pub const CLAUDE_KEY_KEY: &str = "claude-api-key";

pub const CLAUDE_KEY_PREFIX: &str = "sk-ant-";

/// Reads the stored preference. Store failures and unknown values fall back to
/// the edge provider.
pub async fn load(kv: &dyn KvStore) -> ProviderPreference {
    let provider = match kv.get(PROVIDER_KEY).await {
        Ok(Some(v)) => ProviderKind::parse(&v).unwrap_or_else(|| {
            warn!(value = %v, "unknown stored ai provider, using default");
            ProviderKind::default()
        }),
        Ok(None) => ProviderKind::default(),
        Err(e) => {
            warn!(error = %e, "failed to read ai provider, using default");
            ProviderKind::default()
        }
    };
    let explicitly_set = matches!(kv.get(PROVIDER_SET_KEY).await, Ok(Some(v)) if v == "true");
    let api_key = match kv.get(CLAUDE_KEY_KEY).await {
        Ok(key) => key.filter(|k| !k.is_empty()),
        Err(e) => {
            warn!(error = %e, "failed to read stored claude key");
            None
        }
    };
    ProviderPreference {
        provider,
        api_key,
        explicitly_set,
    }
}

pub fn is_valid_claude_key(key: &str) -> bool {
    key.starts_with(CLAUDE_KEY_PREFIX)
}

/// Persists an explicit choice. Entries carry no expiry.
pub async fn store(kv: &dyn KvStore, provider: ProviderKind, api_key: Option<&str>) -> anyhow::Result<()> {
    if let Some(key) = api_key {
        kv.put(CLAUDE_KEY_KEY, key, None).await.context("store claude key")?;
    }
    kv.put(PROVIDER_KEY, provider.as_str(), None)
        .await
        .context("store ai provider")?;
    kv.put(PROVIDER_SET_KEY, "true", None)
        .await
        .context("store ai provider flag")?;
    Ok(())
}
