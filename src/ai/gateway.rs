use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::dto::{CompletionRequest, GenerationOutput, ProviderKind, ProviderPreference};
use super::error::ProviderError;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, req: &CompletionRequest) -> Result<GenerationOutput, ProviderError>;
}

const ADAPT_SYSTEM_PROMPT: &str = "You are an expert chef that adapts precise ingredient lists between similar meals. Always provide exact quantities and specific ingredient types.";
const ADAPT_MAX_TOKENS: u32 = 800;

/// Dispatches generation to the backend named by the caller's preference.
pub struct ProviderGateway {
    workers: Arc<dyn GenerationBackend>,
    claude: Arc<dyn GenerationBackend>,
    deployment_claude_key: Option<String>,
}

impl ProviderGateway {
    pub fn new(
        workers: Arc<dyn GenerationBackend>,
        claude: Arc<dyn GenerationBackend>,
        deployment_claude_key: Option<String>,
    ) -> Self {
        Self {
            workers,
            claude,
            deployment_claude_key,
        }
    }

    #[instrument(skip(self, pref, prompt, system), fields(provider = %pref.provider))]
    pub async fn generate(
        &self,
        pref: &ProviderPreference,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<GenerationOutput, ProviderError> {
        let (backend, api_key) = match pref.provider {
            ProviderKind::WorkersAi => (&self.workers, None),
            ProviderKind::Claude => {
                let key = pref
                    .api_key
                    .clone()
                    .or_else(|| self.deployment_claude_key.clone())
                    .ok_or(ProviderError::MissingCredential("Claude"))?;
                (&self.claude, Some(key))
            }
        };
        let req = CompletionRequest {
            system: system.to_string(),
            prompt: prompt.to_string(),
            max_tokens,
            api_key,
        };
        debug!(backend = backend.name(), max_tokens, "dispatching generation");
        backend.complete(&req).await
    }

    /// Rewrites a known ingredient list so it fits a similar but different set of meals.
    pub async fn adapt(
        &self,
        pref: &ProviderPreference,
        original_meal: &str,
        target_meal: &str,
        original_ingredients: &str,
    ) -> Result<String, ProviderError> {
        let prompt = adaptation_prompt(original_meal, target_meal, original_ingredients);
        let adapted = self
            .generate(pref, &prompt, ADAPT_SYSTEM_PROMPT, ADAPT_MAX_TOKENS)
            .await?
            .into_text();
        info!(original_meal, target_meal, "ingredients adapted");
        Ok(adapted)
    }
}

pub fn adaptation_prompt(original_meal: &str, target_meal: &str, original_ingredients: &str) -> String {
    format!(
        r#"Adapt this ingredient list from "{original_meal}" to "{target_meal}".

Original ingredients:
{original_ingredients}

REQUIREMENTS:
1. Keep the same format with exact quantities and specific ingredient types
2. Make precise substitutions for the differences between meals (e.g., if changing rice to naan, substitute "2 cups jasmine rice" with "4 pieces naan bread")
3. Maintain the same level of detail and specificity
4. Use bullet points for each ingredient
5. Include all necessary ingredients with exact quantities
6. No vague terms like "as needed" or "other vegetables"

Return only the adapted ingredient list with exact quantities, no explanations."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn gateway(deployment_key: Option<&str>) -> (ProviderGateway, Arc<ScriptedBackend>, Arc<ScriptedBackend>) {
        let workers = Arc::new(ScriptedBackend::text("workers-ai", "from workers"));
        let claude = Arc::new(ScriptedBackend::text("claude", "from claude"));
        let gw = ProviderGateway::new(workers.clone(), claude.clone(), deployment_key.map(Into::into));
        (gw, workers, claude)
    }

    #[tokio::test]
    async fn default_preference_uses_workers_without_credential() {
        let (gw, workers, claude) = gateway(None);
        let out = gw
            .generate(&ProviderPreference::default(), "p", "s", 10)
            .await
            .unwrap();
        assert_eq!(out.into_text(), "from workers");
        assert_eq!(workers.calls().len(), 1);
        assert!(workers.calls()[0].api_key.is_none());
        assert!(claude.calls().is_empty());
    }

    #[tokio::test]
    async fn stored_key_overrides_deployment_key() {
        let (gw, _, claude) = gateway(Some("sk-ant-deploy"));
        let pref = ProviderPreference {
            provider: ProviderKind::Claude,
            api_key: Some("sk-ant-user".into()),
            explicitly_set: true,
        };
        gw.generate(&pref, "p", "s", 10).await.unwrap();
        assert_eq!(claude.calls()[0].api_key.as_deref(), Some("sk-ant-user"));
    }

    #[tokio::test]
    async fn deployment_key_is_the_fallback() {
        let (gw, _, claude) = gateway(Some("sk-ant-deploy"));
        let pref = ProviderPreference {
            provider: ProviderKind::Claude,
            ..Default::default()
        };
        gw.generate(&pref, "p", "s", 10).await.unwrap();
        assert_eq!(claude.calls()[0].api_key.as_deref(), Some("sk-ant-deploy"));
    }

    #[tokio::test]
    async fn claude_without_any_key_is_a_configuration_error() {
        let (gw, _, claude) = gateway(None);
        let pref = ProviderPreference {
            provider: ProviderKind::Claude,
            ..Default::default()
        };
        let err = gw.generate(&pref, "p", "s", 10).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
        assert!(claude.calls().is_empty());
    }

    #[tokio::test]
    async fn adapt_builds_substitution_prompt() {
        let (gw, workers, _) = gateway(None);
        gw.adapt(&ProviderPreference::default(), "rice|curry", "curry|naan", "- 2 cups jasmine rice")
            .await
            .unwrap();
        let calls = workers.calls();
        let call = &calls[0];
        assert_eq!(call.max_tokens, ADAPT_MAX_TOKENS);
        assert!(call.prompt.contains(r#"from "rice|curry" to "curry|naan""#));
        assert!(call.prompt.contains("- 2 cups jasmine rice"));
    }
}
