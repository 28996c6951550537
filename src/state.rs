use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::ai::claude::ClaudeClient;
use crate::ai::workers::WorkersAiClient;
use crate::ai::ProviderGateway;
use crate::config::AppConfig;
use crate::embeddings::{EmbeddingIndex, MemoryVectorStore, PgVectorStore, VectorStore};
use crate::kv::{KvStore, MemoryKvStore, PgKvStore};
use crate::meal_plans::{MealPlanRepo, MemoryMealPlanRepo, PgMealPlanRepo};

#[derive(Clone)]
pub struct AppState {
    /// Present when `DATABASE_URL` is configured.
    pub db: Option<PgPool>,
    pub config: Arc<AppConfig>,
    pub kv: Arc<dyn KvStore>,
    pub plans: Arc<dyn MealPlanRepo>,
    pub index: Arc<EmbeddingIndex>,
    pub gateway: Arc<ProviderGateway>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;
        let workers = Arc::new(WorkersAiClient::new(http.clone(), &config.workers_ai));
        let claude = Arc::new(ClaudeClient::new(http, &config.claude));
        let gateway = Arc::new(ProviderGateway::new(
            workers.clone(),
            claude,
            config.claude.api_key.clone(),
        ));

        let (db, kv, plans, vectors): (
            Option<PgPool>,
            Arc<dyn KvStore>,
            Arc<dyn MealPlanRepo>,
            Arc<dyn VectorStore>,
        ) = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await?;
                (
                    Some(db.clone()),
                    Arc::new(PgKvStore::new(db.clone())),
                    Arc::new(PgMealPlanRepo::new(db.clone())),
                    Arc::new(PgVectorStore::new(db)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores");
                (
                    None,
                    Arc::new(MemoryKvStore::new()),
                    Arc::new(MemoryMealPlanRepo::new()),
                    Arc::new(MemoryVectorStore::new()),
                )
            }
        };

        Ok(Self {
            db,
            config,
            kv,
            plans,
            index: Arc::new(EmbeddingIndex::new(workers, vectors)),
            gateway,
        })
    }

    /// Memory-backed state around the given generation backends.
    #[cfg(test)]
    pub fn fake(
        workers: Arc<dyn crate::ai::gateway::GenerationBackend>,
        claude: Arc<dyn crate::ai::gateway::GenerationBackend>,
    ) -> Self {
        use crate::config::{ClaudeConfig, ResolverConfig, WorkersAiConfig};
        use crate::testing::KeywordEmbedder;

        let config = Arc::new(AppConfig {
            database_url: None,
            workers_ai: WorkersAiConfig {
                account_id: "test".into(),
                api_token: "test".into(),
                gateway_id: None,
                base_url: Some("http://127.0.0.1:0".into()),
                text_model: "text".into(),
                embedding_model: "embed".into(),
            },
            claude: ClaudeConfig {
                api_key: None,
                base_url: "http://127.0.0.1:0".into(),
                model: "claude".into(),
            },
            resolver: ResolverConfig::default(),
            upstream_timeout_secs: 5,
            request_timeout_secs: 5,
            kv_sweep_interval_secs: 60,
        });

        Self {
            db: None,
            config,
            kv: Arc::new(MemoryKvStore::new()),
            plans: Arc::new(MemoryMealPlanRepo::new()),
            index: Arc::new(EmbeddingIndex::new(
                Arc::new(KeywordEmbedder),
                Arc::new(MemoryVectorStore::new()),
            )),
            gateway: Arc::new(ProviderGateway::new(workers, claude, None)),
        }
    }
}
