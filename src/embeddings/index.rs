use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::ai::ProviderError;

pub const DEFAULT_TOP_K: usize = 5;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, record: VectorRecord) -> anyhow::Result<()>;
    /// Matches with score >= `min_score`, best first, at most `top_k`.
    async fn query(&self, vector: &[f32], top_k: usize, min_score: f32) -> anyhow::Result<Vec<VectorMatch>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub session_id: String,
    pub meal_text: String,
    pub ingredients: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// A previously resolved meal close enough to reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMeal {
    pub meal_text: String,
    pub ingredients: String,
    pub similarity: f32,
}

/// Stable record id: first 16 bytes of SHA-256 over `session:meal_text`, hex encoded.
pub fn record_id(session_id: &str, meal_text: &str) -> String {
    let digest = Sha256::digest(format!("{session_id}:{meal_text}").as_bytes());
    hex::encode(&digest[..16])
}

pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedder.embed(text).await
    }

    pub async fn upsert(&self, record: VectorRecord) -> anyhow::Result<()> {
        self.store.upsert(record).await
    }

    pub async fn query(&self, vector: &[f32], top_k: usize, threshold: f32) -> anyhow::Result<Vec<VectorMatch>> {
        self.store.query(vector, top_k, threshold).await
    }

    /// Nearest stored meal at or above `threshold` for an already computed
    /// embedding. Only the single best match is considered.
    pub async fn nearest(&self, vector: &[f32], threshold: f32) -> anyhow::Result<Option<SimilarMeal>> {
        let matches = self.query(vector, DEFAULT_TOP_K, threshold).await?;
        let best = matches.into_iter().next().filter(|m| m.score >= threshold);
        if let Some(m) = &best {
            debug!(id = %m.id, score = m.score, "semantic match");
        }
        Ok(best.map(|m| SimilarMeal {
            meal_text: m.metadata.meal_text,
            ingredients: m.metadata.ingredients,
            similarity: m.score,
        }))
    }

    /// Stores `meal_text` with its ingredient list. `embedding` is reused when
    /// the caller already has it, otherwise the text is embedded here.
    pub async fn remember(
        &self,
        session_id: &str,
        meal_text: &str,
        ingredients: &str,
        embedding: Option<Vec<f32>>,
    ) -> anyhow::Result<()> {
        let embedding = match embedding {
            Some(v) => v,
            None => self.embed(meal_text).await.context("embed meal text")?,
        };
        let record = VectorRecord {
            id: record_id(session_id, meal_text),
            embedding,
            metadata: VectorMetadata {
                session_id: session_id.to_string(),
                meal_text: meal_text.to_string(),
                ingredients: ingredients.to_string(),
                timestamp: unix_millis(),
            },
        };
        self.upsert(record).await
    }
}

fn unix_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
