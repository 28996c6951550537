use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;

use super::index::{VectorMatch, VectorMetadata, VectorRecord, VectorStore};
use super::similarity::rank_top_k;

#[derive(Debug, FromRow)]
struct VectorMatchRow {
    id: String,
    session_id: String,
    meal_text: String,
    ingredients: String,
    stored_at: i64,
    score: f64,
}

impl From<VectorMatchRow> for VectorMatch {
    fn from(r: VectorMatchRow) -> Self {
        Self {
            id: r.id,
            score: r.score as f32,
            metadata: VectorMetadata {
                session_id: r.session_id,
                meal_text: r.meal_text,
                ingredients: r.ingredients,
                timestamp: r.stored_at,
            },
        }
    }
}

/// Vectors persisted in Postgres as pgvector `vector` values; ranking by
/// cosine distance happens in SQL.
#[derive(Clone)]
pub struct PgVectorStore {
    db: PgPool,
}

impl PgVectorStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert(&self, record: VectorRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meal_vectors (id, embedding, session_id, meal_text, ingredients, stored_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET embedding = EXCLUDED.embedding,
                          ingredients = EXCLUDED.ingredients,
                          stored_at = EXCLUDED.stored_at
            "#,
        )
        .bind(&record.id)
        .bind(Vector::from(record.embedding))
        .bind(&record.metadata.session_id)
        .bind(&record.metadata.meal_text)
        .bind(&record.metadata.ingredients)
        .bind(record.metadata.timestamp)
        .execute(&self.db)
        .await
        .context("upsert meal vector")?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize, min_score: f32) -> anyhow::Result<Vec<VectorMatch>> {
        // rows of another dimension are filtered out before any distance is taken
        let rows = sqlx::query_as::<_, VectorMatchRow>(
            r#"
            WITH candidates AS MATERIALIZED (
                SELECT id, embedding, session_id, meal_text, ingredients, stored_at
                FROM meal_vectors
                WHERE vector_dims(embedding) = $2
            )
            SELECT id, session_id, meal_text, ingredients, stored_at,
                   (1 - (embedding <=> $1))::FLOAT8 AS score
            FROM candidates
            WHERE 1 - (embedding <=> $1) >= $3
            ORDER BY embedding <=> $1
            LIMIT $4
            "#,
        )
        .bind(Vector::from(vector.to_vec()))
        .bind(vector.len() as i32)
        .bind(min_score as f64)
        .bind(top_k as i64)
        .fetch_all(&self.db)
        .await
        .context("query meal vectors")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Process-local vector store used when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryVectorStore {
    records: Arc<RwLock<HashMap<String, VectorRecord>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> anyhow::Result<()> {
        self.records.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize, min_score: f32) -> anyhow::Result<Vec<VectorMatch>> {
        let records = self.records.read().await;
        let candidates = records.values().map(|r| (r.embedding.as_slice(), r));
        Ok(rank_top_k(vector, candidates, top_k, min_score)
            .into_iter()
            .map(|(score, r)| VectorMatch {
                id: r.id.clone(),
                score,
                metadata: r.metadata.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            embedding,
            metadata: VectorMetadata {
                session_id: "s1".into(),
                meal_text: id.into(),
                ingredients: String::new(),
                timestamp: 1,
            },
        }
    }

    #[tokio::test]
    async fn query_ranks_descending_and_applies_threshold() {
        let store = MemoryVectorStore::new();
        store.upsert(record("exact", vec![1.0, 0.0])).await.unwrap();
        store.upsert(record("close", vec![0.95, 0.05])).await.unwrap();
        store.upsert(record("far", vec![0.0, 1.0])).await.unwrap();

        let matches = store.query(&[1.0, 0.0], 5, 0.9).await.unwrap();
        let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn upsert_with_same_id_replaces() {
        let store = MemoryVectorStore::new();
        store.upsert(record("a", vec![1.0, 0.0])).await.unwrap();
        store.upsert(record("a", vec![0.0, 1.0])).await.unwrap();
        assert_eq!(store.len().await, 1);
        let matches = store.query(&[0.0, 1.0], 5, 0.99).await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn pg_query_ranks_in_sql_with_floor_and_limit() {
        let Some(db) = crate::testing::pg_pool().await else {
            return;
        };
        let store = PgVectorStore::new(db.clone());
        let run = crate::testing::run_id();
        // a run-specific dimension keeps rows from other runs out of the ranking
        let dims = 16 + (run % 1000) as usize;
        let axis = |i: usize, w: f32| {
            let mut v = vec![0.0; dims];
            v[0] = 1.0 - w;
            v[i] = w;
            v
        };
        let session = format!("vec-{run}");
        for (id, v) in [("exact", axis(1, 0.0)), ("close", axis(1, 0.1)), ("far", axis(1, 1.0))] {
            let mut r = record(&format!("{session}-{id}"), v);
            r.metadata.session_id = session.clone();
            store.upsert(r).await.unwrap();
        }

        let matches = store.query(&axis(1, 0.0), 5, 0.9).await.unwrap();
        let prefix = format!("{session}-");
        let ids: Vec<_> = matches
            .iter()
            .map(|m| m.id.trim_start_matches(&prefix))
            .collect();
        assert_eq!(ids, vec!["exact", "close"]);
        assert!((matches[0].score - 1.0).abs() < 1e-4);

        let top = store.query(&axis(1, 0.0), 1, 0.0).await.unwrap();
        assert_eq!(top.len(), 1);

        sqlx::query("DELETE FROM meal_vectors WHERE session_id = $1")
            .bind(&session)
            .execute(&db)
            .await
            .unwrap();
    }
}

