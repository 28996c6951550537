//! In-process doubles for the provider, embedding and storage seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ai::dto::{CompletionRequest, GenerationOutput};
use crate::ai::gateway::GenerationBackend;
use crate::ai::ProviderError;
use crate::embeddings::index::{VectorMatch, VectorRecord};
use crate::embeddings::{Embedder, VectorStore};
use crate::kv::KvStore;

#[derive(Clone)]
enum Step {
    Reply(GenerationOutput),
    Fail,
}

/// Replies from a script, one step per call; the last step repeats. Records
/// every request it receives.
pub struct ScriptedBackend {
    name: &'static str,
    steps: Vec<Step>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn scripted(name: &'static str, steps: Vec<Step>) -> Self {
        Self {
            name,
            steps,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(name: &'static str, reply: &str) -> Self {
        Self::reply(name, GenerationOutput::Text(reply.to_string()))
    }

    pub fn reply(name: &'static str, output: GenerationOutput) -> Self {
        Self::scripted(name, vec![Step::Reply(output)])
    }

    /// Every call fails with a 502 from upstream.
    pub fn failing(name: &'static str) -> Self {
        Self::scripted(name, vec![Step::Fail])
    }

    /// First call fails, every later call returns `reply`.
    pub fn failing_once(name: &'static str, reply: &str) -> Self {
        Self::scripted(
            name,
            vec![Step::Fail, Step::Reply(GenerationOutput::Text(reply.to_string()))],
        )
    }

    /// Returns `replies` in order, then keeps returning the last one.
    pub fn texts(name: &'static str, replies: &[&str]) -> Self {
        let steps = replies
            .iter()
            .map(|r| Step::Reply(GenerationOutput::Text(r.to_string())))
            .collect();
        Self::scripted(name, steps)
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<GenerationOutput, ProviderError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(req.clone());
            calls.len() - 1
        };
        let step = self.steps.get(n).or(self.steps.last()).cloned().unwrap_or(Step::Fail);
        match step {
            Step::Reply(out) => Ok(out),
            Step::Fail => Err(ProviderError::Upstream {
                provider: self.name,
                status: 502,
                body: "bad gateway".into(),
            }),
        }
    }
}

const KEYWORD_DIMS: usize = 64;

/// Bag-of-words embedding: each lowercase word bumps one bucket. Identical
/// texts embed identically; disjoint vocabularies rarely overlap.
pub struct KeywordEmbedder;

fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; KEYWORD_DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        v[bucket % KEYWORD_DIMS] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(keyword_vector(text))
    }
}

/// [`KeywordEmbedder`] that counts how often it is called.
#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Upstream {
            provider: "Workers AI",
            status: 503,
            body: "embedding model unavailable".into(),
        })
    }
}

/// Answers every query with the same matches, ignoring the score floor.
pub struct ScriptedVectorStore {
    matches: Vec<VectorMatch>,
}

impl ScriptedVectorStore {
    pub fn with_matches(matches: Vec<VectorMatch>) -> Self {
        Self { matches }
    }
}

#[async_trait]
impl VectorStore for ScriptedVectorStore {
    async fn upsert(&self, _record: VectorRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn query(&self, _vector: &[f32], top_k: usize, _min_score: f32) -> anyhow::Result<Vec<VectorMatch>> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

pub struct FailingKvStore;

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("kv unavailable")
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> anyhow::Result<()> {
        anyhow::bail!("kv unavailable")
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        anyhow::bail!("kv unavailable")
    }
}

/// Pool on `DATABASE_URL` with migrations applied. `None` when the variable is
/// unset, so Postgres-backed tests skip on machines without a database.
pub async fn pg_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty())?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    Some(pool)
}

/// Suffix that keeps rows from separate test runs apart in a shared database.
pub fn run_id() -> i128 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos()
}
