//! Embedding capability trait, similarity functions, and top-k selection

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default number of texts flushed per embedding batch
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 10;

/// Trait for embedding models
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of produced vectors
    fn dim(&self) -> usize;
}

/// Similarity/distance modes for embedding comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

/// Compute embedding similarity under the given mode.
///
/// Euclidean distance is negated so that "larger is better" holds for
/// every mode.
pub fn similarity(a: &[f32], b: &[f32], mode: SimilarityMode) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    match mode {
        SimilarityMode::Euclidean => {
            let dist_sq: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
            -dist_sq.sqrt()
        }
        SimilarityMode::DotProduct => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        SimilarityMode::Cosine => {
            let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                return 0.0;
            }
            dot / (norm_a * norm_b)
        }
    }
}

/// An id paired with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// Select the top-k ids by similarity to the query embedding.
///
/// Linear scan over every candidate; approximate nearest-neighbor search is
/// the job of external vector-store backends. The sort is stable, so equal
/// scores keep their original input order. An optional cutoff drops
/// candidates scoring at or below the threshold before taking k.
pub fn get_top_k(
    query_embedding: &[f32],
    embeddings: &[Vec<f32>],
    ids: &[String],
    top_k: usize,
    cutoff: Option<f32>,
    mode: SimilarityMode,
) -> Result<Vec<ScoredId>> {
    if embeddings.len() != ids.len() {
        return Err(Error::InvalidInput(format!(
            "embeddings and ids length mismatch: {} vs {}",
            embeddings.len(),
            ids.len()
        )));
    }

    let mut scored: Vec<ScoredId> = embeddings
        .iter()
        .zip(ids.iter())
        .map(|(emb, id)| ScoredId {
            id: id.clone(),
            score: similarity(query_embedding, emb, mode),
        })
        .collect();

    // Vec::sort_by is stable: ties keep insertion order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    if let Some(threshold) = cutoff {
        scored.retain(|s| s.score > threshold);
    }

    scored.truncate(top_k);
    Ok(scored)
}

/// Queue of texts awaiting embedding, flushed in enqueue order.
///
/// Texts are flushed through `embed_batch` in batches of `batch_size`;
/// a partial final batch still flushes, so no work is dropped at the tail.
pub struct EmbeddingQueue {
    batch_size: usize,
    queue: Vec<(String, String)>,
}

impl EmbeddingQueue {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            queue: Vec::new(),
        }
    }

    /// Enqueue a text keyed by id
    pub fn push(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.queue.push((id.into(), text.into()));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Flush all queued texts through the embedder, returning `(id, vector)`
    /// pairs in enqueue order
    pub async fn flush(&mut self, embedder: &dyn Embedder) -> Result<Vec<(String, Vec<f32>)>> {
        let pending = std::mem::take(&mut self.queue);
        let mut out = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, t)| t.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            for ((id, _), vector) in batch.iter().zip(vectors) {
                out.push((id.clone(), vector));
            }
        }
        Ok(out)
    }
}
