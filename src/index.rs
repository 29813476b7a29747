use std::cmp::Ordering;

use log::info;

use crate::chunking::Chunk;
use crate::embeddings::{Embedder, EmbeddingVector};
use crate::error::{Error, Result};

/// A stored (vector, chunk) pair; append-only, never mutated after indexing
#[derive(Debug, Clone)]
struct IndexEntry {
    vector: EmbeddingVector,
    chunk: Chunk,
}

/// A chunk plus its relevance score for one query (higher = more similar)
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// In-memory vector index over the chunks of one document.
///
/// Brute-force cosine similarity search, rebuilt from scratch every process
/// run and exclusively owned by the session that built it. Entries keep
/// their insertion order so that equal scores resolve deterministically in
/// favor of the earlier-indexed chunk.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// An index with no entries
    pub fn empty() -> Self {
        VectorIndex::default()
    }

    /// Embed every chunk once (batch) and store one entry per chunk, in
    /// input order.
    pub async fn build<E: Embedder>(chunks: Vec<Chunk>, embedder: &E) -> Result<Self> {
        if chunks.is_empty() {
            return Ok(VectorIndex::empty());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_many(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries: Vec<IndexEntry> = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| IndexEntry { vector, chunk })
            .collect();

        info!("Indexed {} chunks", entries.len());
        Ok(VectorIndex { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `k` entries ranked by descending cosine similarity to
    /// the query vector. Equal scores keep indexing order. A `k` larger
    /// than the number of entries returns all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievalResult> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order for ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| RetrievalResult {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            page_number: 1,
            offset: 0,
        }
    }

    fn index_from(vectors: Vec<EmbeddingVector>, texts: Vec<&str>) -> VectorIndex {
        VectorIndex {
            entries: vectors
                .into_iter()
                .zip(texts)
                .map(|(vector, text)| IndexEntry {
                    vector,
                    chunk: make_chunk(text),
                })
                .collect(),
        }
    }

    struct CountingEmbedder;

    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            // Deterministic vector derived from the text content
            let mut v = vec![0.0f32; 8];
            for b in text.bytes() {
                v[(b % 8) as usize] += 1.0;
            }
            Ok(v)
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_norm() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[tokio::test]
    async fn test_build_creates_one_entry_per_chunk() {
        let chunks = vec![make_chunk("alpha"), make_chunk("beta"), make_chunk("gamma")];
        let index = VectorIndex::build(chunks, &CountingEmbedder).await.unwrap();
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_build_empty_chunks() {
        let index = VectorIndex::build(Vec::new(), &CountingEmbedder)
            .await
            .unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_search_returns_sorted() {
        let index = index_from(
            vec![
                vec![0.0, 1.0, 0.0], // orthogonal to query
                vec![1.0, 0.0, 0.0], // identical to query
                vec![0.5, 0.5, 0.0], // somewhat similar
            ],
            vec!["far", "close", "medium"],
        );

        let results = index.search(&[1.0, 0.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.text, "close");
        assert_eq!(results[1].chunk.text, "medium");
        assert_eq!(results[2].chunk.text, "far");
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn test_search_ties_keep_indexing_order() {
        // Same direction, different magnitude: identical cosine scores
        let index = index_from(
            vec![
                vec![2.0, 0.0],
                vec![1.0, 0.0],
                vec![4.0, 0.0],
            ],
            vec!["first", "second", "third"],
        );

        let results = index.search(&[1.0, 0.0], 3);
        assert_eq!(results[0].chunk.text, "first");
        assert_eq!(results[1].chunk.text, "second");
        assert_eq!(results[2].chunk.text, "third");
    }

    #[test]
    fn test_search_respects_k() {
        let index = index_from(
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.8, 0.2]],
            vec!["a", "b", "c"],
        );
        assert_eq!(index.search(&[1.0, 0.0], 2).len(), 2);
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let index = index_from(vec![vec![1.0, 0.0]], vec!["only"]);
        let results = index.search(&[1.0, 0.0], 100);
        assert_eq!(results.len(), 1);
    }
}
