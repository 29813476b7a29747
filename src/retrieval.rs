use log::debug;

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::{RetrievalResult, VectorIndex};

/// Orchestrates query embedding and index search
pub struct Retriever<'a, E: Embedder> {
    embedder: &'a E,
    index: &'a VectorIndex,
}

impl<'a, E: Embedder> Retriever<'a, E> {
    pub fn new(embedder: &'a E, index: &'a VectorIndex) -> Self {
        Retriever { embedder, index }
    }

    /// Return up to `k` chunks ranked by descending relevance to the query.
    ///
    /// No minimum-score threshold is applied: callers receive the index's
    /// best-effort matches regardless of absolute relevance. An empty index
    /// yields an empty result set without calling the embedding service.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let results = self.index.search(&query_vector, k);
        debug!("Retrieved {} chunks for query", results.len());
        Ok(results)
    }
}
