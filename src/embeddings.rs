use crate::error::Result;

/// A fixed-dimension embedding vector
pub type EmbeddingVector = Vec<f32>;

/// Maps text to embedding vectors via an embedding model.
///
/// The indexing phase and query retrieval both go through this seam, which
/// keeps the vector space consistent between stored chunks and queries and
/// lets tests substitute a deterministic in-process implementation.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Embed a batch of texts, preserving input order.
    ///
    /// The default implementation calls `embed` sequentially; providers with
    /// a batch API should override it.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
