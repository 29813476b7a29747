use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the RAG pipeline
///
/// Configuration and document errors are fatal and stop the process before
/// any session state exists. Embedding errors are fatal while the index is
/// being built but only abort the current turn once the session is running.
/// Generation errors are always scoped to a single turn.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (credential, paths, chunking bounds)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document could not be loaded or its text extracted
    #[error("document error: {0}")]
    Document(String),

    /// The embedding service failed for a chunk batch or a query
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The generation request or its stream failed
    #[error("generation failed: {0}")]
    Generation(String),
}
