use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_RETRIEVAL_K: usize = 5;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Chunking parameters, validated at construction
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    /// Create a chunking configuration.
    ///
    /// Requires `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(ChunkConfig {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        ChunkConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Pipeline configuration: document path, chunking bounds, retrieval depth
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the document to answer questions about
    pub document_path: PathBuf,
    /// Chunking parameters
    pub chunking: ChunkConfig,
    /// Number of chunks retrieved per query
    pub retrieval_k: usize,
}

impl PipelineConfig {
    /// Build the configuration from the environment.
    ///
    /// The document path comes from the CLI argument when given, otherwise
    /// from `PDF_PATH`. `CHUNK_SIZE`, `CHUNK_OVERLAP` and `RETRIEVAL_K`
    /// override the defaults (1000 / 100 / 5).
    pub fn from_env(cli_path: Option<PathBuf>) -> Result<Self> {
        let document_path = match cli_path.or_else(|| env::var("PDF_PATH").ok().map(PathBuf::from))
        {
            Some(path) => path,
            None => {
                return Err(Error::Configuration(
                    "no document path given; pass it as an argument or set PDF_PATH".to_string(),
                ))
            }
        };

        let chunk_size = read_usize("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = read_usize("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let retrieval_k = read_usize("RETRIEVAL_K", DEFAULT_RETRIEVAL_K)?;

        Ok(PipelineConfig {
            document_path,
            chunking: ChunkConfig::new(chunk_size, chunk_overlap)?,
            retrieval_k,
        })
    }
}

/// Configuration for the OpenAI API
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub embeddings_url: String,
    pub chat_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl OpenAiConfig {
    /// Create a new configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_API_BASE`,
    /// `OPENAI_EMBEDDING_MODEL` and `OPENAI_CHAT_MODEL` have defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = match env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Err(Error::Configuration(
                    "OPENAI_API_KEY not found; check your .env file or environment variables"
                        .to_string(),
                ))
            }
        };

        let base = env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let base = base.trim_end_matches('/').to_string();

        Ok(OpenAiConfig {
            api_key,
            embeddings_url: format!("{}/embeddings", base),
            chat_url: format!("{}/chat/completions", base),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: env::var("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
        })
    }
}

fn read_usize(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Configuration(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}
