pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod openai;
pub mod prompt;
pub mod rag;
pub mod retrieval;

pub use error::{Error, Result};
