use log::{info, warn};

use crate::chunking;
use crate::config::PipelineConfig;
use crate::document::Document;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::openai::Generator;
use crate::prompt::{self, ChatMessage};
use crate::retrieval::Retriever;

/// RAG (Retrieval-Augmented Generation) engine.
///
/// The pipeline context object: it owns the configuration, the API client,
/// the vector index and the conversation history, so no stage depends on
/// process-wide state. The index is built once per process run and is
/// exclusively owned by this session.
pub struct RagEngine<C: Embedder + Generator> {
    client: C,
    config: PipelineConfig,
    index: VectorIndex,
    history: Vec<ChatMessage>,
}

impl<C: Embedder + Generator> RagEngine<C> {
    pub fn new(client: C, config: PipelineConfig) -> Self {
        RagEngine {
            client,
            config,
            index: VectorIndex::empty(),
            history: Vec::new(),
        }
    }

    /// Startup phase: chunk the document, embed every chunk once and build
    /// the in-memory index. An embedding failure here aborts startup.
    pub async fn index_document(&mut self, document: &Document) -> Result<()> {
        let chunks = chunking::split_document(document, &self.config.chunking);
        info!("Split into {} chunks", chunks.len());

        if chunks.is_empty() {
            warn!("Document has no retrievable content; answers will have no context");
        }

        self.index = VectorIndex::build(chunks, &self.client).await?;
        Ok(())
    }

    /// Answer one question, forwarding each answer fragment to `on_fragment`
    /// as it arrives, and return the accumulated answer.
    ///
    /// Per-turn failures (query embedding, generation) leave the index and
    /// the conversation history untouched; the next turn works normally.
    /// The request messages and the assistant reply are appended to the
    /// history only after the stream completes cleanly.
    pub async fn answer<F>(&mut self, question: &str, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let retriever = Retriever::new(&self.client, &self.index);
        let results = retriever
            .retrieve(question, self.config.retrieval_k)
            .await?;

        if results.is_empty() {
            info!("No relevant content retrieved; answering with empty context");
        }

        let messages = prompt::compose(&results);
        let mut stream = self.client.stream_chat(&messages);

        let mut answer = String::new();
        while let Some(fragment) = stream.next_fragment().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            answer.push_str(&fragment);
        }

        self.history.extend(messages);
        self.history.push(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }

    /// Conversation messages accumulated over the session
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}
