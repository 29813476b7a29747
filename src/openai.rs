use futures_util::StreamExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::OpenAiConfig;
use crate::embeddings::{Embedder, EmbeddingVector};
use crate::error::{Error, Result};
use crate::prompt::ChatMessage;

/// Buffered fragments between the streaming task and the consumer
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Starts a streaming chat completion for a composed conversation
pub trait Generator {
    /// Issue the request and return the stream of answer fragments.
    /// The stream is lazy and not restartable.
    fn stream_chat(&self, messages: &[ChatMessage]) -> AnswerStream;
}

/// Client for the OpenAI embeddings and chat completion APIs
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAiClient { config, client }
    }

    /// Embed a batch of texts in a single request, preserving input order
    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<EmbeddingVector>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
            index: usize,
        }

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.config.embeddings_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Embedding(format!(
                "API request failed: {} {}",
                status, body
            )));
        }

        let mut response_data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("malformed response: {}", e)))?;

        // The API tags each vector with its input position
        response_data.data.sort_by_key(|d| d.index);

        if response_data.data.len() != inputs.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                response_data.data.len()
            )));
        }

        Ok(response_data.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let inputs = [text.to_string()];
        let mut vectors = self.request_embeddings(&inputs).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding batch of {} texts", texts.len());
        self.request_embeddings(texts).await
    }
}

impl Generator for OpenAiClient {
    fn stream_chat(&self, messages: &[ChatMessage]) -> AnswerStream {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let client = self.client.clone();
        let config = self.config.clone();
        let messages = messages.to_vec();

        tokio::spawn(async move {
            if let Err(error) = run_chat_stream(client, config, messages, &tx).await {
                // Surface the failure as a terminal event, never a silent close
                let _ = tx.send(StreamEvent::Failed(error)).await;
            }
        });

        AnswerStream::from_receiver(rx)
    }
}

/// Drive one streaming chat request, forwarding each text fragment over the
/// channel. Returning `Ok(())` closes the channel cleanly (the `[DONE]`
/// frame was seen); any error becomes a `Failed` event at the call site.
async fn run_chat_stream(
    client: reqwest::Client,
    config: OpenAiConfig,
    messages: Vec<ChatMessage>,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<()> {
    #[derive(Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: &'a [ChatMessage],
        stream: bool,
    }

    let request = ChatRequest {
        model: &config.chat_model,
        messages: &messages,
        stream: true,
    };

    let response = client
        .post(&config.chat_url)
        .bearer_auth(&config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::Generation(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(Error::Generation(format!(
            "API request failed: {} {}",
            status, body
        )));
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(bytes) = stream.next().await {
        let bytes = bytes.map_err(|e| Error::Generation(format!("stream error: {}", e)))?;
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        // SSE frames are newline-delimited `data:` lines
        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..=pos);

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                return Ok(());
            }

            if let Some(fragment) = parse_stream_data(data)? {
                if tx.send(StreamEvent::Delta(fragment)).await.is_err() {
                    // Consumer went away; nothing left to deliver
                    warn!("answer stream consumer dropped mid-generation");
                    return Ok(());
                }
            }
        }
    }

    Err(Error::Generation(
        "stream ended before completion".to_string(),
    ))
}

/// Extract the text fragment from one SSE data payload, if it carries any
fn parse_stream_data(data: &str) -> Result<Option<String>> {
    #[derive(Deserialize)]
    struct ChatCompletionChunk {
        choices: Vec<StreamChoice>,
    }

    #[derive(Deserialize)]
    struct StreamChoice {
        delta: Delta,
    }

    #[derive(Deserialize, Default)]
    struct Delta {
        #[serde(default)]
        content: Option<String>,
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| Error::Generation(format!("malformed stream payload: {}", e)))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content))
}

/// One event on the answer stream
#[derive(Debug)]
pub enum StreamEvent {
    /// A text fragment of the answer
    Delta(String),
    /// Terminal failure; no further fragments will arrive
    Failed(Error),
}

/// Observable state of an answer stream.
///
/// A stream is `Requesting` from construction (the request has been
/// dispatched) until the first fragment arrives, then `Streaming` until it
/// ends in exactly one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Requesting,
    Streaming,
    Completed,
    Failed,
}

/// Lazily-produced sequence of answer fragments.
///
/// The channel closing after a clean `[DONE]` is the "stream closed"
/// signal; a `Failed` event is the distinct "stream failed" signal. The
/// consumer concatenates fragments to form the final assistant message.
pub struct AnswerStream {
    rx: mpsc::Receiver<StreamEvent>,
    state: StreamState,
}

impl AnswerStream {
    /// Wrap a channel of stream events. Used by the generation client and
    /// by tests that script the stream directly.
    pub fn from_receiver(rx: mpsc::Receiver<StreamEvent>) -> Self {
        AnswerStream {
            rx,
            state: StreamState::Requesting,
        }
    }

    /// Next fragment, or `None` once the stream has terminated.
    ///
    /// A fragment error is terminal: after `Some(Err(_))` the stream is in
    /// the `Failed` state and yields nothing further.
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        if matches!(self.state, StreamState::Completed | StreamState::Failed) {
            return None;
        }

        match self.rx.recv().await {
            Some(StreamEvent::Delta(text)) => {
                self.state = StreamState::Streaming;
                Some(Ok(text))
            }
            Some(StreamEvent::Failed(error)) => {
                self.state = StreamState::Failed;
                Some(Err(error))
            }
            None => {
                self.state = StreamState::Completed;
                None
            }
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_stream(events: Vec<StreamEvent>) -> AnswerStream {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        for event in events {
            tx.try_send(event).unwrap();
        }
        AnswerStream::from_receiver(rx)
    }

    #[test]
    fn test_parse_stream_data_with_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_stream_data(data).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_stream_data_role_only_delta() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_stream_data(data).unwrap(), None);
    }

    #[test]
    fn test_parse_stream_data_malformed() {
        assert!(matches!(
            parse_stream_data("not json"),
            Err(Error::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_completes_cleanly() {
        let mut stream = scripted_stream(vec![
            StreamEvent::Delta("Hello".to_string()),
            StreamEvent::Delta(" world".to_string()),
        ]);
        assert_eq!(stream.state(), StreamState::Requesting);

        let mut answer = String::new();
        while let Some(fragment) = stream.next_fragment().await {
            answer.push_str(&fragment.unwrap());
            assert_eq!(stream.state(), StreamState::Streaming);
        }

        assert_eq!(answer, "Hello world");
        assert_eq!(stream.state(), StreamState::Completed);
        // Terminal: yields nothing further
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_failure_is_terminal_and_distinct() {
        let mut stream = scripted_stream(vec![
            StreamEvent::Delta("partial".to_string()),
            StreamEvent::Failed(Error::Generation("connection reset".to_string())),
        ]);

        assert_eq!(
            stream.next_fragment().await.unwrap().unwrap(),
            "partial"
        );
        let error = stream.next_fragment().await.unwrap().unwrap_err();
        assert!(matches!(error, Error::Generation(_)));
        assert_eq!(stream.state(), StreamState::Failed);
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_stream_completes_without_fragments() {
        let mut stream = scripted_stream(vec![]);
        assert!(stream.next_fragment().await.is_none());
        assert_eq!(stream.state(), StreamState::Completed);
    }
}
