use serde::Serialize;

use crate::index::RetrievalResult;

/// Persona line sent as the system message of every request
const SYSTEM_PROMPT: &str = "You are a document assistant.";

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation, in the generation model's wire shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Compose the two-message conversation for a set of retrieved chunks.
///
/// Chunk texts are joined with a single space in the order the retriever
/// returned them (descending relevance, not document order) and substituted
/// into a fixed template. An empty result set produces a well-formed prompt
/// with empty content.
pub fn compose(results: &[RetrievalResult]) -> Vec<ChatMessage> {
    let content = results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let prompt = format!(
        "You are a document assistant. Help me understand the following content: {}. \
         Please provide me with page numbers for further reading",
        content
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn result(text: &str, score: f32) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk {
                text: text.to_string(),
                page_number: 1,
                offset: 0,
            },
            score,
        }
    }

    #[test]
    fn test_compose_joins_chunks_with_single_space() {
        let results = vec![result("most relevant", 0.9), result("less relevant", 0.5)];
        let messages = compose(&results);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are a document assistant.");
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1]
            .content
            .contains("most relevant less relevant"));
        assert!(messages[1]
            .content
            .ends_with("Please provide me with page numbers for further reading"));
    }

    #[test]
    fn test_compose_preserves_retrieval_order() {
        let results = vec![result("bbb", 0.9), result("aaa", 0.8)];
        let messages = compose(&results);
        let content = &messages[1].content;
        assert!(content.find("bbb").unwrap() < content.find("aaa").unwrap());
    }

    #[test]
    fn test_compose_with_empty_results_is_well_formed() {
        let messages = compose(&[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[1]
            .content
            .contains("Help me understand the following content: ."));
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
