use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("oracle response malformed: {0}")]
    Malformed(String),
    #[error("oracle call exceeded its {0:?} budget")]
    Timeout(Duration),
    #[error("oracle failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<OracleError>,
    },
}

/// Raw oracle answer. Providers return either bare text or a structured
/// response object; [`OracleReply::into_content`] normalizes both.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Text(String),
    Structured(Value),
}

impl OracleReply {
    /// Plain-text content of the reply.
    ///
    /// Structured replies are searched for a `content` field, then for the
    /// chat-completions shape `choices[0].message.content`. Content given as
    /// an array of `{"type":"text","text":...}` blocks is joined with newlines.
    pub fn into_content(self) -> Result<String, OracleError> {
        match self {
            OracleReply::Text(text) => Ok(text),
            OracleReply::Structured(value) => {
                let content = value
                    .get("content")
                    .or_else(|| value.pointer("/choices/0/message/content"))
                    .or_else(|| value.pointer("/message/content"));
                content.and_then(content_text).ok_or_else(|| {
                    OracleError::Malformed(format!(
                        "no text content in response: {}",
                        abbreviate(&value.to_string(), 200)
                    ))
                })
            }
        }
    }
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let texts: Vec<&str> = blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}

fn abbreviate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// A text-generation backend. Implemented by [`crate::ChatCompletionsOracle`]
/// (HTTP) and [`crate::ScriptedOracle`] (tests).
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<OracleReply, OracleError>;
}
