//! The `Model` collaborator contract.
//!
//! The engine treats a model as an opaque async function from a prompt to
//! a response with a `content` string. Authentication, retries, and rate
//! limiting are entirely the client's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: "human".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
}

/// A prompt is either a bare goal string or a running message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Messages(Vec<Message>),
}

impl Prompt {
    /// Extract the goal string: the text itself, or the content of the
    /// last message with role `human`.
    pub fn extract_goal(&self) -> Result<String, crate::error::EngineError> {
        match self {
            Prompt::Text(s) => Ok(s.clone()),
            Prompt::Messages(messages) => messages
                .iter()
                .rev()
                .find(|m| m.role == "human")
                .map(|m| m.content.clone())
                .ok_or(crate::error::EngineError::NoHumanMessage),
        }
    }

    /// Shape `best_attack_prompt` to match this prompt's original type.
    ///
    /// For a string prompt, returns the candidate unchanged. For a message
    /// list, replaces the content of the last `human` message, preserving
    /// every other message including any that follow it.
    pub fn format_result(&self, best_attack_prompt: &str) -> Result<Prompt, crate::error::EngineError> {
        match self {
            Prompt::Text(_) => Ok(Prompt::Text(best_attack_prompt.to_string())),
            Prompt::Messages(messages) => {
                let idx = messages
                    .iter()
                    .rposition(|m| m.role == "human")
                    .ok_or(crate::error::EngineError::NoHumanMessage)?;
                let mut out = messages.clone();
                out[idx].content = best_attack_prompt.to_string();
                Ok(Prompt::Messages(out))
            }
        }
    }
}

/// A model's response to an invocation. Only `content` is used by the
/// engine; other fields are passthrough for richer collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
}

impl ModelResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// An LLM that generates or receives adversarial prompts.
///
/// Exposes both a synchronous and an asynchronous entry point, mirroring the
/// original's `invoke`/`ainvoke` split. Every caller inside this crate (PAIR,
/// TAP, the batch façade) already runs inside an async runtime and calls
/// only `ainvoke`; `invoke` is a thin blocking wrapper for callers outside
/// one.
#[async_trait]
pub trait Model: Send + Sync {
    /// Asynchronous invocation (suspending).
    async fn ainvoke(&self, prompt: &Prompt) -> anyhow::Result<ModelResponse>;

    /// Synchronous invocation: blocks the calling thread until `ainvoke` resolves.
    fn invoke(&self, prompt: &Prompt) -> anyhow::Result<ModelResponse> {
        futures::executor::block_on(self.ainvoke(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_goal_from_text() {
        let p = Prompt::Text("do the thing".into());
        assert_eq!(p.extract_goal().unwrap(), "do the thing");
    }

    #[test]
    fn extract_goal_from_messages_uses_last_human() {
        let p = Prompt::Messages(vec![
            Message::human("first"),
            Message::assistant("reply"),
            Message::human("second"),
        ]);
        assert_eq!(p.extract_goal().unwrap(), "second");
    }

    #[test]
    fn extract_goal_errors_with_no_human_message() {
        let p = Prompt::Messages(vec![Message::assistant("only assistant")]);
        assert!(p.extract_goal().is_err());
    }

    #[test]
    fn format_result_replaces_last_human_preserves_rest() {
        let p = Prompt::Messages(vec![
            Message::system("sys"),
            Message::human("old goal"),
            Message::assistant("a reply that follows the human turn"),
        ]);
        let out = p.format_result("best candidate").unwrap();
        match out {
            Prompt::Messages(messages) => {
                assert_eq!(messages[0].content, "sys");
                assert_eq!(messages[1].content, "best candidate");
                assert_eq!(messages[2].content, "a reply that follows the human turn");
            }
            _ => panic!("expected messages"),
        }
    }

    #[test]
    fn format_result_on_text_prompt() {
        let p = Prompt::Text("anything".into());
        match p.format_result("best").unwrap() {
            Prompt::Text(s) => assert_eq!(s, "best"),
            _ => panic!("expected text"),
        }
    }
}
