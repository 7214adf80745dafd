//! Reply generation trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ConversationTurn, Result, TokenUsage};

/// Input to a reply backend
#[derive(Debug, Clone, Default)]
pub struct ReplyRequest {
    pub session_id: String,
    /// The caller's final transcript for this turn
    pub utterance: String,
    /// Recent turns, oldest first, excluding `utterance`
    pub history: Vec<ConversationTurn>,
    /// Supporting material from the knowledge base, when it had some
    pub knowledge_context: Option<String>,
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    KnowledgeBase,
    Model,
}

/// Output of a reply backend
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub usage: TokenUsage,
    pub source: ReplySource,
}

impl Reply {
    pub fn from_model(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
            source: ReplySource::Model,
        }
    }
}

/// AI reply backend
#[async_trait]
pub trait Responder: Send + Sync + 'static {
    async fn reply(&self, request: &ReplyRequest) -> Result<Reply>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
