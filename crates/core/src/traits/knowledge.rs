//! Knowledge base lookup trait

use async_trait::async_trait;

use crate::{ConversationTurn, Result};

/// An answer found in the knowledge base
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeAnswer {
    pub text: String,
    pub confidence: f32,
    /// When set, the answer is used verbatim and no model is consulted
    pub sufficient: bool,
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync + 'static {
    /// Look up `query`; `Ok(None)` when nothing relevant exists
    async fn lookup(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<Option<KnowledgeAnswer>>;
}
