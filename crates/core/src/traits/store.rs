//! Message persistence trait

use async_trait::async_trait;

use crate::{ConversationTurn, Result, Role};

/// Per-session message log
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    async fn record_message(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        metadata: serde_json::Value,
    ) -> Result<()>;

    /// Up to `limit` most recent messages, oldest first
    async fn recent_messages(&self, session_id: &str, limit: usize)
        -> Result<Vec<ConversationTurn>>;
}
