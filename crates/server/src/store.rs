//! In-memory message store
//!
//! Default [`MessageStore`] when no external persistence is configured.
//! Keeps a bounded transcript per session; nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use voice_gateway_core::{ConversationTurn, MessageStore, Result, Role};

/// One persisted message
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredMessage {
    pub role: Role,
    pub text: String,
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<String, VecDeque<StoredMessage>>>,
    per_session_cap: usize,
}

const DEFAULT_CAP: usize = 200;

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl InMemoryMessageStore {
    pub fn new(per_session_cap: usize) -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
            per_session_cap: per_session_cap.max(1),
        }
    }

    /// Full stored transcript of a session
    pub fn transcript(&self, session_id: &str) -> Vec<StoredMessage> {
        self.messages
            .read()
            .get(session_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn record_message(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let mut messages = self.messages.write();
        let log = messages.entry(session_id.to_string()).or_default();
        if log.len() >= self.per_session_cap {
            log.pop_front();
        }
        log.push_back(StoredMessage {
            role,
            text: text.to_string(),
            metadata,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let messages = self.messages.read();
        let Some(log) = messages.get(session_id) else {
            return Ok(Vec::new());
        };
        let skip = log.len().saturating_sub(limit);
        Ok(log
            .iter()
            .skip(skip)
            .map(|m| ConversationTurn {
                role: m.role,
                text: m.text.clone(),
                timestamp: m.recorded_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recent_messages_in_order() {
        let store = InMemoryMessageStore::default();
        for i in 0..5 {
            store
                .record_message("s1", Role::User, &format!("msg {}", i), serde_json::Value::Null)
                .await
                .unwrap();
        }
        store
            .record_message("s2", Role::User, "other", serde_json::Value::Null)
            .await
            .unwrap();

        let recent = store.recent_messages("s1", 2).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 3", "msg 4"]);
        assert!(store.recent_messages("missing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cap_drops_oldest() {
        let store = InMemoryMessageStore::new(3);
        for i in 0..5 {
            store
                .record_message("s", Role::Assistant, &i.to_string(), serde_json::json!({}))
                .await
                .unwrap();
        }
        let transcript = store.transcript("s");
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].text, "2");
    }
}
