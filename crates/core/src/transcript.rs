//! Transcript events surfaced to the transport

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Role;

/// A partial or final line of conversation text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    /// Partials are advisory and may be revised by the final transcript
    pub is_final: bool,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            role: Role::User,
            timestamp: Utc::now(),
        }
    }

    pub fn final_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            role,
            timestamp: Utc::now(),
        }
    }
}
