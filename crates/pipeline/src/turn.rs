//! Reply pipeline for one caller turn
//!
//! Persist the utterance, gather context, answer from the knowledge base or
//! the model, persist the answer, synthesize and normalize the audio. Runs
//! in a task spawned by the session worker; the worker only sees the
//! finished result.

use bytes::Bytes;
use std::time::Instant;
use voice_gateway_core::{
    AudioFormat, BackendError, ConversationTurn, Reply, ReplyRequest, ReplySource, Result, Role,
    TokenUsage,
};

use crate::orchestrator::EngineContext;

/// A reply ready for playback
#[derive(Debug, Clone)]
pub struct PreparedReply {
    pub text: String,
    pub audio: Bytes,
    pub format: AudioFormat,
    pub source: ReplySource,
    pub usage: TokenUsage,
}

async fn record(ctx: &EngineContext, session_id: &str, role: Role, text: &str, metadata: serde_json::Value) {
    if let Err(e) = ctx
        .backends
        .store
        .record_message(session_id, role, text, metadata)
        .await
    {
        metrics::counter!("voice_gateway_errors_total", "stage" => "persistence").increment(1);
        tracing::warn!(session_id, role = role.as_str(), error = %e, "Failed to persist message");
    }
}

async fn history(ctx: &EngineContext, session_id: &str, utterance: &str) -> Vec<ConversationTurn> {
    let limit = ctx.config.turn_taking.history_limit;
    let mut turns = match ctx
        .backends
        .store
        .recent_messages(session_id, limit + 1)
        .await
    {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "Failed to load conversation history");
            Vec::new()
        },
    };
    // The utterance was just persisted; it goes in the request separately
    if turns
        .last()
        .map(|t| t.role == Role::User && t.text == utterance)
        .unwrap_or(false)
    {
        turns.pop();
    }
    if turns.len() > limit {
        turns.drain(..turns.len() - limit);
    }
    turns
}

async fn generate(ctx: &EngineContext, session_id: &str, utterance: &str) -> Result<Reply> {
    let history = history(ctx, session_id, utterance).await;

    let mut knowledge_context = None;
    if let Some(kb) = &ctx.backends.knowledge {
        match kb.lookup(utterance, &history).await {
            Ok(Some(answer)) if answer.sufficient => {
                tracing::debug!(session_id, confidence = answer.confidence, "Answered from knowledge base");
                return Ok(Reply {
                    text: answer.text,
                    usage: TokenUsage::default(),
                    source: ReplySource::KnowledgeBase,
                });
            },
            Ok(Some(answer)) => knowledge_context = Some(answer.text),
            Ok(None) => {},
            Err(e) => {
                metrics::counter!("voice_gateway_errors_total", "stage" => "knowledge").increment(1);
                tracing::warn!(session_id, error = %e, "Knowledge lookup failed, using model only");
            },
        }
    }

    let request = ReplyRequest {
        session_id: session_id.to_string(),
        utterance: utterance.to_string(),
        history,
        knowledge_context,
    };
    let start = Instant::now();
    let reply = ctx.backends.responder.reply(&request).await?;
    metrics::histogram!("voice_gateway_llm_duration_seconds").record(start.elapsed().as_secs_f64());
    Ok(reply)
}

/// Produce the reply for `utterance`
pub async fn prepare_reply(ctx: &EngineContext, session_id: &str, utterance: &str) -> Result<PreparedReply> {
    record(ctx, session_id, Role::User, utterance, serde_json::json!({ "source": "voice" })).await;

    let reply = generate(ctx, session_id, utterance).await.map_err(|e| {
        metrics::counter!("voice_gateway_errors_total", "stage" => "reply").increment(1);
        e
    })?;
    let text = reply.text.trim().to_string();
    if text.is_empty() {
        return Err(BackendError::Reply("empty reply".to_string()).into());
    }

    record(
        ctx,
        session_id,
        Role::Assistant,
        &text,
        serde_json::json!({
            "source": reply.source,
            "prompt_tokens": reply.usage.prompt_tokens,
            "completion_tokens": reply.usage.completion_tokens,
        }),
    )
    .await;

    let start = Instant::now();
    let synthesized = ctx.backends.synthesizer.synthesize(&text).await.map_err(|e| {
        metrics::counter!("voice_gateway_errors_total", "stage" => "tts").increment(1);
        e
    })?;
    metrics::histogram!("voice_gateway_tts_duration_seconds").record(start.elapsed().as_secs_f64());

    let audio = ctx
        .codec
        .normalize_for_playback(&synthesized.data, synthesized.format);

    tracing::info!(
        session_id,
        source = ?reply.source,
        chars = text.len(),
        audio_bytes = audio.len(),
        "Reply prepared"
    );

    Ok(PreparedReply {
        text,
        audio: Bytes::from(audio),
        format: ctx.codec.playback_format(),
        source: reply.source,
        usage: reply.usage,
    })
}
