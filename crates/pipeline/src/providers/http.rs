//! HTTP-backed providers
//!
//! Transcription posts a WAV body and expects `{"text": ...}` back.
//! Synthesis posts `{"text", "voice"}` and expects raw little-endian PCM16.
//! The chat responder speaks the OpenAI chat-completions dialect; the
//! generic HTTP responder posts the whole request as JSON.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voice_gateway_config::{KnowledgeConfig, ProviderConfig};
use voice_gateway_core::{
    AudioEncoding, AudioFormat, BackendError, ConversationTurn, KnowledgeAnswer, KnowledgeBase,
    Reply, ReplyRequest, Responder, Result, Role, SynthesizedAudio, Synthesizer, TokenUsage,
    Transcriber,
};

use crate::codec::wav::to_wav;

const SYSTEM_PROMPT: &str = "You are a helpful voice assistant on a phone call. \
Answer in one or two short spoken sentences. Do not use markdown or lists.";

fn build_client(timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| BackendError::Http(format!("Failed to create HTTP client: {}", e)).into())
}

fn request_error(err: reqwest::Error, timeout_ms: u64) -> voice_gateway_core::Error {
    if err.is_timeout() {
        BackendError::Timeout(timeout_ms).into()
    } else {
        BackendError::Http(err.to_string()).into()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Http(format!("HTTP {}: {}", status, body)).into())
}

fn with_auth(builder: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) if !key.is_empty() => builder.bearer_auth(key),
        _ => builder,
    }
}

// ---- transcription ----

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

pub struct HttpTranscriber {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpTranscriber {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint_or_default().to_string(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String> {
        let body = to_wav(audio, format);
        let request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(body);
        let response = with_auth(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_ms))?;
        let parsed: TranscriptionResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Transcription(format!("Invalid response: {}", e)))?;
        Ok(parsed.text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---- synthesis ----

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    sample_rate: u32,
}

pub struct HttpSynthesizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    voice: Option<String>,
    sample_rate: u32,
    timeout_ms: u64,
}

impl HttpSynthesizer {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint_or_default().to_string(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            sample_rate: config.output_sample_rate,
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let request = self.client.post(&self.endpoint).json(&SynthesisRequest {
            text,
            voice: self.voice.as_deref(),
            sample_rate: self.sample_rate,
        });
        let response = with_auth(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_ms))?;
        let data = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| BackendError::Synthesis(e.to_string()))?;
        if data.len() % 2 != 0 {
            return Err(BackendError::Synthesis(format!(
                "odd PCM16 payload length {}",
                data.len()
            ))
            .into());
        }
        Ok(SynthesizedAudio {
            data,
            format: AudioFormat::new(AudioEncoding::Pcm16, self.sample_rate),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---- chat completions ----

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

fn build_messages(request: &ReplyRequest) -> Vec<ChatMessage> {
    let mut system = SYSTEM_PROMPT.to_string();
    if let Some(context) = &request.knowledge_context {
        system.push_str("\n\nRelevant information:\n");
        system.push_str(context);
    }

    let mut messages = vec![ChatMessage {
        role: "system",
        content: system,
    }];
    messages.extend(request.history.iter().map(|turn| ChatMessage {
        role: turn.role.as_str(),
        content: turn.text.clone(),
    }));
    messages.push(ChatMessage {
        role: "user",
        content: request.utterance.clone(),
    });
    messages
}

/// OpenAI-compatible chat completions
pub struct OpenAiResponder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout_ms: u64,
}

impl OpenAiResponder {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let endpoint = config.endpoint_or_default();
        let has_key = config.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false);
        if !has_key && !endpoint.starts_with("http://localhost") {
            return Err(BackendError::NotConfigured(
                "API key required for remote chat endpoints".to_string(),
            )
            .into());
        }
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model_or_default().to_string(),
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl Responder for OpenAiResponder {
    async fn reply(&self, request: &ReplyRequest) -> Result<Reply> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(request),
            stream: false,
        };
        let response = with_auth(self.client.post(&self.endpoint).json(&body), self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_ms))?;
        let parsed: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Reply(format!("Invalid response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Reply("No choices in response".to_string()))?;
        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        Ok(Reply::from_model(text, usage))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Generic JSON responder
#[derive(Debug, Serialize)]
struct HttpReplyRequest<'a> {
    session_id: &'a str,
    utterance: &'a str,
    history: &'a [ConversationTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    knowledge_context: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct HttpReplyResponse {
    text: String,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

pub struct HttpResponder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpResponder {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint_or_default().to_string(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn reply(&self, request: &ReplyRequest) -> Result<Reply> {
        let body = HttpReplyRequest {
            session_id: &request.session_id,
            utterance: &request.utterance,
            history: &request.history,
            knowledge_context: request.knowledge_context.as_deref(),
        };
        let response = with_auth(self.client.post(&self.endpoint).json(&body), self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_ms))?;
        let parsed: HttpReplyResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Reply(format!("Invalid response: {}", e)))?;
        Ok(Reply::from_model(parsed.text, parsed.usage.unwrap_or_default()))
    }

    fn model_name(&self) -> &str {
        "http"
    }
}

// ---- knowledge ----

#[derive(Debug, Serialize)]
struct KnowledgeRequest<'a> {
    query: &'a str,
    history: &'a [ConversationTurn],
}

#[derive(Debug, Deserialize)]
struct KnowledgeResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    confidence: f32,
}

pub struct HttpKnowledgeBase {
    client: Client,
    endpoint: String,
    sufficient_confidence: f32,
    timeout_ms: u64,
}

impl HttpKnowledgeBase {
    pub fn new(config: &KnowledgeConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("knowledge.endpoint".to_string()))?;
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint,
            sufficient_confidence: config.sufficient_confidence,
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn lookup(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<Option<KnowledgeAnswer>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&KnowledgeRequest { query, history })
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_ms))?;
        let parsed: KnowledgeResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Knowledge(format!("Invalid response: {}", e)))?;

        Ok(parsed
            .answer
            .filter(|text| !text.trim().is_empty())
            .map(|text| KnowledgeAnswer {
                text,
                confidence: parsed.confidence,
                sufficient: parsed.confidence >= self.sufficient_confidence,
            }))
    }
}
