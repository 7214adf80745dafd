//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Instant;

use voice_gateway_config::Settings;
use voice_gateway_pipeline::providers::{
    create_knowledge_base, create_responder, create_synthesizer, create_transcriber,
};
use voice_gateway_pipeline::{Backends, EngineConfig, TurnOrchestrator};

use crate::store::InMemoryMessageStore;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub settings: Arc<Settings>,
    pub store: Arc<InMemoryMessageStore>,
    pub started_at: Instant,
}

impl AppState {
    /// Build providers from settings and wire the orchestrator
    pub fn from_settings(settings: Settings) -> voice_gateway_core::Result<Self> {
        let store = Arc::new(InMemoryMessageStore::default());
        let backends = Backends {
            transcriber: create_transcriber(&settings.providers.transcriber)?,
            synthesizer: create_synthesizer(&settings.providers.synthesizer)?,
            responder: create_responder(&settings.providers.responder)?,
            knowledge: create_knowledge_base(&settings.knowledge)?,
            store: store.clone(),
        };
        Ok(Self::with_backends(settings, backends, store))
    }

    pub fn with_backends(
        settings: Settings,
        backends: Backends,
        store: Arc<InMemoryMessageStore>,
    ) -> Self {
        let orchestrator = TurnOrchestrator::new(EngineConfig::from_settings(&settings), backends);
        Self {
            orchestrator: Arc::new(orchestrator),
            settings: Arc::new(settings),
            store,
            started_at: Instant::now(),
        }
    }
}
