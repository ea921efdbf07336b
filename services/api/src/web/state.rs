//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use yourroom_core::{ConversationEngine, EntityStore, SessionContext, TextGenerator};

//=========================================================================================
// AppState (Shared Across All Requests and Sockets)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub sessions: Arc<SessionContext>,
    pub engine: Arc<ConversationEngine>,
    pub generator: TextGenerator,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the core services around a single entity store.
    pub fn new(store: Arc<EntityStore>, generator: TextGenerator, config: Arc<Config>) -> Self {
        let sessions = Arc::new(SessionContext::new(store.clone()));
        let engine = Arc::new(
            ConversationEngine::new(store.clone(), generator.clone())
                .with_reply_delay(config.reply_delay),
        );
        Self {
            store,
            sessions,
            engine,
            generator,
            config,
        }
    }
}
