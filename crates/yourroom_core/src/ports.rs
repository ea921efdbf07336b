//! crates/yourroom_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{DescriptionBrief, PromptKind};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and core operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Rejected input: nothing was written.
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable whole-collection storage keyed by collection name.
///
/// Values are opaque JSON text; parsing belongs to the `EntityStore`.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Returns the persisted text for `key`, or `None` if nothing was ever written.
    async fn read(&self, key: &str) -> PortResult<Option<String>>;

    /// Atomically overwrites the value stored under `key`.
    async fn write(&self, key: &str, value: &str) -> PortResult<()>;
}

/// A request for generated text, tagged by prompt kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Draft a marketing description for a listing.
    Description(DescriptionBrief),
    /// Draft the agent's answer to a client message.
    Reply {
        client_message: String,
        context: String,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> PromptKind {
        match self {
            GenerationRequest::Description(_) => PromptKind::Description,
            GenerationRequest::Reply { .. } => PromptKind::Reply,
        }
    }
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Calls the generative text backend. May fail; callers go through `TextGenerator`.
    async fn generate_text(&self, request: &GenerationRequest) -> PortResult<String>;
}
