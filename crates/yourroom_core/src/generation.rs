//! crates/yourroom_core/src/generation.rs
//!
//! The infallible front of the text-generation port.
//!
//! `TextGenerator` never returns an error: a failed or empty generation is replaced
//! by a fixed sentence chosen by prompt kind.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::{DescriptionBrief, PromptKind};
use crate::ports::{GenerationRequest, TextGenerationService};

impl PromptKind {
    /// Substitute text when the generation service fails.
    pub fn failure_fallback(self) -> &'static str {
        match self {
            PromptKind::Description => "Erreur lors de la génération de la description.",
            PromptKind::Reply => {
                "L'agent est actuellement sur le terrain pour des visites. Il vous répondra dès que possible."
            }
        }
    }

    /// Substitute text when the service answers with nothing.
    pub fn empty_fallback(self) -> &'static str {
        match self {
            PromptKind::Description => "Description non disponible.",
            PromptKind::Reply => "Je reviens vers vous bientôt pour organiser une visite.",
        }
    }
}

#[derive(Clone)]
pub struct TextGenerator {
    service: Arc<dyn TextGenerationService>,
}

impl TextGenerator {
    pub fn new(service: Arc<dyn TextGenerationService>) -> Self {
        Self { service }
    }

    /// Returns generated text, or the kind's fallback sentence.
    pub async fn generate(&self, request: GenerationRequest) -> String {
        let kind = request.kind();
        let started = Instant::now();
        match self.service.generate_text(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("{:?} generated in {:?}", kind, started.elapsed());
                text.trim().to_string()
            }
            Ok(_) => {
                warn!("{:?} generation returned no text, using fallback", kind);
                kind.empty_fallback().to_string()
            }
            Err(e) => {
                warn!("{:?} generation failed, using fallback: {}", kind, e);
                kind.failure_fallback().to_string()
            }
        }
    }

    pub async fn describe_listing(&self, brief: DescriptionBrief) -> String {
        self.generate(GenerationRequest::Description(brief)).await
    }

    pub async fn draft_reply(&self, client_message: &str, context: &str) -> String {
        self.generate(GenerationRequest::Reply {
            client_message: client_message.to_string(),
            context: context.to_string(),
        })
        .await
    }
}
