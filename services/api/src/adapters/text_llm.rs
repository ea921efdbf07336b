//! services/api/src/adapters/text_llm.rs
//!
//! This module contains the adapter for the text-generating LLM.
//! It implements the `TextGenerationService` port from the `core` crate for both
//! listing descriptions and simulated agent replies.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use yourroom_core::ports::{GenerationRequest, PortError, PortResult, TextGenerationService};

const DESCRIPTION_INSTRUCTIONS: &str = "Tu es un agent immobilier expert au Togo (Lomé, Agoè, etc.). \
Tu rédiges des descriptions commerciales attrayantes pour des annonces de location. \
Utilise un ton professionnel, rassurant et persuasif. Réponds uniquement avec la description, en français.";

const REPLY_INSTRUCTIONS: &str = "Tu es un démarcheur immobilier professionnel au Togo travaillant pour la plateforme YOURROOM. \
Réponds poliment au client, réponds à ses questions sur le prix ou la localisation si elles sont posées, \
et propose-lui de fixer un rendez-vous pour une visite. Garde un ton courtois et professionnel.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTextAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTextAdapter {
    /// Creates a new `OpenAiTextAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Builds the system instructions and user prompt for a request.
fn build_prompt(request: &GenerationRequest) -> (&'static str, String) {
    match request {
        GenerationRequest::Description(brief) => (
            DESCRIPTION_INSTRUCTIONS,
            format!(
                "Écris une description pour cette annonce.\nTitre : {}\nPrix : {} FCFA\nRégion : {}\nCommune : {}\nQuartier : {}",
                brief.title, brief.price, brief.region, brief.commune, brief.quartier
            ),
        ),
        GenerationRequest::Reply {
            client_message,
            context,
        } => (
            REPLY_INSTRUCTIONS,
            format!(
                "Le client te contacte à propos d'une annonce ({}).\nMessage du client : \"{}\"",
                context, client_message
            ),
        ),
    }
}

/// Removes markdown emphasis and heading markers, which the chat view renders literally.
fn strip_markdown(text: &str) -> PortResult<String> {
    let markers = Regex::new(r"(?m)(\*\*|__|^#+\s*)")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(markers.replace_all(text, "").trim().to_string())
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiTextAdapter {
    async fn generate_text(&self, request: &GenerationRequest) -> PortResult<String> {
        let (instructions, prompt) = build_prompt(request);

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(instructions)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        strip_markdown(&content)
    }
}

//=========================================================================================
// Offline Adapter
//=========================================================================================

/// Stands in for the LLM when no API key is configured. Every call fails, so callers
/// receive the fallback sentences.
#[derive(Clone, Debug, Default)]
pub struct OfflineTextAdapter;

#[async_trait]
impl TextGenerationService for OfflineTextAdapter {
    async fn generate_text(&self, _request: &GenerationRequest) -> PortResult<String> {
        Err(PortError::Unexpected(
            "text generation is not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yourroom_core::DescriptionBrief;

    #[test]
    fn description_prompt_lists_the_listing_fields() {
        let (instructions, prompt) = build_prompt(&GenerationRequest::Description(DescriptionBrief {
            title: "Studio meublé".to_string(),
            price: 45000,
            region: "TOGO".to_string(),
            commune: "Agoè".to_string(),
            quartier: "Assiyéyé".to_string(),
        }));
        assert_eq!(instructions, DESCRIPTION_INSTRUCTIONS);
        for expected in ["Studio meublé", "45000 FCFA", "TOGO", "Agoè", "Assiyéyé"] {
            assert!(prompt.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn reply_prompt_quotes_message_and_context() {
        let (instructions, prompt) = build_prompt(&GenerationRequest::Reply {
            client_message: "Quel est le prix ?".to_string(),
            context: "Studio meublé à Assiyéyé, 45000 FCFA".to_string(),
        });
        assert_eq!(instructions, REPLY_INSTRUCTIONS);
        assert!(prompt.contains("(Studio meublé à Assiyéyé, 45000 FCFA)"));
        assert!(prompt.contains("\"Quel est le prix ?\""));
    }

    #[test]
    fn markdown_markers_are_removed() {
        assert_eq!(
            strip_markdown("## Villa\n**Superbe** villa __calme__").unwrap(),
            "Villa\nSuperbe villa calme"
        );
    }

    #[tokio::test]
    async fn offline_adapter_always_fails() {
        let result = OfflineTextAdapter
            .generate_text(&GenerationRequest::Reply {
                client_message: "Bonjour".to_string(),
                context: "ctx".to_string(),
            })
            .await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }
}
