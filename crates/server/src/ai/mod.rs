//! Upstream AI capability
//!
//! The relay only needs "submit a prompt, receive text fragments until the
//! stream ends". [`CompletionSource`] is that seam; [`GenAiSource`] is the
//! production implementation over the `genai` client.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use genai::chat::{ChatMessage, ChatRequest, ChatStreamEvent};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client as GenAIClient, ModelIden};
use thiserror::Error;
use tracing::{debug, info};

/// Ordered text fragments; ends when the upstream reply is complete.
pub type FragmentStream = BoxStream<'static, Result<String, UpstreamError>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream stream failed: {0}")]
    Stream(String),
}

#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Start generating a reply to `prompt`.
    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream, UpstreamError>;
}

/// AI Assistant configuration
#[derive(Clone)]
pub struct AiConfig {
    /// Model name, e.g. `gemini-1.5-flash`
    pub model: String,
    pub system_prompt: String,
    /// Explicit provider key. `None` leaves key lookup to genai's defaults
    /// (`GEMINI_API_KEY`, `OPENAI_API_KEY`, ...).
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a first-aid and home-medicine assistant. \
Answer briefly and plainly. Tell the user to call emergency services when symptoms sound serious.";

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            api_key: None,
        }
    }
}

/// Streams replies from a hosted model through `genai`.
pub struct GenAiSource {
    client: GenAIClient,
    config: AiConfig,
}

impl GenAiSource {
    pub fn new(config: AiConfig) -> Self {
        let client = match config.api_key.clone() {
            Some(key) => {
                let auth_resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                        Ok(Some(AuthData::from_single(key.clone())))
                    },
                );
                GenAIClient::builder().with_auth_resolver(auth_resolver).build()
            }
            None => GenAIClient::default(),
        };

        info!("[AI] Using model: {}", config.model);

        Self { client, config }
    }
}

#[async_trait]
impl CompletionSource for GenAiSource {
    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream, UpstreamError> {
        let chat_req = ChatRequest::new(vec![
            ChatMessage::system(&self.config.system_prompt),
            ChatMessage::user(prompt),
        ]);

        debug!("[AI] Opening stream on {}", self.config.model);

        let response = self
            .client
            .exec_chat_stream(&self.config.model, chat_req, None)
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let fragments = response.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                    Some(Ok(chunk.content))
                }
                Ok(_) => None,
                Err(e) => Some(Err(UpstreamError::Stream(e.to_string()))),
            }
        });

        Ok(fragments.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_api_key() {
        let config = AiConfig {
            api_key: Some("sk-very-secret".into()),
            ..AiConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains(DEFAULT_MODEL));
        assert!(!rendered.contains("sk-very-secret"));
    }
}
