//! Language Model Clients
//!
//! Provides interchangeable chat-model backends behind one trait:
//! - OpenAI-compatible chat completions (OpenAI, Groq, OpenRouter)
//! - Gemini-native generateContent
//!
//! Both single-shot and incrementally-streamed responses are supported.

pub mod client;
pub mod profile;
pub mod sse;

use crate::error::RigResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

pub use client::HttpModelClient;
pub use profile::{ProviderProfile, ResponseShape};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message; immutable, created per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// Sampling parameters for one generation request
#[derive(Debug, Clone)]
pub struct GenerationParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
            stream: false,
        }
    }
}

/// A (possibly partial) model response.
///
/// For streams, successive values carry the accumulated text so far; the
/// accumulator only ever grows, and exactly one value has `is_final` set.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub is_final: bool,
    pub raw: Option<serde_json::Value>,
}

impl GeneratedText {
    pub fn partial(text: impl Into<String>, raw: Option<serde_json::Value>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            raw,
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            raw: None,
        }
    }
}

/// Lazy, finite stream of accumulated responses. Not restartable: every
/// call to `generate_stream` issues a fresh network request. Dropping the
/// stream early releases the underlying connection.
pub type GeneratedStream = ReceiverStream<RigResult<GeneratedText>>;

/// Trait for chat-model backends.
///
/// Implementations hold no mutable state across calls, so one client value
/// may serve concurrent requests.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Issue one request and return the complete response
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> RigResult<GeneratedText>;

    /// Issue one streaming request; yields growing accumulated prefixes and
    /// terminates with exactly one `is_final` value
    async fn generate_stream(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> RigResult<GeneratedStream>;

    /// Whether the backing provider/model accepts a distinct system role.
    /// When false, callers fold the system prompt into the user message.
    fn supports_system_role(&self) -> bool {
        true
    }

    /// Sampling parameters tuned for this backend's profile
    fn default_parameters(&self) -> GenerationParameters {
        GenerationParameters::default()
    }
}

impl std::fmt::Debug for dyn TextModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn TextModel")
    }
}

/// Create a client for a named builtin provider
pub fn create_client(
    provider_id: &str,
    api_key: &str,
    model_override: Option<&str>,
) -> RigResult<Box<dyn TextModel>> {
    let profile = ProviderProfile::builtin(provider_id)?;
    Ok(Box::new(HttpModelClient::new(
        profile,
        api_key.to_string(),
        model_override.map(str::to_string),
    )))
}
