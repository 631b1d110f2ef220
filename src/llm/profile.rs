//! Provider profiles and response-shape parsing
//!
//! A profile pins the endpoint, default model, and wire shape for one
//! backend. Field extraction from response payloads lives here so the HTTP
//! client never special-cases providers by name.

use crate::error::{RigError, RigResult};
use serde_json::Value;
use tracing::warn;

/// Request/response wire shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `/chat/completions` with `choices[0].message.content` and SSE
    /// `delta.content` fragments terminated by `data: [DONE]`
    OpenAiChat,
    /// `:generateContent` with `candidates[0].content.parts[0].text`; SSE
    /// carries raw JSON objects and no `[DONE]` sentinel
    GeminiNative,
}

/// Fixed description of one language-model backend
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub id: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub shape: ResponseShape,
    pub max_tokens: u32,
    /// Some provider/model pairings reject a distinct system role; the
    /// generation prompt is then folded into the user message.
    pub supports_system_role: bool,
}

const BUILTIN: &[ProviderProfile] = &[
    ProviderProfile {
        id: "openai",
        base_url: "https://api.openai.com/v1",
        default_model: "gpt-4o-mini",
        shape: ResponseShape::OpenAiChat,
        max_tokens: 2048,
        supports_system_role: true,
    },
    ProviderProfile {
        id: "groq",
        base_url: "https://api.groq.com/openai/v1",
        default_model: "llama-3.3-70b-versatile",
        shape: ResponseShape::OpenAiChat,
        max_tokens: 2048,
        supports_system_role: true,
    },
    ProviderProfile {
        id: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        default_model: "mistralai/mistral-small",
        shape: ResponseShape::OpenAiChat,
        max_tokens: 1024,
        supports_system_role: true,
    },
    ProviderProfile {
        id: "gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        default_model: "gemini-2.0-flash",
        shape: ResponseShape::GeminiNative,
        max_tokens: 2048,
        supports_system_role: false,
    },
];

impl ProviderProfile {
    /// Look up one of the builtin providers by id
    pub fn builtin(id: &str) -> RigResult<Self> {
        BUILTIN
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| RigError::Config(format!("unknown provider: {id}")))
    }

    /// Ids of all builtin providers
    pub fn builtin_ids() -> Vec<&'static str> {
        BUILTIN.iter().map(|p| p.id).collect()
    }
}

/// Extract the full response text from a non-streaming payload.
///
/// Missing fields are tolerated: the anomaly is logged and an empty string
/// returned, leaving rejection to the empty-response check upstream.
pub fn extract_text(shape: ResponseShape, payload: &Value) -> String {
    let text = match shape {
        ResponseShape::OpenAiChat => payload["choices"][0]["message"]["content"].as_str(),
        ResponseShape::GeminiNative => {
            payload["candidates"][0]["content"]["parts"][0]["text"].as_str()
        }
    };

    match text {
        Some(t) => t.to_string(),
        None => {
            warn!("Response payload missing text field: {}", payload);
            String::new()
        }
    }
}

/// Extract the incremental text fragment from one streaming event payload.
/// Returns None for events that carry no text (role preludes, stop chunks).
pub fn extract_delta(shape: ResponseShape, payload: &Value) -> Option<String> {
    let fragment = match shape {
        ResponseShape::OpenAiChat => payload["choices"][0]["delta"]["content"].as_str(),
        ResponseShape::GeminiNative => {
            payload["candidates"][0]["content"]["parts"][0]["text"].as_str()
        }
    };
    fragment.map(str::to_string)
}
