//! HTTP model client
//!
//! One reqwest-backed client per provider profile. Handles both request
//! shapes, SSE stream decoding, and the connect/inactivity timeout split.

use crate::error::{RigError, RigResult};
use crate::llm::profile::{extract_delta, extract_text, ProviderProfile, ResponseShape};
use crate::llm::sse::{SseLineBuffer, DONE_SENTINEL};
use crate::llm::{GeneratedStream, GeneratedText, GenerationParameters, Message, Role, TextModel};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Default bound for connection establishment and per-chunk inactivity
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat-model client for one provider profile
pub struct HttpModelClient {
    profile: ProviderProfile,
    api_key: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(profile: ProviderProfile, api_key: String, model_override: Option<String>) -> Self {
        Self::with_timeout(profile, api_key, model_override, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        profile: ProviderProfile,
        api_key: String,
        model_override: Option<String>,
        timeout: Duration,
    ) -> Self {
        let model = model_override.unwrap_or_else(|| profile.default_model.to_string());
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            profile,
            api_key,
            model,
            timeout,
            http,
        }
    }

    fn check_messages(messages: &[Message]) -> RigResult<()> {
        if messages.is_empty() {
            return Err(RigError::Config("messages must not be empty".into()));
        }
        if !messages.iter().any(|m| m.role == Role::User) {
            return Err(RigError::Config(
                "at least one user message is required".into(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, stream: bool) -> String {
        match self.profile.shape {
            ResponseShape::OpenAiChat => format!("{}/chat/completions", self.profile.base_url),
            ResponseShape::GeminiNative => {
                let verb = if stream {
                    "streamGenerateContent?alt=sse"
                } else {
                    "generateContent"
                };
                format!("{}/models/{}:{}", self.profile.base_url, self.model, verb)
            }
        }
    }

    fn body(&self, messages: &[Message], params: &GenerationParameters, stream: bool) -> Value {
        match self.profile.shape {
            ResponseShape::OpenAiChat => {
                let messages: Vec<Value> = messages
                    .iter()
                    .map(|m| json!({ "role": m.role, "content": m.text }))
                    .collect();
                json!({
                    "model": self.model,
                    "messages": messages,
                    "temperature": params.temperature,
                    "top_p": params.top_p,
                    "max_tokens": params.max_tokens,
                    "stream": stream,
                })
            }
            ResponseShape::GeminiNative => {
                let contents: Vec<Value> = messages
                    .iter()
                    .map(|m| {
                        // Gemini has no system role on this endpoint and
                        // calls the assistant "model"
                        let role = match m.role {
                            Role::Assistant => "model",
                            Role::System | Role::User => "user",
                        };
                        json!({ "role": role, "parts": [{ "text": m.text }] })
                    })
                    .collect();
                json!({
                    "contents": contents,
                    "generationConfig": {
                        "temperature": params.temperature,
                        "topP": params.top_p,
                        "maxOutputTokens": params.max_tokens,
                    },
                })
            }
        }
    }

    async fn send(&self, body: &Value, stream: bool) -> RigResult<reqwest::Response> {
        let mut request = self.http.post(self.endpoint(stream)).json(body);
        request = match self.profile.shape {
            ResponseShape::OpenAiChat => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
            ResponseShape::GeminiNative => request.header("x-goog-api-key", &self.api_key),
        };
        if !stream {
            // Whole-response deadline; streams get a per-chunk deadline instead
            request = request.timeout(self.timeout);
        }

        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Provider {} returned {}: {}", self.profile.id, status, body);
            return Err(RigError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Decode one SSE byte stream into accumulated `GeneratedText` events.
///
/// The stream always terminates with exactly one `is_final` event: on the
/// `[DONE]` sentinel or, failing that, on transport EOF with the last
/// accumulated text. `inactivity` bounds the wait for each chunk. A
/// dropped receiver ends the pump, releasing the connection.
async fn pump_stream(
    mut chunks: BoxStream<'static, RigResult<Vec<u8>>>,
    shape: ResponseShape,
    inactivity: Duration,
    tx: mpsc::Sender<RigResult<GeneratedText>>,
) {
    let mut lines = SseLineBuffer::new();
    let mut accumulated = String::new();

    loop {
        let chunk = match tokio::time::timeout(inactivity, chunks.next()).await {
            Err(_) => {
                let _ = tx
                    .send(Err(RigError::Timeout("stream went quiet".into())))
                    .await;
                return;
            }
            Ok(Some(Err(e))) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
            Ok(Some(Ok(chunk))) => Some(chunk),
            Ok(None) => None,
        };

        let records = match &chunk {
            Some(chunk) => lines.push(chunk),
            None => lines.finish().into_iter().collect(),
        };

        for record in records {
            if record == DONE_SENTINEL {
                let _ = tx.send(Ok(GeneratedText::done(accumulated))).await;
                return;
            }
            match serde_json::from_str::<Value>(&record) {
                Ok(payload) => {
                    if let Some(fragment) = extract_delta(shape, &payload) {
                        accumulated.push_str(&fragment);
                        let partial = GeneratedText::partial(accumulated.clone(), Some(payload));
                        if tx.send(Ok(partial)).await.is_err() {
                            // Consumer gone; drop the connection
                            return;
                        }
                    }
                }
                Err(e) => warn!("Skipping malformed stream event: {} ({})", record, e),
            }
        }

        if chunk.is_none() {
            // Transport ended without [DONE]; still terminate with
            // exactly one final event
            let _ = tx.send(Ok(GeneratedText::done(accumulated))).await;
            return;
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> RigError {
    classify_transport_error(e.is_timeout(), e.status().map(|s| s.as_u16()), e.to_string())
}

/// Only genuine deadline expiries become `Timeout`; everything else (a
/// refused connection included) is a transport failure, so callers can
/// tell "retry might help" apart from "the provider is unreachable".
fn classify_transport_error(timed_out: bool, status: Option<u16>, detail: String) -> RigError {
    if timed_out {
        RigError::Timeout(detail)
    } else {
        RigError::Provider {
            status: status.unwrap_or(0),
            body: detail,
        }
    }
}

#[async_trait]
impl TextModel for HttpModelClient {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> RigResult<GeneratedText> {
        Self::check_messages(messages)?;

        let body = self.body(messages, params, false);
        let response = self.send(&body, false).await?;
        let payload: Value = response.json().await.map_err(map_transport_error)?;

        let text = extract_text(self.profile.shape, &payload);
        debug!(
            "Provider {} returned {} chars",
            self.profile.id,
            text.len()
        );
        Ok(GeneratedText {
            text,
            is_final: true,
            raw: Some(payload),
        })
    }

    async fn generate_stream(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> RigResult<GeneratedStream> {
        Self::check_messages(messages)?;

        let body = self.body(messages, params, true);
        let response = self.send(&body, true).await?;

        let chunks = response
            .bytes_stream()
            .map(|item| item.map(|b| b.to_vec()).map_err(map_transport_error))
            .boxed();

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(pump_stream(chunks, self.profile.shape, self.timeout, tx));
        Ok(ReceiverStream::new(rx))
    }

    fn supports_system_role(&self) -> bool {
        self.profile.supports_system_role
    }

    fn default_parameters(&self) -> GenerationParameters {
        GenerationParameters {
            max_tokens: self.profile.max_tokens,
            ..GenerationParameters::default()
        }
    }
}
