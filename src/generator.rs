//! KML Generator
//!
//! Turns a natural-language query into a validated markup document by
//! pairing a fixed generation prompt with one model call, then running the
//! response through extraction and validation.

use crate::error::{RigError, RigResult};
use crate::llm::{GeneratedText, Message, TextModel};
use crate::markup::{self, MarkupDocument};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Fixed system prompt for KML generation
const GENERATION_PROMPT: &str = r#"You are a KML generation engine for a multi-screen geographic display rig.
Given a request, respond with ONLY a complete, valid KML document and nothing else: no prose, no code fences, no explanations.

Rules:
- Start with <?xml version="1.0" encoding="UTF-8"?> and use the http://www.opengis.net/kml/2.2 namespace.
- Every Placemark must contain real-world coordinates (longitude,latitude[,altitude]).
- For landmarks, include one Point Placemark with a short descriptive name.
- For routes or regions, use LineString or Polygon geometry with a coordinate list.
- When an animated camera tour fits the request, embed a gx:Tour named "Main Tour".
- Keep the document self-contained; never reference external files."#;

/// Separator used when the provider has no distinct system role
const PROMPT_SEPARATOR: &str = "\n\n--- REQUEST ---\n\n";

/// Orchestrates one model backend behind the fixed generation prompt
pub struct MarkupGenerator {
    model: Arc<dyn TextModel>,
}

impl MarkupGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    fn messages(&self, query: &str) -> Vec<Message> {
        if self.model.supports_system_role() {
            vec![Message::system(GENERATION_PROMPT), Message::user(query)]
        } else {
            // Provider/model pairing rejects a system role; fold the prompt
            // into the user message with a clear separator
            vec![Message::user(format!(
                "{GENERATION_PROMPT}{PROMPT_SEPARATOR}{query}"
            ))]
        }
    }

    /// Finish a raw response: extract the document and validate it.
    ///
    /// Validation failures are wrapped as `GenerationFailed` (the model
    /// answered, the answer was unusable); every other error kind passes
    /// through untouched.
    fn finish(&self, raw: &str) -> RigResult<MarkupDocument> {
        if raw.trim().is_empty() {
            return Err(RigError::EmptyResponse);
        }

        let candidate = markup::extract(raw);
        match MarkupDocument::new(candidate) {
            Ok(doc) => {
                info!("Generated KML document ({} bytes)", doc.kml.len());
                Ok(doc)
            }
            Err(RigError::Validation(detail)) => {
                warn!("Generated markup failed validation: {}", detail);
                Err(RigError::GenerationFailed(detail))
            }
            Err(other) => Err(other),
        }
    }

    /// Generate and validate one document for `query`
    pub async fn generate(&self, query: &str) -> RigResult<MarkupDocument> {
        debug!("Generating KML for query: '{}'", query);

        let messages = self.messages(query);
        let params = self.model.default_parameters();
        let response = self.model.generate(&messages, &params).await?;

        self.finish(&response.text)
    }

    /// Streaming variant.
    ///
    /// Single-shot wrapped in a sequence for API symmetry with the
    /// non-streaming path: the model stream is consumed internally and
    /// exactly one final validated document (or error) is yielded.
    pub async fn generate_stream(
        &self,
        query: &str,
    ) -> RigResult<ReceiverStream<RigResult<MarkupDocument>>> {
        debug!("Generating KML (streaming) for query: '{}'", query);

        let messages = self.messages(query);
        let mut params = self.model.default_parameters();
        params.stream = true;

        let mut stream = self.model.generate_stream(&messages, &params).await?;
        let (tx, rx) = mpsc::channel(1);

        let generator = Self {
            model: Arc::clone(&self.model),
        };
        tokio::spawn(async move {
            let mut last: Option<GeneratedText> = None;
            while let Some(event) = stream.next().await {
                match event {
                    Ok(text) => {
                        let done = text.is_final;
                        last = Some(text);
                        if done {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            let raw = last.map(|t| t.text).unwrap_or_default();
            let _ = tx.send(generator.finish(&raw)).await;
        });

        Ok(ReceiverStream::new(rx))
    }
}
