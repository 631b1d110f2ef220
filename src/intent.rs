//! Intent Classification
//!
//! Routes a voice transcript through a model with a JSON-only prompt and
//! parses the result into a structured intent descriptor. Parsing is
//! deliberately forgiving: fenced or prose-wrapped JSON is cleaned first,
//! and a response missing the intent key degrades to UNKNOWN instead of
//! failing the whole voice turn.

use crate::error::{RigError, RigResult};
use crate::llm::{GenerationParameters, Message, TextModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed classification prompt
const CLASSIFICATION_PROMPT: &str = r#"You are the intent classifier for a voice-controlled geographic display rig.
Classify the user's transcript and respond with ONLY a JSON object, no prose and no code fences.

The object must have an "intent" field with one of these values:
- "GENERATE_KML": user wants to see a place, route, or region. Add "query": a concise description of what to show.
- "CLEAR_KML": user wants to clear the displayed content.
- "CLEAR_LOGO": user wants to remove the logo overlay.
- "PLAY_TOUR": user wants to start or restart the tour animation.
- "EXIT_TOUR": user wants to stop the tour animation.
- "FLY_TO": user wants to move the camera to a place. Add "location_name": the place name.
- "REBOOT": user explicitly asks to reboot the rig.
- "UNKNOWN": anything else.

Example: {"intent": "GENERATE_KML", "query": "Eiffel Tower"}"#;

/// One display action the user can ask for. Wire names are the fixed
/// vocabulary the classification prompt requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    GenerateKml,
    ClearKml,
    ClearLogo,
    PlayTour,
    ExitTour,
    FlyTo,
    Reboot,
    Unknown,
}

impl Intent {
    /// Wire/tag name of this intent
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GenerateKml => "GENERATE_KML",
            Intent::ClearKml => "CLEAR_KML",
            Intent::ClearLogo => "CLEAR_LOGO",
            Intent::PlayTour => "PLAY_TOUR",
            Intent::ExitTour => "EXIT_TOUR",
            Intent::FlyTo => "FLY_TO",
            Intent::Reboot => "REBOOT",
            Intent::Unknown => "UNKNOWN",
        }
    }
}

/// Structured result of one classification. Immutable once produced.
#[derive(Debug, Clone)]
pub struct IntentResult {
    pub intent: Intent,
    pub query: Option<String>,
    pub location_name: Option<String>,
    pub camera_view: Option<String>,
    /// Soft-failure detail (e.g. missing intent key) when intent is Unknown
    pub error: Option<String>,
    /// Raw classifier payload for diagnostics
    pub raw: serde_json::Value,
}

/// Strip code fences and bracket to the outermost JSON object
fn clean_json(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        if let Some(body) = rest.strip_suffix("```") {
            text = match body.find('\n') {
                Some(pos) => body[pos + 1..].trim(),
                None => body.trim(),
            };
        }
    }

    // Models sometimes wrap the object in prose; keep first '{' to last '}'
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Orchestrates one model backend behind the classification prompt
pub struct IntentClassifier {
    model: Arc<dyn TextModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Classify one transcript into an `IntentResult`.
    ///
    /// Hard failure (`ClassificationFormat`) only when the cleaned response
    /// is not a JSON object at all; a valid object without a string-typed
    /// intent key degrades to `Intent::Unknown`.
    pub async fn classify(&self, transcript: &str) -> RigResult<IntentResult> {
        debug!("Classifying transcript: '{}'", transcript);

        let messages = if self.model.supports_system_role() {
            vec![
                Message::system(CLASSIFICATION_PROMPT),
                Message::user(transcript),
            ]
        } else {
            vec![Message::user(format!(
                "{CLASSIFICATION_PROMPT}\n\nTranscript: {transcript}"
            ))]
        };
        // Classification wants short, deterministic output
        let params = GenerationParameters {
            temperature: 0.1,
            max_tokens: 256,
            ..self.model.default_parameters()
        };

        let response = self.model.generate(&messages, &params).await?;
        Self::parse(&response.text)
    }

    /// Parse a raw classifier response (exposed for response-cleaning tests)
    pub fn parse(raw: &str) -> RigResult<IntentResult> {
        let cleaned = clean_json(raw);

        let payload: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
            warn!("Unparseable classification: {} ({})", cleaned, e);
            RigError::ClassificationFormat {
                raw: raw.to_string(),
                cleaned,
            }
        })?;

        let intent = match payload.get("intent").and_then(|v| v.as_str()) {
            Some(name) => serde_json::from_value::<Intent>(serde_json::Value::String(
                name.to_string(),
            ))
            .unwrap_or_else(|_| {
                warn!("Unrecognized intent '{}', treating as UNKNOWN", name);
                Intent::Unknown
            }),
            None => {
                warn!("Classification payload has no intent key: {}", payload);
                return Ok(IntentResult {
                    intent: Intent::Unknown,
                    query: None,
                    location_name: None,
                    camera_view: None,
                    error: Some("missing intent key".into()),
                    raw: payload,
                });
            }
        };

        let field = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Ok(IntentResult {
            intent,
            query: field("query"),
            location_name: field("location_name"),
            camera_view: field("camera_view"),
            error: None,
            raw: payload,
        })
    }
}
