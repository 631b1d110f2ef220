//! Command Processor
//!
//! Composes the intent classifier and the KML generator into one call:
//! transcript in, actionable outcome out. This sits at the boundary facing
//! the interactive voice loop, so every failure is converted into a tagged
//! outcome instead of propagating — a raised error here would kill the
//! whole voice turn.

use crate::generator::MarkupGenerator;
use crate::intent::{Intent, IntentClassifier, IntentResult};
use crate::llm::TextModel;
use crate::markup::MarkupDocument;
use std::sync::Arc;
use tracing::{info, warn};

/// Failure tag when classification itself failed
pub const TAG_ERROR_CLASSIFICATION: &str = "ERROR_CLASSIFICATION";
/// Failure tag when generation of the KML document failed
pub const TAG_ERROR_KML_GENERATION: &str = "ERROR_KML_GENERATION";

/// Outcome of processing one voice transcript
#[derive(Debug)]
pub struct ProcessOutcome {
    pub success: bool,
    /// Machine action tag: an intent wire name or one of the error tags
    pub action: String,
    /// Full classification payload for direct commands
    pub params: Option<IntentResult>,
    /// Generated document, for GENERATE_KML outcomes
    pub kml: Option<MarkupDocument>,
    /// Human-readable failure detail
    pub error: Option<String>,
}

impl ProcessOutcome {
    fn failure(action: &str, error: String) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            params: None,
            kml: None,
            error: Some(error),
        }
    }
}

/// Transcript-to-outcome pipeline. Performs no execution itself; running
/// the resulting action against the cluster is the caller's job.
pub struct CommandProcessor {
    classifier: IntentClassifier,
    generator: MarkupGenerator,
}

impl CommandProcessor {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            classifier: IntentClassifier::new(Arc::clone(&model)),
            generator: MarkupGenerator::new(model),
        }
    }

    /// Process one transcript: classify, then generate KML when asked to.
    /// Never propagates an error past this boundary.
    pub async fn process(&self, transcript: &str) -> ProcessOutcome {
        let classification = match self.classifier.classify(transcript).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Classification failed: {}", e);
                return ProcessOutcome::failure(TAG_ERROR_CLASSIFICATION, e.to_string());
            }
        };

        match classification.intent {
            Intent::Unknown => {
                let detail = classification
                    .error
                    .clone()
                    .unwrap_or_else(|| "could not understand the request".to_string());
                ProcessOutcome::failure(Intent::Unknown.as_str(), detail)
            }
            Intent::GenerateKml => {
                // Fall back to the raw transcript when no query was classified
                let query = classification
                    .query
                    .clone()
                    .unwrap_or_else(|| transcript.to_string());

                match self.generator.generate(&query).await {
                    Ok(doc) => {
                        info!("Processed transcript into a KML document");
                        ProcessOutcome {
                            success: true,
                            action: Intent::GenerateKml.as_str().to_string(),
                            params: Some(classification),
                            kml: Some(doc),
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!("KML generation failed: {}", e);
                        ProcessOutcome::failure(TAG_ERROR_KML_GENERATION, e.to_string())
                    }
                }
            }
            direct => {
                // Direct command: pass the classification through untouched
                info!("Direct command: {}", direct.as_str());
                ProcessOutcome {
                    success: true,
                    action: direct.as_str().to_string(),
                    params: Some(classification),
                    kml: None,
                    error: None,
                }
            }
        }
    }
}
