//! End-to-end voice-turn scenarios over a scripted model backend.

mod common;

use common::mock_model::{MockModel, ScriptedReply};
use rigvoice::cluster::{calculate_range, extract_coordinates};
use rigvoice::error::RigError;
use rigvoice::llm::profile::{extract_delta, ResponseShape};
use rigvoice::llm::sse::SseLineBuffer;
use rigvoice::processor::{
    CommandProcessor, TAG_ERROR_CLASSIFICATION, TAG_ERROR_KML_GENERATION,
};
use std::sync::Arc;

const EIFFEL_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Eiffel Tower</name>
      <Point><coordinates>2.2945,48.8584,0</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

fn processor_with(replies: Vec<ScriptedReply>) -> CommandProcessor {
    CommandProcessor::new(Arc::new(MockModel::new(replies)))
}

#[tokio::test]
async fn test_show_me_the_eiffel_tower() {
    let processor = processor_with(vec![
        ScriptedReply::text(r#"{"intent": "GENERATE_KML", "query": "Eiffel Tower"}"#),
        ScriptedReply::text(EIFFEL_KML),
    ]);

    let outcome = processor.process("Show me the Eiffel Tower").await;
    assert!(outcome.success, "outcome: {outcome:?}");
    assert_eq!(outcome.action, "GENERATE_KML");

    let doc = outcome.kml.expect("a document was generated");
    let coords = extract_coordinates(&doc.kml);
    assert_eq!(coords.len(), 1);
    assert!((coords[0].latitude - 48.8584).abs() < 1e-6);
    assert!((coords[0].longitude - 2.2945).abs() < 1e-6);

    // Single point: no meaningful spread, fixed default range
    assert_eq!(calculate_range(&coords), 500_000.0);
}

#[tokio::test]
async fn test_fenced_clear_kml_classification() {
    let processor = processor_with(vec![ScriptedReply::text(
        "```json\n{\"intent\":\"CLEAR_KML\"}\n```",
    )]);

    let outcome = processor.process("clear the screens please").await;
    assert!(outcome.success);
    assert_eq!(outcome.action, "CLEAR_KML");
    assert!(outcome.params.is_some());
    assert!(outcome.kml.is_none());
}

#[tokio::test]
async fn test_generation_query_falls_back_to_transcript() {
    // Classifier omits the query parameter entirely
    let processor = processor_with(vec![
        ScriptedReply::text(r#"{"intent": "GENERATE_KML"}"#),
        ScriptedReply::text(EIFFEL_KML),
    ]);

    let outcome = processor.process("show the tower in paris").await;
    assert!(outcome.success);
    assert!(outcome.kml.is_some());
}

#[tokio::test]
async fn test_provider_500_during_generation_is_tagged() {
    let processor = processor_with(vec![
        ScriptedReply::text(r#"{"intent": "GENERATE_KML", "query": "Mars"}"#),
        ScriptedReply::Provider {
            status: 500,
            body: "upstream exploded".into(),
        },
    ]);

    let outcome = processor.process("show me mars").await;
    assert!(!outcome.success);
    // The underlying error subtype does not matter at this boundary
    assert_eq!(outcome.action, TAG_ERROR_KML_GENERATION);
    let detail = outcome.error.unwrap();
    assert!(detail.contains("500"), "detail: {detail}");
}

#[tokio::test]
async fn test_classification_failure_is_tagged() {
    let processor = processor_with(vec![ScriptedReply::Provider {
        status: 503,
        body: "overloaded".into(),
    }]);

    let outcome = processor.process("anything").await;
    assert!(!outcome.success);
    assert_eq!(outcome.action, TAG_ERROR_CLASSIFICATION);
}

#[tokio::test]
async fn test_unparseable_classification_is_tagged() {
    let processor = processor_with(vec![ScriptedReply::text("I'd rather not emit JSON.")]);

    let outcome = processor.process("anything").await;
    assert!(!outcome.success);
    assert_eq!(outcome.action, TAG_ERROR_CLASSIFICATION);
}

#[tokio::test]
async fn test_unknown_intent_outcome() {
    let processor = processor_with(vec![ScriptedReply::text(r#"{"intent": "UNKNOWN"}"#)]);

    let outcome = processor.process("what is the meaning of life").await;
    assert!(!outcome.success);
    assert_eq!(outcome.action, "UNKNOWN");
}

#[tokio::test]
async fn test_invalid_generated_markup_is_tagged() {
    let processor = processor_with(vec![
        ScriptedReply::text(r#"{"intent": "GENERATE_KML", "query": "x"}"#),
        ScriptedReply::text("<kml><Document><Placemark></Document></kml>"),
    ]);

    let outcome = processor.process("show x").await;
    assert!(!outcome.success);
    assert_eq!(outcome.action, TAG_ERROR_KML_GENERATION);
}

/// Accumulated text at the end of an OpenAI-style SSE stream equals the
/// in-order concatenation of the delta fragments, independent of chunking.
#[test]
fn test_sse_accumulation_matches_fragment_order() {
    let fragments = ["<kml>", "<Document>", "</Document>", "</kml>"];
    let mut wire = String::new();
    for f in fragments {
        wire.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{f}\"}}}}]}}\n\n"
        ));
    }
    wire.push_str("data: [DONE]\n");

    let expected: String = fragments.concat();

    // Re-chunk the same logical stream at several arbitrary boundaries
    for chunk_size in [1, 7, 13, wire.len()] {
        let mut buffer = SseLineBuffer::new();
        let mut accumulated = String::new();
        let mut saw_done = false;

        for chunk in wire.as_bytes().chunks(chunk_size) {
            for record in buffer.push(chunk) {
                if record == "[DONE]" {
                    saw_done = true;
                    continue;
                }
                let payload: serde_json::Value = serde_json::from_str(&record).unwrap();
                if let Some(fragment) = extract_delta(ResponseShape::OpenAiChat, &payload) {
                    accumulated.push_str(&fragment);
                }
            }
        }

        assert!(saw_done, "chunk_size {chunk_size}");
        assert_eq!(accumulated, expected, "chunk_size {chunk_size}");
    }
}

#[tokio::test]
async fn test_empty_model_reply_is_empty_response_error() {
    use rigvoice::generator::MarkupGenerator;

    let generator = MarkupGenerator::new(Arc::new(MockModel::new(vec![ScriptedReply::text(
        "  \n ",
    )])));
    let err = generator.generate("q").await.unwrap_err();
    assert!(matches!(err, RigError::EmptyResponse));
}
