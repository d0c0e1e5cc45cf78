//! Gemini Contract Tests
//!
//! These tests pin the HTTP shape of the three outbound call kinds and the
//! mapping of backend failures onto `ComforterError`:
//! - Structured recipe requests carry a JSON schema and parse the reply
//! - Image requests carry an aspect ratio; hero falls back, steps propagate
//! - Speech requests carry the AUDIO modality and a prebuilt voice
//! - 429 / RESOURCE_EXHAUSTED are retried, other failures are not

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use comforter::ComforterError;
use comforter::audio::decode_payload;
use comforter::config::{PlaceholderConfig, PromptTemplates};
use comforter::gemini::{GeminiClient, GeminiConfig, GenerativeBackend};
use comforter::imagery::ImageSynthesizer;
use comforter::narration::AudioNarrator;
use comforter::recipe::{Budget, Mood, MoodBudgetContext, Recommendation, UserProfile};
use comforter::recommend::RecommendationRequester;
use comforter::retry::RetryPolicy;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEXT_PATH: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";
const IMAGE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";
const SPEECH_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn backend(server: &MockServer) -> Arc<dyn GenerativeBackend> {
    let config = GeminiConfig::new("test-key").with_base_url(server.uri());
    Arc::new(GeminiClient::new(config).unwrap())
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_base_delay_ms(10)
}

fn requester(server: &MockServer) -> RecommendationRequester {
    RecommendationRequester::new(
        backend(server),
        "gemini-3-flash-preview",
        fast_retry(),
        PromptTemplates::default(),
    )
}

fn synthesizer(server: &MockServer) -> ImageSynthesizer {
    ImageSynthesizer::new(
        backend(server),
        "gemini-2.5-flash-image",
        fast_retry(),
        PromptTemplates::default(),
        PlaceholderConfig::default(),
    )
}

fn narrator(server: &MockServer) -> AudioNarrator {
    AudioNarrator::new(
        backend(server),
        "gemini-2.5-flash-preview-tts",
        "Kore",
        fast_retry(),
        PromptTemplates::default(),
    )
}

fn vegetarian_recipe() -> Value {
    json!({
        "dishName": "Lemon Ricotta Gnocchi",
        "energyMatch": "Sunny & Light",
        "moodExplanation": "Pillowy gnocchi keep a happy mood buoyant.",
        "estimatedCost": "$14",
        "keyIngredients": ["Ricotta", "Lemon zest", "Parmesan", "Basil"],
        "instructions": [
            "Drain the ricotta.",
            "Mix with flour and zest.",
            "Roll and cut the gnocchi.",
            "Boil until they float.",
            "Toss with brown butter and basil."
        ],
        "bestFor": "A bright evening in",
        "prepTime": "40 mins",
        "chefTip": "Work the dough as little as possible."
    })
}

fn text_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn inline_body(mime: &str, data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"inlineData": {"mimeType": mime, "data": data}}]},
            "finishReason": "STOP"
        }]
    })
}

fn happy_mid() -> MoodBudgetContext {
    MoodBudgetContext::new(Some(Mood::Happy), Budget::Mid)
}

// ────────────────────────────────────────────────────────────────────────────
// Structured Recommendation Call
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_recommendation_request_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {"type": "OBJECT"}
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_body(&vegetarian_recipe().to_string())),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let profile = UserProfile {
        nationality: "Italian".to_owned(),
        dietary_preferences: vec!["Vegetarian".to_owned()],
        allergies: "peanuts".to_owned(),
        ..UserProfile::default()
    };
    let rec = requester(&mock_server)
        .request(&profile, &happy_mid())
        .await
        .unwrap();

    assert_eq!(rec.dish_name, "Lemon Ricotta Gnocchi");
    assert!(!rec.key_ingredients.is_empty());
    assert!(!rec.instructions.is_empty());
    assert!(
        rec.key_ingredients
            .iter()
            .all(|i| !i.to_lowercase().contains("peanut"))
    );
    assert!(rec.image_url.is_none());
    assert!(rec.step_images.is_none());

    let requests = mock_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Italian"));
    assert!(prompt.contains("Vegetarian"));
    assert!(prompt.contains("peanuts"));
    let required = body["generationConfig"]["responseSchema"]["required"]
        .as_array()
        .unwrap();
    assert_eq!(required.len(), 9);
}

#[tokio::test]
async fn test_recommendation_wrapped_in_prose_is_extracted() {
    let mock_server = MockServer::start().await;
    let wrapped = format!(
        "Of course! Here it is:\n```json\n{}\n```",
        vegetarian_recipe()
    );

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body(&wrapped)))
        .mount(&mock_server)
        .await;

    let rec = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap();
    assert_eq!(rec.prep_time, "40 mins");
}

#[tokio::test]
async fn test_plain_text_reply_is_malformed_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_body("I suggest a warm bowl of soup tonight.")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::MalformedOutput(_)));
    assert_eq!(err.code(), "MALFORMED_OUTPUT");
}

#[tokio::test]
async fn test_empty_candidates_is_no_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::NoContent(_)));
}

#[tokio::test]
async fn test_prompt_feedback_block_is_safety_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::SafetyBlocked(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// Error Mapping and Retry
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_429_then_success_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Too many requests", "status": "RESOURCE_EXHAUSTED"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_body(&vegetarian_recipe().to_string())),
        )
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let rec = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap();
    assert_eq!(rec.dish_name, "Lemon Ricotta Gnocchi");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_resource_exhausted_is_retried_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        })))
        .expect(3)
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::RequestFailed(_)));
}

#[tokio::test]
async fn test_invalid_key_is_service_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_undecodable_envelope_is_request_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let err = requester(&mock_server)
        .request(&UserProfile::default(), &happy_mid())
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::RequestFailed(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// Image Call
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hero_image_request_and_data_uri() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(json!({
            "generationConfig": {"imageConfig": {"aspectRatio": "16:9"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your photo."},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "SEVSTw=="}}
                ]}
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = synthesizer(&mock_server)
        .synthesize_hero_image("Lemon Ricotta Gnocchi")
        .await;
    assert_eq!(uri, "data:image/jpeg;base64,SEVSTw==");
}

#[tokio::test]
async fn test_hero_image_failure_falls_back_to_placeholder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let uri = synthesizer(&mock_server)
        .synthesize_hero_image("Lemon Ricotta Gnocchi")
        .await;
    assert_eq!(
        uri,
        "https://picsum.photos/seed/Lemon%20Ricotta%20Gnocchi/800/450"
    );
}

#[tokio::test]
async fn test_step_image_uses_standard_aspect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(json!({
            "generationConfig": {"imageConfig": {"aspectRatio": "4:3"}}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(inline_body("image/png", "U1RFUA==")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = synthesizer(&mock_server)
        .synthesize_step_image("Boil until they float.", "Lemon Ricotta Gnocchi")
        .await
        .unwrap();
    assert_eq!(uri, "data:image/png;base64,U1RFUA==");
}

#[tokio::test]
async fn test_step_image_failure_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let err = synthesizer(&mock_server)
        .synthesize_step_image("Boil until they float.", "Lemon Ricotta Gnocchi")
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::RequestFailed(_)));
}

#[tokio::test]
async fn test_step_image_without_inline_data_is_no_image() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("I cannot draw that.")))
        .mount(&mock_server)
        .await;

    let err = synthesizer(&mock_server)
        .synthesize_step_image("Boil until they float.", "Lemon Ricotta Gnocchi")
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::NoImageData(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// Speech Call
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_speech_request_format_and_decode() {
    let mock_server = MockServer::start().await;
    let pcm = STANDARD.encode([0x00u8, 0x40, 0x00, 0xC0, 0x00, 0x00]);

    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Kore"}}}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_body(
            "audio/L16;codec=pcm;rate=24000",
            &pcm,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recipe: Recommendation = serde_json::from_value(vegetarian_recipe()).unwrap();
    let payload = narrator(&mock_server)
        .narrate(&recipe, "Giulia Rossi")
        .await
        .unwrap();

    let buffer = decode_payload(&payload, 24_000, 1).unwrap();
    assert_eq!(buffer.samples, vec![0.5, -0.5, 0.0]);
    assert_eq!(buffer.frames(), 3);

    let requests = mock_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Giulia"));
    assert!(!prompt.contains("Rossi"));
    assert!(prompt.contains("Lemon Ricotta Gnocchi"));
}

#[tokio::test]
async fn test_speech_without_audio_is_no_audio_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Hello there!")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recipe: Recommendation = serde_json::from_value(vegetarian_recipe()).unwrap();
    let err = narrator(&mock_server)
        .narrate(&recipe, "Giulia")
        .await
        .unwrap_err();
    assert!(matches!(err, ComforterError::NoAudioData(_)));
}
