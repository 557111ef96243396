//! # Voice Detection Endpoint
//!
//! Transport boundary for the detection pipeline: `POST /api/voice-detection`.
//!
//! ## Request handling order:
//! 1. API key check against the configured allow-list (401 on failure)
//! 2. JSON body deserialization (the language enum is closed; anything else
//!    is rejected by serde before the handler runs)
//! 3. Base64 decode of the audio payload (400 on failure)
//! 4. The core pipeline on the blocking thread pool; decoding and spectral
//!    analysis are CPU-bound and must not stall the async reactor
//! 5. Envelope assembly (success) or error envelope via `AppError` (failure)
//!
//! The handler owns every transport concern (headers, base64, JSON); the
//! pipeline behind it only ever sees raw bytes and a language tag.

use crate::detection::{self, response};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Languages the service accepts. Closed enumeration: serde rejects any
/// other value at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Tamil,
    English,
    Hindi,
    Malayalam,
    Telugu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Tamil => "Tamil",
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Malayalam => "Malayalam",
            Language::Telugu => "Telugu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The detection request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    pub language: Language,
    pub audio_format: String,
    pub audio_base64: String,
}

/// `POST /api/voice-detection`
pub async fn voice_detection(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    body: web::Json<DetectionRequest>,
) -> AppResult<HttpResponse> {
    authorize(&http_req, &state)?;

    let request = body.into_inner();
    let language = request.language;

    let audio_bytes = BASE64
        .decode(request.audio_base64.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("invalid base64 audio payload: {}", e)))?;

    let detection_config = state.config().detection.clone();

    state.increment_active_detections();
    let outcome = web::block(move || {
        detection::analyze(
            &audio_bytes,
            &request.audio_format,
            language.as_str(),
            &detection_config,
            &mut rand::thread_rng(),
        )
    })
    .await;
    state.decrement_active_detections();

    let result = outcome??;

    info!(
        language = %language,
        classification = result.label.as_str(),
        confidence = result.confidence,
        "Classified audio clip"
    );
    state.record_classification(result.label);

    Ok(HttpResponse::Ok().json(response::assemble(
        result.label,
        result.confidence,
        language.as_str(),
        &result.explanation,
    )))
}

/// Check the `x-api-key` header against the configured allow-list.
///
/// Absent and unrecognized keys get the same response, so callers cannot
/// probe which keys exist.
fn authorize(req: &HttpRequest, state: &AppState) -> AppResult<()> {
    let presented = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if state.config().security.api_keys.iter().any(|k| k == key) => Ok(()),
        _ => Err(AppError::Unauthorized(
            "Invalid API key or malformed request".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::json_error_handler;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    const TEST_KEY: &str = "sk_test_123456789";

    fn test_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(AppConfig::default()))
    }

    async fn call(
        state: web::Data<AppState>,
        api_key: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let app = test::init_service(
            App::new()
                .app_data(state)
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .route("/api/voice-detection", web::post().to(voice_detection)),
        )
        .await;

        let mut request = test::TestRequest::post().uri("/api/voice-detection");
        if let Some(key) = api_key {
            request = request.insert_header(("x-api-key", key));
        }
        let response = test::call_service(&app, request.set_json(body).to_request()).await;

        let status = response.status();
        let json = test::read_body_json(response).await;
        (status, json)
    }

    fn request_body(format: &str, audio_base64: &str) -> serde_json::Value {
        serde_json::json!({
            "language": "English",
            "audioFormat": format,
            "audioBase64": audio_base64
        })
    }

    #[actix_web::test]
    async fn missing_api_key_is_unauthorized() {
        let (status, body) = call(test_state(), None, request_body("mp3", "AAAA")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Invalid API key or malformed request");
    }

    #[actix_web::test]
    async fn unknown_api_key_is_unauthorized() {
        let (status, body) = call(test_state(), Some("not-a-key"), request_body("mp3", "AAAA")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn unsupported_format_is_rejected_with_envelope() {
        let (status, body) = call(test_state(), Some(TEST_KEY), request_body("wav", "AAAA")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(
            body["message"].as_str().unwrap().contains("format"),
            "message was {}",
            body["message"]
        );
    }

    #[actix_web::test]
    async fn invalid_base64_is_rejected_with_envelope() {
        let (status, body) =
            call(test_state(), Some(TEST_KEY), request_body("mp3", "!!!not-base64!!!")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("base64"));
    }

    #[actix_web::test]
    async fn non_audio_payload_is_a_processing_error_not_a_crash() {
        let junk = BASE64.encode(vec![7u8; 2048]);
        let (status, body) = call(test_state(), Some(TEST_KEY), request_body("mp3", &junk)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn unknown_language_is_rejected_by_the_closed_enum() {
        let body = serde_json::json!({
            "language": "Klingon",
            "audioFormat": "mp3",
            "audioBase64": "AAAA"
        });
        let (status, json) = call(test_state(), Some(TEST_KEY), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
    }

    #[actix_web::test]
    async fn empty_audio_payload_is_a_decode_error() {
        let (status, body) = call(test_state(), Some(TEST_KEY), request_body("mp3", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("decoding"));
    }

    #[::core::prelude::v1::test]
    fn language_round_trips_through_display() {
        for (language, expected) in [
            (Language::Tamil, "Tamil"),
            (Language::English, "English"),
            (Language::Hindi, "Hindi"),
            (Language::Malayalam, "Malayalam"),
            (Language::Telugu, "Telugu"),
        ] {
            assert_eq!(language.to_string(), expected);
        }
    }
}
