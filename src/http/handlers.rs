use super::state::AppState;
use crate::audio::{AudioError, WAVEFORM_GAIN};
use crate::document;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Background the chat agent should take into account
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    /// Original file name; its extension selects the extractor
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
    pub format: String,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub session_id: String,
    pub status: String,
    pub format: String,
    pub bytes: usize,
    pub audio_base64: String,
    /// Speech-to-text of the recording, when a voice client is available
    pub transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    pub audio_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct WaveformRequest {
    pub audio_base64: String,
    pub columns: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WaveformResponse {
    /// RMS values; absent when the audio could not be analysed
    pub envelope: Option<Vec<f32>>,
    pub gain: f32,
}

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    pub audio_base64: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn audio_error_response(err: &AudioError) -> Response {
    let status = match err {
        AudioError::CaptureAccessDenied(_) => StatusCode::FORBIDDEN,
        AudioError::CaptureUnsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        AudioError::CaptureNotStarted | AudioError::AlreadyCapturing => StatusCode::CONFLICT,
        AudioError::Base64(_) | AudioError::Decode(_) => StatusCode::BAD_REQUEST,
        AudioError::Encoding(_) | AudioError::Playback(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn session_not_found(session_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Voice session {} not found", session_id),
    )
}

fn require_text(text: &str) -> Option<Response> {
    if text.trim().is_empty() {
        Some(error_response(StatusCode::BAD_REQUEST, "text must not be empty"))
    } else {
        None
    }
}

async fn find_session(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<Mutex<crate::audio::VoiceAudio>>, Response> {
    state
        .session(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /agent/generate
pub async fn generate_response(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Response {
    if let Some(resp) = require_text(&req.text) {
        return resp;
    }
    let text = state.agent.generate_response(&req.text).await;
    Json(TextResponse { text }).into_response()
}

/// POST /agent/review
pub async fn review_response(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Response {
    if let Some(resp) = require_text(&req.text) {
        return resp;
    }
    let text = state.agent.review_response(&req.text).await;
    Json(TextResponse { text }).into_response()
}

/// POST /agent/rewrite
pub async fn rewrite_response(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Response {
    if let Some(resp) = require_text(&req.text) {
        return resp;
    }
    let text = state.agent.rewrite_response(&req.text).await;
    Json(TextResponse { text }).into_response()
}

/// POST /agent/chat
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if let Some(resp) = require_text(&req.message) {
        return resp;
    }
    let context = req.context.unwrap_or_default();
    let text = state.agent.chat(&req.message, &context).await;
    Json(TextResponse { text }).into_response()
}

/// POST /files/extract?name=question.docx
pub async fn extract_file(Query(query): Query<ExtractQuery>, body: Bytes) -> Response {
    match document::extract_text(&body, &query.name) {
        Ok(text) => Json(TextResponse { text }).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, format!("{:#}", e)),
    }
}

/// POST /voice/sessions
pub async fn create_session(State(state): State<AppState>) -> Response {
    let session_id = format!("voice-{}", uuid::Uuid::new_v4());
    let audio = state.audio.new_session();

    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), Arc::new(Mutex::new(audio)));

    info!("Voice session created: {}", session_id);

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            status: "created".to_string(),
        }),
    )
        .into_response()
}

/// DELETE /voice/sessions/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = state.sessions.write().await.remove(&session_id);

    let Some(session) = session else {
        return session_not_found(&session_id);
    };

    match Arc::try_unwrap(session) {
        Ok(audio) => audio.into_inner().dispose().await,
        // A request still holds the session; its handles go when that request ends
        Err(_) => warn!("Voice session {} still in use; released on last drop", session_id),
    }

    info!("Voice session disposed: {}", session_id);

    Json(SessionResponse {
        session_id,
        status: "disposed".to_string(),
    })
    .into_response()
}

/// POST /voice/sessions/:session_id/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let mut audio = session.lock().await;
    match audio.begin_capture().await {
        Ok(format) => {
            info!("Recording started for session: {}", session_id);
            Json(StartRecordingResponse {
                session_id,
                status: "recording".to_string(),
                format: format.to_string(),
                started_at: audio.capture_started_at(),
            })
            .into_response()
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            audio_error_response(&e)
        }
    }
}

/// POST /voice/sessions/:session_id/record/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let captured = {
        let mut audio = session.lock().await;
        audio.end_capture().await
    };

    let captured = match captured {
        Ok(captured) => captured,
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            return audio_error_response(&e);
        }
    };

    let transcript = if state.voice.is_initialized() {
        match state.voice.send_voice_message(&captured.bytes).await {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Voice message failed: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    info!("Recording stopped for session: {}", session_id);

    Json(StopRecordingResponse {
        session_id,
        status: "stopped".to_string(),
        format: captured.format.to_string(),
        bytes: captured.bytes.len(),
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&captured.bytes),
        transcript,
    })
    .into_response()
}

/// POST /voice/sessions/:session_id/play
pub async fn play_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AudioRequest>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let mut audio = session.lock().await;
    match audio.play_audio(&req.audio_base64).await {
        Ok(()) => Json(SessionResponse {
            session_id,
            status: "playing".to_string(),
        })
        .into_response(),
        Err(e) => {
            error!("Audio playback failed: {}", e);
            audio_error_response(&e)
        }
    }
}

/// POST /voice/sessions/:session_id/stop
pub async fn stop_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    session.lock().await.stop_audio().await;

    Json(SessionResponse {
        session_id,
        status: "stopped".to_string(),
    })
    .into_response()
}

/// POST /voice/sessions/:session_id/waveform
pub async fn waveform(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<WaveformRequest>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let columns = req.columns.unwrap_or(state.audio.waveform_columns);
    let envelope = session
        .lock()
        .await
        .waveform(&req.audio_base64, columns)
        .await;

    Json(WaveformResponse {
        envelope,
        gain: WAVEFORM_GAIN,
    })
    .into_response()
}

/// POST /voice/respond
pub async fn respond_with_voice(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Response {
    if let Some(resp) = require_text(&req.text) {
        return resp;
    }

    match state.voice.get_audio_response(&req.text).await {
        Ok(audio) => Json(AudioResponse {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
        })
        .into_response(),
        Err(e) => {
            error!("Audio response failed: {:#}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, format!("{:#}", e))
        }
    }
}
