use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{BookingSession, BookingStage};
use crate::services::voice::clean_for_speech;
use crate::state::AppState;

// POST /api/booking/message
#[derive(Deserialize)]
pub struct UtteranceRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct UtteranceResponse {
    pub session_id: String,
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoken: Option<String>,
    pub stage: BookingStage,
}

pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UtteranceRequest>,
) -> Result<Json<UtteranceResponse>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let session_id = payload
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!(session = %session_id, chars = message.chars().count(), "incoming utterance");
    tracing::debug!(session = %session_id, utterance = message, "utterance text");

    let reply = state.booking.handle_utterance(&session_id, message).await;
    let stage = state
        .booking
        .session(&session_id)
        .map(|s| s.stage)
        .unwrap_or_default();

    Ok(Json(UtteranceResponse {
        handled: reply.is_some(),
        spoken: reply.as_deref().map(clean_for_speech),
        reply,
        stage,
        session_id,
    }))
}

// GET /api/booking/times
#[derive(Serialize)]
pub struct TimesResponse {
    pub times: String,
}

pub async fn available_times(State(state): State<Arc<AppState>>) -> Json<TimesResponse> {
    let times = state.booking.gateway().get_formatted_available_times().await;
    Json(TimesResponse { times })
}

// GET /api/booking/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<BookingSession>, AppError> {
    state
        .booking
        .session(&session_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))
}

// POST /api/booking/sessions/:id/reset
#[derive(Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<ResetResponse> {
    let reset = state.booking.reset(&session_id).await;
    Json(ResetResponse { reset })
}

// POST /api/booking/sessions/:id/book
#[derive(Deserialize)]
pub struct DirectBookingRequest {
    pub name: String,
    pub email: String,
    pub preferred_time: Option<String>,
}

#[derive(Serialize)]
pub struct DirectBookingResponse {
    pub reply: String,
    pub spoken: String,
    pub stage: BookingStage,
}

pub async fn book_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<DirectBookingRequest>,
) -> Result<Json<DirectBookingResponse>, AppError> {
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("name and email are required".to_string()));
    }

    tracing::info!(session = %session_id, "direct booking requested");

    let reply = state
        .booking
        .book_directly(
            &session_id,
            &payload.name,
            &payload.email,
            payload.preferred_time.as_deref(),
        )
        .await;
    let stage = state
        .booking
        .session(&session_id)
        .map(|s| s.stage)
        .unwrap_or_default();

    Ok(Json(DirectBookingResponse {
        spoken: clean_for_speech(&reply),
        reply,
        stage,
    }))
}
