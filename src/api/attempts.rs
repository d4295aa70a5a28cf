use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentSession;
use crate::core::state::AppState;
use crate::schemas::attempt::{
    AttemptView, CreateAttemptResponse, SubmitAttemptRequest, SubmitAttemptResult,
};
use crate::services::attempt_submission::{self, SubmissionMode};
use crate::services::{attempt_creation, attempt_view};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assignment_id/attempts", post(create_attempt))
        .route("/:assignment_id/attempts/:attempt_id/submit", post(submit_attempt))
        .route("/:assignment_id/attempts/:attempt_id", get(get_attempt))
}

async fn create_attempt(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(assignment_id): Path<String>,
) -> Result<Json<CreateAttemptResponse>, ApiError> {
    let response = attempt_creation::create(&state, &assignment_id, &session.0.sub).await?;
    Ok(Json(response))
}

async fn submit_attempt(
    State(state): State<AppState>,
    session: CurrentSession,
    Path((assignment_id, attempt_id)): Path<(String, String)>,
    Json(request): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResult>, ApiError> {
    request.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let mode = if session.is_author() {
        SubmissionMode::Ephemeral
    } else {
        SubmissionMode::Persisted {
            user_id: session.0.sub.clone(),
            outcome_token: session.0.outcome_token.clone(),
        }
    };

    let result =
        attempt_submission::submit(&state, &attempt_id, &assignment_id, request, mode).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct GetAttemptQuery {
    language: Option<String>,
}

async fn get_attempt(
    State(state): State<AppState>,
    session: CurrentSession,
    Path((assignment_id, attempt_id)): Path<(String, String)>,
    Query(query): Query<GetAttemptQuery>,
) -> Result<Json<AttemptView>, ApiError> {
    let view = attempt_view::load(
        &state,
        &assignment_id,
        &attempt_id,
        query.language.as_deref(),
        &session.0.sub,
        session.is_author(),
    )
    .await?;
    Ok(Json(view))
}
