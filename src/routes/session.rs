use axum::{
    extract::{Path, State},
    response::Json,
};
use validator::Validate;

use crate::dto::session_dto::{AnswerRequest, AnswerResponse, SaveResponse, SessionView, TestSummary};
use crate::models::question::QuestionId;
use crate::services::bridge_platform::{BridgeStatus, PlatformReport};
use crate::session::violation_monitor::{PlatformSignal, SignalVerdict};
use crate::session::{SessionSnapshot, SessionState};
use crate::AppState;

#[axum::debug_handler]
pub async fn get_session(State(state): State<AppState>) -> crate::error::Result<Json<SessionView>> {
    let snapshot = state.session.snapshot().await?;
    let info = state.session.info();
    let questions = if snapshot.state == SessionState::InProgress {
        info.questions.questions.clone()
    } else {
        Vec::new()
    };
    Ok(Json(SessionView {
        test: TestSummary {
            assignment_id: info.assignment.id,
            test_id: info.assignment.test_id,
            duration_minutes: info.questions.duration_minutes,
            total_marks: info.questions.total_marks,
            instructions: info.questions.instructions.clone(),
            is_proctored: info.assignment.is_proctored,
            total_questions: info.questions.questions.len(),
        },
        session: snapshot,
        questions,
    }))
}

#[axum::debug_handler]
pub async fn begin(State(state): State<AppState>) -> crate::error::Result<Json<SessionSnapshot>> {
    let snapshot = state.session.begin().await?;
    tracing::info!(attempt_id = ?snapshot.attempt_id, "session started by host");
    Ok(Json(snapshot))
}

#[axum::debug_handler]
pub async fn put_answer(
    State(state): State<AppState>,
    Path(question_id): Path<QuestionId>,
    Json(req): Json<AnswerRequest>,
) -> crate::error::Result<Json<AnswerResponse>> {
    req.validate()?;
    let response = state.session.answer(question_id, req.into_payload()?).await?;
    Ok(Json(AnswerResponse {
        question_id: response.question_id,
        updated_at: response.updated_at,
    }))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(question_id): Path<QuestionId>,
) -> crate::error::Result<Json<SaveResponse>> {
    state.session.save(question_id).await?;
    Ok(Json(SaveResponse {
        saved: true,
        question_id,
    }))
}

#[axum::debug_handler]
pub async fn post_signal(
    State(state): State<AppState>,
    Json(signal): Json<PlatformSignal>,
) -> crate::error::Result<Json<SignalVerdict>> {
    Ok(Json(state.session.signal(signal).await?))
}

#[axum::debug_handler]
pub async fn post_platform(
    State(state): State<AppState>,
    Json(report): Json<PlatformReport>,
) -> crate::error::Result<Json<BridgeStatus>> {
    state.bridge.report(report);
    Ok(Json(state.bridge.status()))
}

#[axum::debug_handler]
pub async fn submit(State(state): State<AppState>) -> crate::error::Result<Json<SessionSnapshot>> {
    Ok(Json(state.session.submit().await?))
}

#[axum::debug_handler]
pub async fn retry_finalize(State(state): State<AppState>) -> crate::error::Result<Json<SessionSnapshot>> {
    Ok(Json(state.session.retry_finalize().await?))
}
