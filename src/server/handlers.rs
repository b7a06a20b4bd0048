use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// URL of the PDF or DOCX document
    pub documents: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    uptime_secs: u64,
}

pub(crate) fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        message: "doc-rag is running",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub(crate) async fn run_handler(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Response {
    info!(
        "Received request for document URL: {} ({} questions)",
        request.documents,
        request.questions.len()
    );

    let pipeline = Arc::clone(&state.pipeline);
    let AnswerRequest {
        documents,
        questions,
    } = request;
    let outcome =
        tokio::task::spawn_blocking(move || pipeline.answer(&documents, &questions)).await;

    let failure = match outcome {
        Ok(Ok(answers)) => return Json(AnswerResponse { answers }).into_response(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("pipeline task failed: {e}"),
    };

    error!("Request failed: {}", failure);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed during document processing pipeline: {failure}"),
    )
}
