// handler/jobs.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{ticketdtos::{CompleteJobDto, RateJobDto}, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn job_handler() -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route("/:job_id/complete", put(complete_job))
        .route("/:job_id/rating", post(rate_job))
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.ticket_service.visible_jobs(&auth.user).await;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn complete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<CompleteJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let completed = app_state
        .ticket_service
        .complete_job(&auth.user, job_id, body.completion_notes, body.completion_photos)
        .await?;

    Ok(Json(ApiResponse::success(
        "Job completed successfully",
        completed,
    )))
}

pub async fn rate_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<RateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let rated = app_state
        .ticket_service
        .add_rating(&auth.user, job_id, body.rating)
        .await?;

    Ok(Json(ApiResponse::success("Thanks for your rating", rated)))
}
