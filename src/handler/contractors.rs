// handler/contractors.rs
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{contractordtos::RegisterContractorDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn contractor_handler() -> Router {
    Router::new().route("/", get(list_contractors).post(register_contractor))
}

pub async fn list_contractors(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let contractors = app_state.ticket_service.contractors().await;

    Ok(Json(ApiResponse::success(
        "Contractors retrieved successfully",
        contractors,
    )))
}

pub async fn register_contractor(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RegisterContractorDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let contractor = app_state
        .ticket_service
        .register_contractor(&auth.user, body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Contractor registered successfully",
            contractor,
        )),
    ))
}
