// handler/connections.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        connectiondtos::{RequestConnectionDto, RespondConnectionDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn connection_handler() -> Router {
    Router::new()
        .route("/", get(list_connections).post(request_connection))
        .route("/:connection_id/respond", put(respond_to_connection))
}

pub async fn list_connections(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let connections = app_state.ticket_service.connections(&auth.user).await;

    Ok(Json(ApiResponse::success(
        "Connections retrieved successfully",
        connections,
    )))
}

pub async fn request_connection(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RequestConnectionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let connection = app_state
        .ticket_service
        .request_connection(&auth.user, &body.tenant_email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Connection request sent", connection)),
    ))
}

pub async fn respond_to_connection(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(connection_id): Path<Uuid>,
    Json(body): Json<RespondConnectionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let connection = app_state
        .ticket_service
        .respond_to_connection(&auth.user, connection_id, body.accept)
        .await?;

    let message = if body.accept {
        "Connection accepted"
    } else {
        "Connection declined"
    };
    Ok(Json(ApiResponse::success(message, connection)))
}
