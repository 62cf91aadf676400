// handler/tickets.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{ticketdtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn ticket_handler() -> Router {
    Router::new()
        .route("/", post(submit_ticket).get(list_tickets))
        .route("/:ticket_id", get(get_ticket))
        .route(
            "/:ticket_id/applications",
            post(apply_to_ticket).get(get_applications),
        )
        .route("/:ticket_id/assign", put(assign_contractor))
        .route("/:ticket_id/schedule", put(schedule_ticket))
        .route("/:ticket_id/messages", post(add_message))
        .route("/:ticket_id/contractors", get(get_eligible_contractors))
}

pub async fn submit_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .submit_ticket(&auth.user, body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Ticket submitted successfully", ticket)),
    ))
}

pub async fn list_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state.ticket_service.visible_tickets(&auth.user).await;

    Ok(Json(ApiResponse::success(
        "Tickets retrieved successfully",
        tickets,
    )))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .ticket(&auth.user, ticket_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Ticket retrieved successfully",
        ticket,
    )))
}

pub async fn apply_to_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .ticket_service
        .apply_to_ticket(&auth.user, ticket_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Application submitted successfully",
            application,
        )),
    ))
}

pub async fn get_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .ticket_service
        .applications(&auth.user, ticket_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Applications retrieved successfully",
        applications,
    )))
}

pub async fn assign_contractor(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<AssignContractorDto>,
) -> Result<impl IntoResponse, HttpError> {
    let assignment = app_state
        .ticket_service
        .assign_contractor(&auth.user, ticket_id, body.contractor_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Contractor assigned successfully",
        assignment,
    )))
}

pub async fn schedule_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<ScheduleTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let scheduled = app_state
        .ticket_service
        .schedule_ticket(&auth.user, ticket_id, &body.date, &body.time)
        .await?;

    Ok(Json(ApiResponse::success(
        "Ticket scheduled successfully",
        scheduled,
    )))
}

pub async fn add_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<AddMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .ticket_service
        .add_message(&auth.user, ticket_id, &body.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message)),
    ))
}

pub async fn get_eligible_contractors(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let matches = app_state
        .ticket_service
        .eligible_contractors(&auth.user, ticket_id)
        .await?;

    let message = if matches.is_empty() {
        "No contractors match this ticket"
    } else {
        "Eligible contractors retrieved successfully"
    };
    Ok(Json(ApiResponse::success(message, matches)))
}
