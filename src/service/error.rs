use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::db::StorageError,
    error::HttpError,
    models::ticketmodel::TicketStatus,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Ticket {0} not found")]
    TicketNotFound(Uuid),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("No job exists for ticket {0}")]
    JobForTicketNotFound(Uuid),

    #[error("Contractor {0} not found")]
    ContractorNotFound(Uuid),

    #[error("Connection {0} not found")]
    ConnectionNotFound(Uuid),

    #[error("Ticket {0} is in status {1:?}, which does not allow this action")]
    InvalidTicketStatus(Uuid, TicketStatus),

    #[error("Ticket {0} is already assigned")]
    AlreadyAssigned(Uuid),

    #[error("Ticket {0} has already been rated")]
    AlreadyRated(Uuid),

    #[error("Contractor {1} has already applied to ticket {0}")]
    DuplicateApplication(Uuid, Uuid),

    #[error("A pending or active connection already exists between {0} and {1}")]
    DuplicateConnection(String, String),

    #[error("A contractor profile already exists for {0}")]
    DuplicateContractor(String),

    #[error("Connection {0} has already been answered")]
    ConnectionAlreadyAnswered(Uuid),

    #[error("User {0} is not authorized to perform this action on ticket {1}")]
    UnauthorizedTicketAccess(String, Uuid),

    #[error("User {0} is not authorized to perform this action on connection {1}")]
    UnauthorizedConnectionAccess(String, Uuid),

    #[error("{0}")]
    RoleNotPermitted(String),

    #[error("User {0} has no contractor profile")]
    ContractorProfileNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TicketNotFound(_)
            | ServiceError::JobNotFound(_)
            | ServiceError::JobForTicketNotFound(_)
            | ServiceError::ContractorNotFound(_)
            | ServiceError::ConnectionNotFound(_)
            | ServiceError::ContractorProfileNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidTicketStatus(_, _) | ServiceError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }

            ServiceError::AlreadyAssigned(_)
            | ServiceError::AlreadyRated(_)
            | ServiceError::DuplicateApplication(_, _)
            | ServiceError::DuplicateConnection(_, _)
            | ServiceError::DuplicateContractor(_)
            | ServiceError::ConnectionAlreadyAnswered(_)
            | ServiceError::Storage(StorageError::Conflict { .. }) => StatusCode::CONFLICT,

            ServiceError::UnauthorizedTicketAccess(_, _)
            | ServiceError::UnauthorizedConnectionAccess(_, _)
            | ServiceError::RoleNotPermitted(_) => StatusCode::FORBIDDEN,

            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Service failure: {}", error);
        }
        HttpError::new(error.to_string(), status)
    }
}
