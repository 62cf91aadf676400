use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::ticketmodel::TicketPriority,
    service::lifecycle::TicketDraft,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTicketDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be between 1 and 5000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,

    pub priority: Option<TicketPriority>,

    #[serde(default)]
    pub property_address: String,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,

    pub ai_diagnosis: Option<String>,

    #[serde(default)]
    pub photos: Vec<String>,
}

impl From<CreateTicketDto> for TicketDraft {
    fn from(dto: CreateTicketDto) -> Self {
        TicketDraft {
            title: dto.title,
            description: dto.description,
            category: dto.category,
            priority: dto.priority,
            property_address: dto.property_address,
            city: dto.city,
            state: dto.state,
            ai_diagnosis: dto.ai_diagnosis,
            photos: dto.photos,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignContractorDto {
    pub contractor_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ScheduleTicketDto {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,

    #[validate(length(min = 1, message = "Time is required"))]
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CompleteJobDto {
    #[validate(length(max = 2000, message = "Completion notes must be at most 2000 characters"))]
    pub completion_notes: Option<String>,

    pub completion_photos: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RateJobDto {
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: f32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub text: String,
}
