use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Assigned,
    Scheduled,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Contractor-facing work record, created once per ticket on assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub contractor_id: Uuid,
    pub property_address: String,
    pub issue_type: String,
    pub status: JobStatus,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub completion_notes: Option<String>,
    pub completion_photos: Option<Vec<String>>,
    pub rating: Option<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobApplication {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub contractor_id: Uuid,
    pub contractor_name: String,
    pub contractor_email: String,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
}
