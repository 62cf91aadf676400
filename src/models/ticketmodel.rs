use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::usermodel::UserRole;

/// Lifecycle states of a maintenance ticket, in the only order they may be visited.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Submitted,
    Assigned,
    Scheduled,
    Completed,
}

impl TicketStatus {
    pub fn to_str(&self) -> &str {
        match self {
            TicketStatus::Submitted => "submitted",
            TicketStatus::Assigned => "assigned",
            TicketStatus::Scheduled => "scheduled",
            TicketStatus::Completed => "completed",
        }
    }

    /// Whether moving from `self` to `next` is a legal step.
    ///
    /// Scheduled -> Scheduled is allowed so a booking can be moved.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Submitted, TicketStatus::Assigned)
                | (TicketStatus::Assigned, TicketStatus::Scheduled)
                | (TicketStatus::Scheduled, TicketStatus::Scheduled)
                | (TicketStatus::Scheduled, TicketStatus::Completed)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_email: String,
    pub sender_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Option<TicketPriority>,
    pub status: TicketStatus,
    pub submitted_by: String,
    pub submitted_by_role: UserRole,
    pub assigned_to: Option<Uuid>,
    pub property_address: String,
    pub city: String,
    pub state: String,
    pub scheduled_date: Option<String>,
    pub completed_date: Option<String>,
    pub rating: Option<f32>,
    pub ai_diagnosis: Option<String>,
    pub photos: Vec<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every committed write; storage rejects writes against a stale value.
    pub revision: i64,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.assigned_to.is_none() && self.status == TicketStatus::Submitted
    }
}
