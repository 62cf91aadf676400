// service/lifecycle.rs
//
// Every command reads the current snapshot and either rejects the call or
// returns the next snapshot together with the records it touched. Nothing
// here performs I/O; `TicketService` decides when a transition is committed.
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::snapshot::{ChangeSet, Snapshot},
    models::{
        connectionmodel::{ConnectionStatus, LandlordTenantConnection},
        contractormodel::Contractor,
        jobmodel::{ApplicationStatus, Job, JobApplication, JobStatus},
        ticketmodel::{Message, Ticket, TicketPriority, TicketStatus},
        usermodel::{normalize_email, CurrentUser},
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub snapshot: Snapshot,
    pub changes: ChangeSet,
    pub output: T,
}

impl<T> Transition<T> {
    fn new(current: &Snapshot, changes: ChangeSet, output: T) -> Self {
        let mut snapshot = current.clone();
        snapshot.apply(&changes);
        Self {
            snapshot,
            changes,
            output,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Option<TicketPriority>,
    pub property_address: String,
    pub city: String,
    pub state: String,
    pub ai_diagnosis: Option<String>,
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContractorDraft {
    pub name: String,
    pub email: String,
    pub company: String,
    pub specialization: Vec<String>,
    pub service_areas: BTreeMap<String, Vec<String>>,
    pub preferred: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assignment {
    pub ticket: Ticket,
    pub job: Job,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingOutcome {
    pub ticket: Ticket,
    pub job: Job,
    pub contractor: Option<Contractor>,
}

fn require(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn find_ticket(snapshot: &Snapshot, ticket_id: Uuid) -> Result<&Ticket, ServiceError> {
    snapshot
        .ticket(ticket_id)
        .ok_or(ServiceError::TicketNotFound(ticket_id))
}

fn find_job(snapshot: &Snapshot, job_id: Uuid) -> Result<&Job, ServiceError> {
    snapshot.job(job_id).ok_or(ServiceError::JobNotFound(job_id))
}

fn find_contractor(snapshot: &Snapshot, contractor_id: Uuid) -> Result<&Contractor, ServiceError> {
    snapshot
        .contractor(contractor_id)
        .ok_or(ServiceError::ContractorNotFound(contractor_id))
}

/// Stores a ticket in `Submitted`.
pub fn submit_ticket(
    snapshot: &Snapshot,
    submitter: &CurrentUser,
    draft: TicketDraft,
    now: DateTime<Utc>,
) -> Result<Transition<Ticket>, ServiceError> {
    require(&draft.title, "Title")?;
    require(&draft.description, "Description")?;
    require(&draft.category, "Category")?;
    require(&submitter.email, "Submitter email")?;

    let ticket = Ticket {
        id: Uuid::new_v4(),
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        category: draft.category.trim().to_string(),
        priority: draft.priority,
        status: TicketStatus::Submitted,
        submitted_by: normalize_email(&submitter.email),
        submitted_by_role: submitter.role,
        assigned_to: None,
        property_address: draft.property_address.trim().to_string(),
        city: draft.city.trim().to_string(),
        state: draft.state.trim().to_string(),
        scheduled_date: None,
        completed_date: None,
        rating: None,
        ai_diagnosis: draft.ai_diagnosis,
        photos: draft.photos,
        messages: Vec::new(),
        created_at: now,
        revision: 1,
    };

    let changes = ChangeSet {
        tickets: vec![ticket.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, ticket))
}

pub fn register_contractor(
    snapshot: &Snapshot,
    draft: ContractorDraft,
    now: DateTime<Utc>,
) -> Result<Transition<Contractor>, ServiceError> {
    require(&draft.name, "Name")?;
    require(&draft.email, "Email")?;

    let email = normalize_email(&draft.email);
    if snapshot.contractors.iter().any(|c| c.email == email) {
        return Err(ServiceError::DuplicateContractor(email));
    }

    let specialization: Vec<String> = draft
        .specialization
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if specialization.is_empty() {
        return Err(ServiceError::Validation(
            "At least one specialization is required".to_string(),
        ));
    }

    let contractor = Contractor {
        id: Uuid::new_v4(),
        name: draft.name.trim().to_string(),
        email,
        company: draft.company.trim().to_string(),
        specialization,
        service_areas: draft.service_areas,
        rating: 0.0,
        completed_jobs: 0,
        preferred: draft.preferred,
        created_at: now,
        revision: 1,
    };

    let changes = ChangeSet {
        contractors: vec![contractor.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, contractor))
}

/// Records a contractor's interest in an open ticket.
pub fn apply_to_ticket(
    snapshot: &Snapshot,
    ticket_id: Uuid,
    contractor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Transition<JobApplication>, ServiceError> {
    let ticket = find_ticket(snapshot, ticket_id)?;
    let contractor = find_contractor(snapshot, contractor_id)?;

    if ticket.assigned_to.is_some() {
        return Err(ServiceError::AlreadyAssigned(ticket_id));
    }
    if ticket.status != TicketStatus::Submitted {
        return Err(ServiceError::InvalidTicketStatus(ticket_id, ticket.status));
    }
    if snapshot
        .applications_for(ticket_id)
        .iter()
        .any(|a| a.contractor_id == contractor_id)
    {
        return Err(ServiceError::DuplicateApplication(ticket_id, contractor_id));
    }

    let application = JobApplication {
        id: Uuid::new_v4(),
        ticket_id,
        contractor_id,
        contractor_name: contractor.name.clone(),
        contractor_email: contractor.email.clone(),
        applied_at: now,
        status: ApplicationStatus::Pending,
    };

    let changes = ChangeSet {
        applications: vec![application.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, application))
}

/// `Submitted -> Assigned`.
///
/// Accepts the contractor's application if there is one, rejects every other
/// pending application on the ticket and creates the ticket's only job.
pub fn assign_contractor(
    snapshot: &Snapshot,
    ticket_id: Uuid,
    contractor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Transition<Assignment>, ServiceError> {
    let ticket = find_ticket(snapshot, ticket_id)?;

    if ticket.assigned_to.is_some() {
        return Err(ServiceError::AlreadyAssigned(ticket_id));
    }
    if !ticket.status.can_transition_to(TicketStatus::Assigned) {
        return Err(ServiceError::InvalidTicketStatus(ticket_id, ticket.status));
    }
    find_contractor(snapshot, contractor_id)?;

    let mut ticket = ticket.clone();
    ticket.assigned_to = Some(contractor_id);
    ticket.status = TicketStatus::Assigned;
    ticket.revision += 1;

    let applications: Vec<JobApplication> = snapshot
        .applications_for(ticket_id)
        .into_iter()
        .filter(|a| a.status == ApplicationStatus::Pending)
        .map(|a| {
            let mut a = a.clone();
            a.status = if a.contractor_id == contractor_id {
                ApplicationStatus::Accepted
            } else {
                ApplicationStatus::Rejected
            };
            a
        })
        .collect();

    let job = match snapshot.job_for_ticket(ticket_id) {
        Some(existing) => {
            let mut job = existing.clone();
            job.contractor_id = contractor_id;
            job.status = JobStatus::Assigned;
            job
        }
        None => Job {
            id: Uuid::new_v4(),
            ticket_id,
            contractor_id,
            property_address: ticket.property_address.clone(),
            issue_type: ticket.category.clone(),
            status: JobStatus::Assigned,
            scheduled_date: None,
            scheduled_time: None,
            completion_notes: None,
            completion_photos: None,
            rating: None,
            created_at: now,
        },
    };

    let changes = ChangeSet {
        tickets: vec![ticket.clone()],
        jobs: vec![job.clone()],
        applications,
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, Assignment { ticket, job }))
}

/// Accepts `HH:MM` (24-hour) or `h:MM AM/PM` and returns `HH:MM`.
pub fn normalize_time(time: &str) -> Result<String, ServiceError> {
    let input = time.trim().to_uppercase();

    ["%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&input, format).ok())
        .map(|parsed| parsed.format("%H:%M").to_string())
        .ok_or_else(|| ServiceError::Validation(format!("Invalid time '{}'", time.trim())))
}

pub fn normalize_date(date: &str) -> Result<String, ServiceError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|parsed| parsed.format("%Y-%m-%d").to_string())
        .map_err(|_| ServiceError::Validation(format!("Invalid date '{}'", date.trim())))
}

/// `Assigned -> Scheduled`, or moves an existing booking.
pub fn schedule_ticket(
    snapshot: &Snapshot,
    ticket_id: Uuid,
    date: &str,
    time: &str,
) -> Result<Transition<Assignment>, ServiceError> {
    let ticket = find_ticket(snapshot, ticket_id)?;
    if !ticket.status.can_transition_to(TicketStatus::Scheduled) {
        return Err(ServiceError::InvalidTicketStatus(ticket_id, ticket.status));
    }
    let job = snapshot
        .job_for_ticket(ticket_id)
        .ok_or(ServiceError::JobForTicketNotFound(ticket_id))?;

    let date = normalize_date(date)?;
    let time = normalize_time(time)?;

    let mut ticket = ticket.clone();
    ticket.status = TicketStatus::Scheduled;
    ticket.scheduled_date = Some(format!("{} {}", date, time));
    ticket.revision += 1;

    let mut job = job.clone();
    job.status = JobStatus::Scheduled;
    job.scheduled_date = Some(date);
    job.scheduled_time = Some(time);

    let changes = ChangeSet {
        tickets: vec![ticket.clone()],
        jobs: vec![job.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, Assignment { ticket, job }))
}

/// Other unfinished jobs of `contractor_id` booked on `date`.
///
/// Advisory only: `schedule_ticket` never consults it.
pub fn same_day_conflicts<'a>(
    snapshot: &'a Snapshot,
    contractor_id: Uuid,
    date: &str,
    ticket_id: Uuid,
) -> Vec<&'a Job> {
    let date = date.trim();
    snapshot
        .jobs
        .iter()
        .filter(|j| j.contractor_id == contractor_id && j.ticket_id != ticket_id)
        .filter(|j| j.status != JobStatus::Completed)
        .filter(|j| j.scheduled_date.as_deref() == Some(date))
        .collect()
}

/// Completes the job and its ticket in one change set.
pub fn complete_job(
    snapshot: &Snapshot,
    job_id: Uuid,
    completion_notes: Option<String>,
    completion_photos: Option<Vec<String>>,
    now: DateTime<Utc>,
) -> Result<Transition<Assignment>, ServiceError> {
    let job = find_job(snapshot, job_id)?;
    let ticket = find_ticket(snapshot, job.ticket_id)?;

    if job.status == JobStatus::Completed
        || !ticket.status.can_transition_to(TicketStatus::Completed)
    {
        return Err(ServiceError::InvalidTicketStatus(ticket.id, ticket.status));
    }

    let mut job = job.clone();
    job.status = JobStatus::Completed;
    job.completion_notes = completion_notes;
    job.completion_photos = completion_photos;

    let mut ticket = ticket.clone();
    ticket.status = TicketStatus::Completed;
    ticket.completed_date = Some(now.to_rfc3339());
    ticket.revision += 1;

    let contractors = snapshot
        .contractor(job.contractor_id)
        .map(|c| {
            let mut c = c.clone();
            c.completed_jobs += 1;
            c.revision += 1;
            vec![c]
        })
        .unwrap_or_default();

    let changes = ChangeSet {
        tickets: vec![ticket.clone()],
        jobs: vec![job.clone()],
        contractors,
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, Assignment { ticket, job }))
}

/// Rates a completed job once and refreshes the contractor's running mean.
pub fn add_rating(
    snapshot: &Snapshot,
    job_id: Uuid,
    rating: f32,
) -> Result<Transition<RatingOutcome>, ServiceError> {
    if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
        return Err(ServiceError::Validation(
            "Rating must be between 0 and 5".to_string(),
        ));
    }

    let job = find_job(snapshot, job_id)?;
    let ticket = find_ticket(snapshot, job.ticket_id)?;

    if ticket.status != TicketStatus::Completed {
        return Err(ServiceError::InvalidTicketStatus(ticket.id, ticket.status));
    }
    if ticket.rating.is_some() || job.rating.is_some() {
        return Err(ServiceError::AlreadyRated(ticket.id));
    }

    let mut job = job.clone();
    job.rating = Some(rating);

    let mut ticket = ticket.clone();
    ticket.rating = Some(rating);
    ticket.revision += 1;

    let contractor = snapshot.contractor(job.contractor_id).map(|c| {
        let ratings: Vec<f32> = snapshot
            .jobs
            .iter()
            .filter(|j| j.contractor_id == c.id && j.id != job.id)
            .filter_map(|j| j.rating)
            .chain(std::iter::once(rating))
            .collect();

        let mut c = c.clone();
        c.rating = ratings.iter().sum::<f32>() / ratings.len() as f32;
        c.revision += 1;
        c
    });

    let changes = ChangeSet {
        tickets: vec![ticket.clone()],
        jobs: vec![job.clone()],
        contractors: contractor.iter().cloned().collect(),
        ..Default::default()
    };
    Ok(Transition::new(
        snapshot,
        changes,
        RatingOutcome {
            ticket,
            job,
            contractor,
        },
    ))
}

pub fn add_message(
    snapshot: &Snapshot,
    ticket_id: Uuid,
    sender: &CurrentUser,
    text: &str,
    now: DateTime<Utc>,
) -> Result<Transition<Message>, ServiceError> {
    require(text, "Message text")?;
    let ticket = find_ticket(snapshot, ticket_id)?;

    let message = Message {
        id: Uuid::new_v4(),
        sender_email: normalize_email(&sender.email),
        sender_name: sender.display_name.clone(),
        text: text.trim().to_string(),
        sent_at: now,
    };

    let mut ticket = ticket.clone();
    ticket.messages.push(message.clone());
    ticket.revision += 1;

    let changes = ChangeSet {
        tickets: vec![ticket],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, message))
}

pub fn request_connection(
    snapshot: &Snapshot,
    landlord_email: &str,
    tenant_email: &str,
    now: DateTime<Utc>,
) -> Result<Transition<LandlordTenantConnection>, ServiceError> {
    require(landlord_email, "Landlord email")?;
    require(tenant_email, "Tenant email")?;

    let landlord_email = normalize_email(landlord_email);
    let tenant_email = normalize_email(tenant_email);
    if landlord_email == tenant_email {
        return Err(ServiceError::Validation(
            "A landlord cannot connect to themselves".to_string(),
        ));
    }

    let live = snapshot.connections.iter().any(|c| {
        c.landlord_email == landlord_email
            && c.tenant_email == tenant_email
            && c.status != ConnectionStatus::Rejected
    });
    if live {
        return Err(ServiceError::DuplicateConnection(landlord_email, tenant_email));
    }

    let connection = LandlordTenantConnection {
        id: Uuid::new_v4(),
        landlord_email,
        tenant_email,
        status: ConnectionStatus::Pending,
        created_at: now,
        revision: 1,
    };

    let changes = ChangeSet {
        connections: vec![connection.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, connection))
}

/// The addressed tenant accepts or declines a pending request.
pub fn respond_to_connection(
    snapshot: &Snapshot,
    connection_id: Uuid,
    tenant_email: &str,
    accept: bool,
) -> Result<Transition<LandlordTenantConnection>, ServiceError> {
    let connection = snapshot
        .connection(connection_id)
        .ok_or(ServiceError::ConnectionNotFound(connection_id))?;

    let tenant_email = normalize_email(tenant_email);
    if connection.tenant_email != tenant_email {
        return Err(ServiceError::UnauthorizedConnectionAccess(
            tenant_email,
            connection_id,
        ));
    }
    if connection.status != ConnectionStatus::Pending {
        return Err(ServiceError::ConnectionAlreadyAnswered(connection_id));
    }

    let mut connection = connection.clone();
    connection.status = if accept {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Rejected
    };
    connection.revision += 1;

    let changes = ChangeSet {
        connections: vec![connection.clone()],
        ..Default::default()
    };
    Ok(Transition::new(snapshot, changes, connection))
}
