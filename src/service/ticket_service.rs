// service/ticket_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    db::{
        db::{StorageBackend, StorageError, StorageMode},
        snapshot::Snapshot,
    },
    models::{
        connectionmodel::LandlordTenantConnection,
        contractormodel::Contractor,
        jobmodel::{Job, JobApplication},
        ticketmodel::{Message, Ticket},
        usermodel::{normalize_email, CurrentUser, UserRole},
    },
    service::{
        error::ServiceError,
        lifecycle::{self, Assignment, ContractorDraft, RatingOutcome, TicketDraft, Transition},
        matching_service::{find_eligible_contractors, ContractorMatch, MatchCriteria},
        projection::{account_contractor_id, connected_tenants, project_jobs, project_tickets},
    },
};

/// Owns the current snapshot and runs lifecycle commands against it.
///
/// Commands are serialized by `writer`. The snapshot is only replaced after
/// storage accepted the command's change set.
#[derive(Debug)]
pub struct TicketService {
    storage: Arc<dyn StorageBackend>,
    snapshot: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTicket {
    pub ticket: Ticket,
    pub job: Job,
    /// Other jobs of the same contractor on that day. Informational only.
    pub same_day_conflicts: Vec<Uuid>,
}

fn ensure(condition: bool, error: impl FnOnce() -> ServiceError) -> Result<(), ServiceError> {
    if condition {
        Ok(())
    } else {
        Err(error())
    }
}

fn ensure_role(user: &CurrentUser, role: UserRole, what: &str) -> Result<(), ServiceError> {
    ensure(user.role == role, || {
        ServiceError::RoleNotPermitted(format!("Only a {} can {}", role.to_str(), what))
    })
}

impl TicketService {
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Result<Self, ServiceError> {
        let snapshot = storage.load_snapshot().await?;
        tracing::info!(
            "Ticket service ready ({} storage): {} tickets, {} jobs, {} contractors",
            storage.mode(),
            snapshot.tickets.len(),
            snapshot.jobs.len(),
            snapshot.contractors.len()
        );

        Ok(Self {
            storage,
            snapshot: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage.mode()
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    async fn execute<T, F>(&self, command: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Snapshot) -> Result<Transition<T>, ServiceError>,
    {
        let _guard = self.writer.lock().await;
        let current = self.snapshot.read().await.clone();

        let transition = command(&current)?;
        if let Err(err) = self.storage.commit(&transition.changes).await {
            if matches!(err, StorageError::Conflict { .. }) {
                // Another writer got there first; pick up what it wrote.
                match self.storage.load_snapshot().await {
                    Ok(fresh) => *self.snapshot.write().await = Arc::new(fresh),
                    Err(reload_err) => {
                        tracing::error!("Failed to reload snapshot after conflict: {}", reload_err)
                    }
                }
            }
            return Err(err.into());
        }

        *self.snapshot.write().await = Arc::new(transition.snapshot);
        Ok(transition.output)
    }

    fn contractor_identity(user: &CurrentUser, snapshot: &Snapshot) -> Result<Uuid, ServiceError> {
        ensure_role(user, UserRole::Contractor, "do this")?;
        account_contractor_id(user, &snapshot.contractors)
            .ok_or_else(|| ServiceError::ContractorProfileNotFound(user.email.clone()))
    }

    fn can_see(user: &CurrentUser, snapshot: &Snapshot, ticket_id: Uuid) -> bool {
        project_tickets(user, snapshot)
            .iter()
            .any(|t| t.id == ticket_id)
    }

    pub async fn submit_ticket(
        &self,
        user: &CurrentUser,
        draft: TicketDraft,
    ) -> Result<Ticket, ServiceError> {
        ensure_role(user, UserRole::Tenant, "submit tickets")?;

        let ticket = self
            .execute(|s| lifecycle::submit_ticket(s, user, draft, Utc::now()))
            .await?;
        tracing::info!("Ticket {} submitted by {}", ticket.id, ticket.submitted_by);
        Ok(ticket)
    }

    /// Contractors register their own profile, under their account email.
    pub async fn register_contractor(
        &self,
        user: &CurrentUser,
        draft: ContractorDraft,
    ) -> Result<Contractor, ServiceError> {
        ensure_role(user, UserRole::Contractor, "register a contractor profile")?;
        ensure(normalize_email(&draft.email) == normalize_email(&user.email), || {
            ServiceError::Validation(
                "Contractor email must match the signed-in account".to_string(),
            )
        })?;

        let contractor = self
            .execute(|s| lifecycle::register_contractor(s, draft, Utc::now()))
            .await?;
        tracing::info!("Contractor {} ({}) registered", contractor.id, contractor.name);
        Ok(contractor)
    }

    pub async fn apply_to_ticket(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
    ) -> Result<JobApplication, ServiceError> {
        let application = self
            .execute(|s| {
                let contractor_id = Self::contractor_identity(user, s)?;
                lifecycle::apply_to_ticket(s, ticket_id, contractor_id, Utc::now())
            })
            .await?;
        tracing::info!(
            "Contractor {} applied to ticket {}",
            application.contractor_id,
            ticket_id
        );
        Ok(application)
    }

    /// Only a landlord connected to the submitting tenant may assign.
    pub async fn assign_contractor(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
        contractor_id: Uuid,
    ) -> Result<Assignment, ServiceError> {
        let result = self
            .execute(|s| {
                ensure_role(user, UserRole::Landlord, "assign contractors")?;
                let ticket = s
                    .ticket(ticket_id)
                    .ok_or(ServiceError::TicketNotFound(ticket_id))?;
                let tenants = connected_tenants(&user.email, &s.connections);
                ensure(tenants.contains(&ticket.submitted_by), || {
                    ServiceError::UnauthorizedTicketAccess(user.email.clone(), ticket_id)
                })?;

                lifecycle::assign_contractor(s, ticket_id, contractor_id, Utc::now())
            })
            .await;

        match &result {
            Ok(assignment) => tracing::info!(
                "Ticket {} assigned to contractor {} (job {})",
                ticket_id,
                contractor_id,
                assignment.job.id
            ),
            Err(err) => tracing::warn!("Assignment of ticket {} rejected: {}", ticket_id, err),
        }
        result
    }

    /// Books or moves the visit. Same-day bookings are reported, not refused.
    pub async fn schedule_ticket(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
        date: &str,
        time: &str,
    ) -> Result<ScheduledTicket, ServiceError> {
        let scheduled = self
            .execute(|s| {
                let contractor_id = Self::contractor_identity(user, s)?;
                let ticket = s
                    .ticket(ticket_id)
                    .ok_or(ServiceError::TicketNotFound(ticket_id))?;
                ensure(ticket.assigned_to == Some(contractor_id), || {
                    ServiceError::UnauthorizedTicketAccess(user.email.clone(), ticket_id)
                })?;

                let transition = lifecycle::schedule_ticket(s, ticket_id, date, time)?;
                let Assignment { ticket, job } = transition.output;
                let same_day_conflicts = job
                    .scheduled_date
                    .as_deref()
                    .map(|day| lifecycle::same_day_conflicts(s, contractor_id, day, ticket_id))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|j| j.id)
                    .collect();

                Ok(Transition {
                    snapshot: transition.snapshot,
                    changes: transition.changes,
                    output: ScheduledTicket {
                        ticket,
                        job,
                        same_day_conflicts,
                    },
                })
            })
            .await?;

        if !scheduled.same_day_conflicts.is_empty() {
            tracing::warn!(
                "Ticket {} booked on a day with {} other job(s) for the same contractor",
                ticket_id,
                scheduled.same_day_conflicts.len()
            );
        }
        tracing::info!(
            "Ticket {} scheduled for {}",
            ticket_id,
            scheduled.ticket.scheduled_date.as_deref().unwrap_or_default()
        );
        Ok(scheduled)
    }

    pub async fn complete_job(
        &self,
        user: &CurrentUser,
        job_id: Uuid,
        completion_notes: Option<String>,
        completion_photos: Option<Vec<String>>,
    ) -> Result<Assignment, ServiceError> {
        let completed = self
            .execute(|s| {
                let contractor_id = Self::contractor_identity(user, s)?;
                let job = s.job(job_id).ok_or(ServiceError::JobNotFound(job_id))?;
                ensure(job.contractor_id == contractor_id, || {
                    ServiceError::UnauthorizedTicketAccess(user.email.clone(), job.ticket_id)
                })?;

                lifecycle::complete_job(s, job_id, completion_notes, completion_photos, Utc::now())
            })
            .await?;
        tracing::info!("Job {} completed (ticket {})", job_id, completed.ticket.id);
        Ok(completed)
    }

    /// Only the tenant who submitted the ticket may rate it.
    pub async fn add_rating(
        &self,
        user: &CurrentUser,
        job_id: Uuid,
        rating: f32,
    ) -> Result<RatingOutcome, ServiceError> {
        let rated = self
            .execute(|s| {
                let job = s.job(job_id).ok_or(ServiceError::JobNotFound(job_id))?;
                let ticket = s
                    .ticket(job.ticket_id)
                    .ok_or(ServiceError::TicketNotFound(job.ticket_id))?;
                ensure(ticket.submitted_by == normalize_email(&user.email), || {
                    ServiceError::UnauthorizedTicketAccess(user.email.clone(), ticket.id)
                })?;

                lifecycle::add_rating(s, job_id, rating)
            })
            .await?;
        tracing::info!("Job {} rated {}", job_id, rating);
        Ok(rated)
    }

    pub async fn add_message(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
        text: &str,
    ) -> Result<Message, ServiceError> {
        self.execute(|s| {
            s.ticket(ticket_id)
                .ok_or(ServiceError::TicketNotFound(ticket_id))?;
            ensure(Self::can_see(user, s, ticket_id), || {
                ServiceError::UnauthorizedTicketAccess(user.email.clone(), ticket_id)
            })?;

            lifecycle::add_message(s, ticket_id, user, text, Utc::now())
        })
        .await
    }

    pub async fn request_connection(
        &self,
        user: &CurrentUser,
        tenant_email: &str,
    ) -> Result<LandlordTenantConnection, ServiceError> {
        let connection = self
            .execute(|s| {
                ensure_role(user, UserRole::Landlord, "request tenant connections")?;
                lifecycle::request_connection(s, &user.email, tenant_email, Utc::now())
            })
            .await?;
        tracing::info!(
            "Connection {} requested: {} -> {}",
            connection.id,
            connection.landlord_email,
            connection.tenant_email
        );
        Ok(connection)
    }

    pub async fn respond_to_connection(
        &self,
        user: &CurrentUser,
        connection_id: Uuid,
        accept: bool,
    ) -> Result<LandlordTenantConnection, ServiceError> {
        let connection = self
            .execute(|s| {
                ensure_role(user, UserRole::Tenant, "answer connection requests")?;
                lifecycle::respond_to_connection(s, connection_id, &user.email, accept)
            })
            .await?;
        tracing::info!(
            "Connection {} is now {:?}",
            connection.id,
            connection.status
        );
        Ok(connection)
    }

    pub async fn visible_tickets(&self, user: &CurrentUser) -> Vec<Ticket> {
        let snapshot = self.snapshot().await;
        project_tickets(user, &snapshot)
    }

    pub async fn visible_jobs(&self, user: &CurrentUser) -> Vec<Job> {
        let snapshot = self.snapshot().await;
        project_jobs(user, &snapshot)
    }

    pub async fn ticket(&self, user: &CurrentUser, ticket_id: Uuid) -> Result<Ticket, ServiceError> {
        let snapshot = self.snapshot().await;
        project_tickets(user, &snapshot)
            .into_iter()
            .find(|t| t.id == ticket_id)
            .ok_or(ServiceError::TicketNotFound(ticket_id))
    }

    /// Applications on a ticket; contractors only see their own.
    pub async fn applications(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
    ) -> Result<Vec<JobApplication>, ServiceError> {
        let snapshot = self.snapshot().await;
        ensure(Self::can_see(user, &snapshot, ticket_id), || {
            ServiceError::TicketNotFound(ticket_id)
        })?;

        let own = match user.role {
            UserRole::Contractor => account_contractor_id(user, &snapshot.contractors),
            _ => None,
        };
        Ok(snapshot
            .applications_for(ticket_id)
            .into_iter()
            .filter(|a| user.role != UserRole::Contractor || Some(a.contractor_id) == own)
            .cloned()
            .collect())
    }

    pub async fn eligible_contractors(
        &self,
        user: &CurrentUser,
        ticket_id: Uuid,
    ) -> Result<Vec<ContractorMatch>, ServiceError> {
        let snapshot = self.snapshot().await;
        let ticket = project_tickets(user, &snapshot)
            .into_iter()
            .find(|t| t.id == ticket_id)
            .ok_or(ServiceError::TicketNotFound(ticket_id))?;

        let matches = find_eligible_contractors(MatchCriteria::from(&ticket), &snapshot.contractors);
        tracing::debug!(
            "{} contractor(s) eligible for ticket {}",
            matches.len(),
            ticket_id
        );
        Ok(matches)
    }

    pub async fn contractors(&self) -> Vec<Contractor> {
        self.snapshot().await.contractors.clone()
    }

    pub async fn connections(&self, user: &CurrentUser) -> Vec<LandlordTenantConnection> {
        let email = normalize_email(&user.email);
        self.snapshot()
            .await
            .connections
            .iter()
            .filter(|c| c.landlord_email == email || c.tenant_email == email)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{localdb::LocalStore, snapshot::ChangeSet},
        models::{
            connectionmodel::ConnectionStatus,
            jobmodel::{ApplicationStatus, JobStatus},
            ticketmodel::TicketStatus,
        },
    };
    use async_trait::async_trait;
    use std::{
        collections::BTreeMap,
        sync::atomic::{AtomicBool, Ordering},
    };

    /// Local store whose commits can be switched to fail.
    #[derive(Debug)]
    struct FlakyStore {
        inner: LocalStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: LocalStore::in_memory(),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for FlakyStore {
        async fn load_snapshot(&self) -> Result<Snapshot, StorageError> {
            self.inner.load_snapshot().await
        }

        async fn commit(&self, changes: &ChangeSet) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "store offline",
                )));
            }
            self.inner.commit(changes).await
        }

        fn mode(&self) -> StorageMode {
            StorageMode::Local
        }
    }

    fn tenant() -> CurrentUser {
        CurrentUser::new("alice@example.com", "Alice", UserRole::Tenant)
    }

    fn landlord() -> CurrentUser {
        CurrentUser::new("bob@example.com", "Bob", UserRole::Landlord)
    }

    fn plumber(id: Uuid) -> CurrentUser {
        CurrentUser::new("pat@example.com", "Pat Pipes", UserRole::Contractor).with_contractor_id(id)
    }

    fn account(name: &str, email: &str) -> CurrentUser {
        CurrentUser::new(email, name, UserRole::Contractor)
    }

    fn plumber_draft(name: &str, email: &str, city: &str) -> ContractorDraft {
        ContractorDraft {
            name: name.to_string(),
            email: email.to_string(),
            company: "Pipes Inc".to_string(),
            specialization: vec!["Plumbing".to_string()],
            service_areas: BTreeMap::from([("CA".to_string(), vec![city.to_string()])]),
            preferred: false,
        }
    }

    fn leak() -> TicketDraft {
        TicketDraft {
            title: "Leaking sink".to_string(),
            description: "Water under the sink".to_string(),
            category: "plumbing".to_string(),
            property_address: "12 Lake St".to_string(),
            city: "Oakland".to_string(),
            state: "CA".to_string(),
            ..Default::default()
        }
    }

    async fn connect(service: &TicketService) {
        let request = service
            .request_connection(&landlord(), &tenant().email)
            .await
            .unwrap();
        service
            .respond_to_connection(&tenant(), request.id, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_ticket_flow() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        service
            .register_contractor(
                &account("Far Away", "far@example.com"),
                plumber_draft("Far Away", "far@example.com", "Berkeley"),
            )
            .await
            .unwrap();

        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();

        // Not visible to the landlord until the tenant accepts the connection.
        assert!(service.visible_tickets(&landlord()).await.is_empty());
        connect(&service).await;
        assert_eq!(service.visible_tickets(&landlord()).await.len(), 1);

        let eligible = service.eligible_contractors(&landlord(), ticket.id).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].contractor.id, pat.id);

        let application = service.apply_to_ticket(&plumber(pat.id), ticket.id).await.unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);

        let assignment = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap();
        assert_eq!(assignment.ticket.status, TicketStatus::Assigned);

        let apps = service.applications(&landlord(), ticket.id).await.unwrap();
        assert_eq!(apps[0].status, ApplicationStatus::Accepted);

        let scheduled = service
            .schedule_ticket(&plumber(pat.id), ticket.id, "2025-06-01", "1:15 pm")
            .await
            .unwrap();
        assert_eq!(scheduled.ticket.scheduled_date.as_deref(), Some("2025-06-01 13:15"));
        assert!(scheduled.same_day_conflicts.is_empty());

        let done = service
            .complete_job(&plumber(pat.id), assignment.job.id, Some("Fixed".to_string()), None)
            .await
            .unwrap();
        assert_eq!(done.job.status, JobStatus::Completed);
        assert_eq!(done.ticket.status, TicketStatus::Completed);

        let rated = service.add_rating(&tenant(), assignment.job.id, 4.5).await.unwrap();
        assert_eq!(rated.contractor.unwrap().rating, 4.5);

        let err = service.add_rating(&tenant(), assignment.job.id, 1.0).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRated(_)));

        let jobs = service.visible_jobs(&plumber(pat.id)).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_only_connected_landlord_can_assign() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();

        let err = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedTicketAccess(_, _)));

        let err = service
            .assign_contractor(&tenant(), ticket.id, pat.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));

        connect(&service).await;
        service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap();

        let err = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyAssigned(_)));
        assert_eq!(service.snapshot().await.jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_only_assigned_contractor_can_schedule_and_complete() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let flo = service
            .register_contractor(
                &account("Flo Drain", "flo@example.com"),
                plumber_draft("Flo Drain", "flo@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();
        connect(&service).await;
        let assignment = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap();

        let intruder = CurrentUser::new("flo@example.com", "Flo Drain", UserRole::Contractor)
            .with_contractor_id(flo.id);
        let err = service
            .schedule_ticket(&intruder, ticket.id, "2025-06-01", "10:00")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedTicketAccess(_, _)));

        let err = service
            .complete_job(&intruder, assignment.job.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedTicketAccess(_, _)));

        let err = service
            .add_rating(&landlord(), assignment.job.id, 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedTicketAccess(_, _)));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_snapshot_untouched() {
        let store = Arc::new(FlakyStore::new());
        let service = TicketService::load(store.clone()).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();
        connect(&service).await;
        let assignment = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap();
        service
            .schedule_ticket(&plumber(pat.id), ticket.id, "2025-06-01", "10:00")
            .await
            .unwrap();

        let before = service.snapshot().await;
        store.failing.store(true, Ordering::SeqCst);

        let err = service
            .complete_job(&plumber(pat.id), assignment.job.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::Io(_))));

        let after = service.snapshot().await;
        assert_eq!(*before, *after);
        assert_eq!(after.ticket(ticket.id).unwrap().status, TicketStatus::Scheduled);
        assert_eq!(after.job(assignment.job.id).unwrap().status, JobStatus::Scheduled);

        // Once storage is back the same call goes through.
        store.failing.store(false, Ordering::SeqCst);
        let done = service
            .complete_job(&plumber(pat.id), assignment.job.id, None, None)
            .await
            .unwrap();
        assert_eq!(done.ticket.status, TicketStatus::Completed);
    }

    #[tokio::test]
    async fn test_same_day_booking_is_reported_not_refused() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        connect(&service).await;

        let first = service.submit_ticket(&tenant(), leak()).await.unwrap();
        let second = service.submit_ticket(&tenant(), leak()).await.unwrap();
        for t in [&first, &second] {
            service.assign_contractor(&landlord(), t.id, pat.id).await.unwrap();
        }

        service
            .schedule_ticket(&plumber(pat.id), first.id, "2025-06-01", "09:00")
            .await
            .unwrap();
        let second_booking = service
            .schedule_ticket(&plumber(pat.id), second.id, "2025-06-01", "16:00")
            .await
            .unwrap();

        assert_eq!(second_booking.ticket.status, TicketStatus::Scheduled);
        assert_eq!(second_booking.same_day_conflicts.len(), 1);
    }

    #[tokio::test]
    async fn test_connections_listing_and_roles() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();

        let err = service
            .request_connection(&tenant(), "someone@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));

        let request = service
            .request_connection(&landlord(), "ALICE@example.com")
            .await
            .unwrap();
        assert_eq!(request.tenant_email, "alice@example.com");

        let err = service
            .respond_to_connection(&landlord(), request.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));

        let accepted = service
            .respond_to_connection(&tenant(), request.id, true)
            .await
            .unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Connected);

        assert_eq!(service.connections(&tenant()).await.len(), 1);
        assert_eq!(service.connections(&landlord()).await.len(), 1);
        let stranger = CurrentUser::new("zed@example.com", "Zed", UserRole::Tenant);
        assert!(service.connections(&stranger).await.is_empty());
    }

    #[tokio::test]
    async fn test_contractor_sees_open_pool_and_own_applications() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let flo = service
            .register_contractor(
                &account("Flo Drain", "flo@example.com"),
                plumber_draft("Flo Drain", "flo@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let flo_user = CurrentUser::new("flo@example.com", "Flo Drain", UserRole::Contractor)
            .with_contractor_id(flo.id);

        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();
        assert_eq!(service.visible_tickets(&plumber(pat.id)).await.len(), 1);
        assert_eq!(service.visible_tickets(&flo_user).await.len(), 1);

        service.apply_to_ticket(&plumber(pat.id), ticket.id).await.unwrap();
        service.apply_to_ticket(&flo_user, ticket.id).await.unwrap();

        let own = service.applications(&flo_user, ticket.id).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].contractor_id, flo.id);
        assert_eq!(service.applications(&tenant(), ticket.id).await.unwrap().len(), 2);

        let err = service.submit_ticket(&flo_user, leak()).await.unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));
    }

    #[tokio::test]
    async fn test_messages_need_visibility() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();

        let message = service
            .add_message(&tenant(), ticket.id, "Please come soon")
            .await
            .unwrap();
        assert_eq!(message.sender_name, "Alice");

        let err = service
            .add_message(&landlord(), ticket.id, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedTicketAccess(_, _)));

        let fetched = service.ticket(&tenant(), ticket.id).await.unwrap();
        assert_eq!(fetched.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_contractor_account_cannot_touch_jobs() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();
        let pat = service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let ticket = service.submit_ticket(&tenant(), leak()).await.unwrap();
        connect(&service).await;
        let assignment = service
            .assign_contractor(&landlord(), ticket.id, pat.id)
            .await
            .unwrap();

        let stranger = CurrentUser::new("zed@evil.com", "Zed", UserRole::Contractor);
        let err = service
            .schedule_ticket(&stranger, ticket.id, "2025-06-01", "10:00")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ContractorProfileNotFound(_)));

        let err = service
            .complete_job(&stranger, assignment.job.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ContractorProfileNotFound(_)));

        let other = service.submit_ticket(&tenant(), leak()).await.unwrap();
        let err = service.apply_to_ticket(&stranger, other.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ContractorProfileNotFound(_)));

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.ticket(ticket.id).unwrap().status, TicketStatus::Assigned);
        assert!(snapshot.applications.is_empty());

        // The owner is recognised by account email even without the claim.
        let scheduled = service
            .schedule_ticket(&account("Pat", "PAT@example.com"), ticket.id, "2025-06-01", "10:00")
            .await
            .unwrap();
        assert_eq!(scheduled.ticket.status, TicketStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_only_tenants_submit_tickets() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();

        let err = service.submit_ticket(&landlord(), leak()).await.unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));
        assert!(service.snapshot().await.tickets.is_empty());
    }

    #[tokio::test]
    async fn test_contractor_registration_rules() {
        let service = TicketService::load(Arc::new(LocalStore::in_memory())).await.unwrap();

        let err = service
            .register_contractor(
                &tenant(),
                plumber_draft("Pat Pipes", "alice@example.com", "Oakland"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoleNotPermitted(_)));

        let err = service
            .register_contractor(
                &account("Zed", "zed@evil.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        service
            .register_contractor(
                &account("Pat Pipes", "pat@example.com"),
                plumber_draft("Pat Pipes", "pat@example.com", "Oakland"),
            )
            .await
            .unwrap();
        let err = service
            .register_contractor(
                &account("Pat Pipes", "Pat@Example.com"),
                plumber_draft("Pat P", "Pat@Example.com", "Berkeley"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateContractor(_)));
        assert_eq!(service.contractors().await.len(), 1);
    }
}
