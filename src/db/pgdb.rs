// db/pgdb.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    db::{StorageBackend, StorageError, StorageMode},
    snapshot::{ChangeSet, Snapshot},
};
use crate::models::{
    connectionmodel::{ConnectionStatus, LandlordTenantConnection},
    contractormodel::Contractor,
    jobmodel::{ApplicationStatus, Job, JobApplication, JobStatus},
    ticketmodel::{Message, Ticket, TicketPriority, TicketStatus},
    usermodel::UserRole,
};

#[derive(Clone)]
pub struct PgStore {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool", &"Pool<Postgres>")
            .finish()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    priority: Option<TicketPriority>,
    status: TicketStatus,
    submitted_by: String,
    submitted_by_role: UserRole,
    assigned_to: Option<Uuid>,
    property_address: String,
    city: String,
    state: String,
    scheduled_date: Option<String>,
    completed_date: Option<String>,
    rating: Option<f32>,
    ai_diagnosis: Option<String>,
    photos: Json<Vec<String>>,
    messages: Json<Vec<Message>>,
    created_at: DateTime<Utc>,
    revision: i64,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            priority: row.priority,
            status: row.status,
            submitted_by: row.submitted_by,
            submitted_by_role: row.submitted_by_role,
            assigned_to: row.assigned_to,
            property_address: row.property_address,
            city: row.city,
            state: row.state,
            scheduled_date: row.scheduled_date,
            completed_date: row.completed_date,
            rating: row.rating,
            ai_diagnosis: row.ai_diagnosis,
            photos: row.photos.0,
            messages: row.messages.0,
            created_at: row.created_at,
            revision: row.revision,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    ticket_id: Uuid,
    contractor_id: Uuid,
    property_address: String,
    issue_type: String,
    status: JobStatus,
    scheduled_date: Option<String>,
    scheduled_time: Option<String>,
    completion_notes: Option<String>,
    completion_photos: Option<Json<Vec<String>>>,
    rating: Option<f32>,
    created_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            ticket_id: row.ticket_id,
            contractor_id: row.contractor_id,
            property_address: row.property_address,
            issue_type: row.issue_type,
            status: row.status,
            scheduled_date: row.scheduled_date,
            scheduled_time: row.scheduled_time,
            completion_notes: row.completion_notes,
            completion_photos: row.completion_photos.map(|photos| photos.0),
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContractorRow {
    id: Uuid,
    name: String,
    email: String,
    company: String,
    specialization: Json<Vec<String>>,
    service_areas: Json<BTreeMap<String, Vec<String>>>,
    rating: f32,
    completed_jobs: i32,
    preferred: bool,
    created_at: DateTime<Utc>,
    revision: i64,
}

impl From<ContractorRow> for Contractor {
    fn from(row: ContractorRow) -> Self {
        Contractor {
            id: row.id,
            name: row.name,
            email: row.email,
            company: row.company,
            specialization: row.specialization.0,
            service_areas: row.service_areas.0,
            rating: row.rating,
            completed_jobs: row.completed_jobs,
            preferred: row.preferred,
            created_at: row.created_at,
            revision: row.revision,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    ticket_id: Uuid,
    contractor_id: Uuid,
    contractor_name: String,
    contractor_email: String,
    applied_at: DateTime<Utc>,
    status: ApplicationStatus,
}

impl From<ApplicationRow> for JobApplication {
    fn from(row: ApplicationRow) -> Self {
        JobApplication {
            id: row.id,
            ticket_id: row.ticket_id,
            contractor_id: row.contractor_id,
            contractor_name: row.contractor_name,
            contractor_email: row.contractor_email,
            applied_at: row.applied_at,
            status: row.status,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    landlord_email: String,
    tenant_email: String,
    status: ConnectionStatus,
    created_at: DateTime<Utc>,
    revision: i64,
}

impl From<ConnectionRow> for LandlordTenantConnection {
    fn from(row: ConnectionRow) -> Self {
        LandlordTenantConnection {
            id: row.id,
            landlord_email: row.landlord_email,
            tenant_email: row.tenant_email,
            status: row.status,
            created_at: row.created_at,
            revision: row.revision,
        }
    }
}

/// Every mutable job column is rewritten on conflict, `contractor_id`
/// included, so a reused job follows its ticket's new contractor.
const UPSERT_JOB_SQL: &str = r#"
    INSERT INTO jobs
    (id, ticket_id, contractor_id, property_address, issue_type, status, scheduled_date,
    scheduled_time, completion_notes, completion_photos, rating, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (id) DO UPDATE SET
        contractor_id = EXCLUDED.contractor_id,
        status = EXCLUDED.status,
        scheduled_date = EXCLUDED.scheduled_date,
        scheduled_time = EXCLUDED.scheduled_time,
        completion_notes = EXCLUDED.completion_notes,
        completion_photos = EXCLUDED.completion_photos,
        rating = EXCLUDED.rating
    "#;

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStore { pool }
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn upsert_contractor(
        tx: &mut Transaction<'_, Postgres>,
        contractor: &Contractor,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO contractors
            (id, name, email, company, specialization, service_areas, rating, completed_jobs, preferred, created_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                company = EXCLUDED.company,
                specialization = EXCLUDED.specialization,
                service_areas = EXCLUDED.service_areas,
                rating = EXCLUDED.rating,
                completed_jobs = EXCLUDED.completed_jobs,
                preferred = EXCLUDED.preferred,
                revision = EXCLUDED.revision
            WHERE contractors.revision = EXCLUDED.revision - 1
            "#,
        )
        .bind(contractor.id)
        .bind(&contractor.name)
        .bind(&contractor.email)
        .bind(&contractor.company)
        .bind(Json(&contractor.specialization))
        .bind(Json(&contractor.service_areas))
        .bind(contractor.rating)
        .bind(contractor.completed_jobs)
        .bind(contractor.preferred)
        .bind(contractor.created_at)
        .bind(contractor.revision)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict {
                entity: "contractor",
                id: contractor.id,
            });
        }
        Ok(())
    }

    async fn upsert_ticket(
        tx: &mut Transaction<'_, Postgres>,
        ticket: &Ticket,
    ) -> Result<(), StorageError> {
        // The WHERE on the conflict branch is the compare-and-swap: zero rows
        // means someone else moved the ticket since we read it.
        let result = sqlx::query(
            r#"
            INSERT INTO tickets
            (id, title, description, category, priority, status, submitted_by, submitted_by_role,
            assigned_to, property_address, city, state, scheduled_date, completed_date, rating,
            ai_diagnosis, photos, messages, created_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                priority = EXCLUDED.priority,
                status = EXCLUDED.status,
                assigned_to = EXCLUDED.assigned_to,
                property_address = EXCLUDED.property_address,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                scheduled_date = EXCLUDED.scheduled_date,
                completed_date = EXCLUDED.completed_date,
                rating = EXCLUDED.rating,
                ai_diagnosis = EXCLUDED.ai_diagnosis,
                photos = EXCLUDED.photos,
                messages = EXCLUDED.messages,
                revision = EXCLUDED.revision
            WHERE tickets.revision = EXCLUDED.revision - 1
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .bind(ticket.priority)
        .bind(ticket.status)
        .bind(&ticket.submitted_by)
        .bind(ticket.submitted_by_role)
        .bind(ticket.assigned_to)
        .bind(&ticket.property_address)
        .bind(&ticket.city)
        .bind(&ticket.state)
        .bind(&ticket.scheduled_date)
        .bind(&ticket.completed_date)
        .bind(ticket.rating)
        .bind(&ticket.ai_diagnosis)
        .bind(Json(&ticket.photos))
        .bind(Json(&ticket.messages))
        .bind(ticket.created_at)
        .bind(ticket.revision)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict {
                entity: "ticket",
                id: ticket.id,
            });
        }
        Ok(())
    }

    async fn upsert_job(tx: &mut Transaction<'_, Postgres>, job: &Job) -> Result<(), StorageError> {
        sqlx::query(UPSERT_JOB_SQL)
        .bind(job.id)
        .bind(job.ticket_id)
        .bind(job.contractor_id)
        .bind(&job.property_address)
        .bind(&job.issue_type)
        .bind(job.status)
        .bind(&job.scheduled_date)
        .bind(&job.scheduled_time)
        .bind(&job.completion_notes)
        .bind(job.completion_photos.as_ref().map(Json))
        .bind(job.rating)
        .bind(job.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_application(
        tx: &mut Transaction<'_, Postgres>,
        application: &JobApplication,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO job_applications
            (id, ticket_id, contractor_id, contractor_name, contractor_email, applied_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(application.id)
        .bind(application.ticket_id)
        .bind(application.contractor_id)
        .bind(&application.contractor_name)
        .bind(&application.contractor_email)
        .bind(application.applied_at)
        .bind(application.status)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_connection(
        tx: &mut Transaction<'_, Postgres>,
        connection: &LandlordTenantConnection,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO landlord_tenant_connections
            (id, landlord_email, tenant_email, status, created_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                revision = EXCLUDED.revision
            WHERE landlord_tenant_connections.revision = EXCLUDED.revision - 1
            "#,
        )
        .bind(connection.id)
        .bind(&connection.landlord_email)
        .bind(&connection.tenant_email)
        .bind(connection.status)
        .bind(connection.created_at)
        .bind(connection.revision)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict {
                entity: "connection",
                id: connection.id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for PgStore {
    async fn load_snapshot(&self) -> Result<Snapshot, StorageError> {
        let contractors = sqlx::query_as::<_, ContractorRow>(
            r#"SELECT * FROM contractors ORDER BY created_at, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let tickets = sqlx::query_as::<_, TicketRow>(
            r#"SELECT * FROM tickets ORDER BY created_at, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let jobs = sqlx::query_as::<_, JobRow>(r#"SELECT * FROM jobs ORDER BY created_at, id"#)
            .fetch_all(&self.pool)
            .await?;

        let applications = sqlx::query_as::<_, ApplicationRow>(
            r#"SELECT * FROM job_applications ORDER BY applied_at, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let connections = sqlx::query_as::<_, ConnectionRow>(
            r#"SELECT * FROM landlord_tenant_connections ORDER BY created_at, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Snapshot {
            tickets: tickets.into_iter().map(Ticket::from).collect(),
            jobs: jobs.into_iter().map(Job::from).collect(),
            contractors: contractors.into_iter().map(Contractor::from).collect(),
            connections: connections
                .into_iter()
                .map(LandlordTenantConnection::from)
                .collect(),
            applications: applications.into_iter().map(JobApplication::from).collect(),
        })
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        // Parents before children so foreign keys hold mid-transaction.
        for contractor in &changes.contractors {
            Self::upsert_contractor(&mut tx, contractor).await?;
        }
        for ticket in &changes.tickets {
            Self::upsert_ticket(&mut tx, ticket).await?;
        }
        for job in &changes.jobs {
            Self::upsert_job(&mut tx, job).await?;
        }
        for application in &changes.applications {
            Self::upsert_application(&mut tx, application).await?;
        }
        for connection in &changes.connections {
            Self::upsert_connection(&mut tx, connection).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            "Postgres commit: {} tickets, {} jobs, {} contractors, {} connections, {} applications",
            changes.tickets.len(),
            changes.jobs.len(),
            changes.contractors.len(),
            changes.connections.len(),
            changes.applications.len()
        );
        Ok(())
    }

    fn mode(&self) -> StorageMode {
        StorageMode::Remote
    }
}
