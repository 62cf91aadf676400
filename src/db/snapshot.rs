// db/snapshot.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    connectionmodel::LandlordTenantConnection,
    contractormodel::Contractor,
    jobmodel::{Job, JobApplication},
    ticketmodel::Ticket,
};

use super::db::StorageError;

/// Immutable view of every record the core works on.
///
/// Collections keep insertion order; projections and the matching filter rely
/// on it for deterministic tie-breaking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub tickets: Vec<Ticket>,
    pub jobs: Vec<Job>,
    pub contractors: Vec<Contractor>,
    pub connections: Vec<LandlordTenantConnection>,
    pub applications: Vec<JobApplication>,
}

/// Records touched by one command. Committed to storage as a single unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub tickets: Vec<Ticket>,
    pub jobs: Vec<Job>,
    pub contractors: Vec<Contractor>,
    pub connections: Vec<LandlordTenantConnection>,
    pub applications: Vec<JobApplication>,
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, id_of: impl Fn(&T) -> Uuid) {
    let id = id_of(item);
    match items.iter_mut().find(|existing| id_of(existing) == id) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

impl Snapshot {
    pub fn ticket(&self, ticket_id: Uuid) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == ticket_id)
    }

    pub fn job(&self, job_id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn job_for_ticket(&self, ticket_id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.ticket_id == ticket_id)
    }

    pub fn contractor(&self, contractor_id: Uuid) -> Option<&Contractor> {
        self.contractors.iter().find(|c| c.id == contractor_id)
    }

    pub fn connection(&self, connection_id: Uuid) -> Option<&LandlordTenantConnection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    pub fn applications_for(&self, ticket_id: Uuid) -> Vec<&JobApplication> {
        self.applications
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .collect()
    }

    /// Upserts every record of `changes`, keeping the position of records that already exist.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for ticket in &changes.tickets {
            upsert(&mut self.tickets, ticket, |t| t.id);
        }
        for job in &changes.jobs {
            upsert(&mut self.jobs, job, |j| j.id);
        }
        for contractor in &changes.contractors {
            upsert(&mut self.contractors, contractor, |c| c.id);
        }
        for connection in &changes.connections {
            upsert(&mut self.connections, connection, |c| c.id);
        }
        for application in &changes.applications {
            upsert(&mut self.applications, application, |a| a.id);
        }
    }

    /// Compare-and-swap check for revisioned records.
    ///
    /// A write carrying revision `n` is only accepted when the stored record is
    /// at `n - 1`; a missing record counts as revision 0.
    pub fn check_revisions(&self, changes: &ChangeSet) -> Result<(), StorageError> {
        for ticket in &changes.tickets {
            let stored = self.ticket(ticket.id).map(|t| t.revision).unwrap_or(0);
            if stored != ticket.revision - 1 {
                return Err(StorageError::Conflict {
                    entity: "ticket",
                    id: ticket.id,
                });
            }
        }
        for contractor in &changes.contractors {
            let stored = self
                .contractor(contractor.id)
                .map(|c| c.revision)
                .unwrap_or(0);
            if stored != contractor.revision - 1 {
                return Err(StorageError::Conflict {
                    entity: "contractor",
                    id: contractor.id,
                });
            }
        }
        for connection in &changes.connections {
            let stored = self
                .connection(connection.id)
                .map(|c| c.revision)
                .unwrap_or(0);
            if stored != connection.revision - 1 {
                return Err(StorageError::Conflict {
                    entity: "connection",
                    id: connection.id,
                });
            }
        }
        Ok(())
    }
}
