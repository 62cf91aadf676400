// service/projection.rs
//
// Per-role views are derived from the snapshot on every call; nothing here
// keeps state between calls.
use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    db::snapshot::Snapshot,
    models::{
        connectionmodel::{ConnectionStatus, LandlordTenantConnection},
        contractormodel::Contractor,
        jobmodel::Job,
        ticketmodel::Ticket,
        usermodel::{normalize_email, CurrentUser, UserRole},
    },
};

fn email_prefix(email: &str) -> String {
    normalize_email(email)
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn squash(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn looks_like(user: &CurrentUser, contractor: &Contractor) -> bool {
    let display_name = user.display_name.trim().to_lowercase();
    let contractor_name = contractor.name.trim().to_lowercase();
    if !display_name.is_empty()
        && !contractor_name.is_empty()
        && (contractor_name.contains(&display_name) || display_name.contains(&contractor_name))
    {
        return true;
    }

    let prefix = email_prefix(&user.email);
    if prefix.is_empty() {
        return false;
    }
    let squashed_prefix = squash(&prefix);
    email_prefix(&contractor.email) == prefix
        || (!squashed_prefix.is_empty() && squash(&contractor.name).contains(&squashed_prefix))
}

/// Maps a signed-in contractor to a roster entry.
///
/// An explicit `contractor_id` that exists in the roster wins. Otherwise the
/// name / email-prefix heuristic runs, and failing that the first roster
/// entry is returned. The heuristic can pick the wrong contractor; accounts
/// should carry `contractor_id`.
pub fn resolve_contractor_id(user: &CurrentUser, roster: &[Contractor]) -> Option<Uuid> {
    if let Some(id) = user.contractor_id {
        if roster.iter().any(|c| c.id == id) {
            return Some(id);
        }
    }

    match roster.iter().find(|c| looks_like(user, c)) {
        Some(contractor) => Some(contractor.id),
        None => {
            let fallback = roster.first().map(|c| c.id);
            if fallback.is_some() {
                tracing::warn!(
                    "No roster entry resembles {}; falling back to the first contractor",
                    user.email
                );
            }
            fallback
        }
    }
}

/// Roster entry that belongs to the signed-in account.
///
/// Only the `contractor_id` claim or an exact email match count. Used for
/// anything that writes or reveals a contractor's own records; the looser
/// `resolve_contractor_id` is for the ticket listings alone.
pub fn account_contractor_id(user: &CurrentUser, roster: &[Contractor]) -> Option<Uuid> {
    if let Some(id) = user.contractor_id {
        return roster.iter().find(|c| c.id == id).map(|c| c.id);
    }

    let email = normalize_email(&user.email);
    roster.iter().find(|c| c.email == email).map(|c| c.id)
}

/// Tenants a landlord is connected to.
pub fn connected_tenants(
    landlord_email: &str,
    connections: &[LandlordTenantConnection],
) -> HashSet<String> {
    let landlord_email = normalize_email(landlord_email);
    connections
        .iter()
        .filter(|c| c.status == ConnectionStatus::Connected && c.landlord_email == landlord_email)
        .map(|c| c.tenant_email.clone())
        .collect()
}

/// Tickets visible to `user`.
///
/// `contractor_id` is the already resolved roster id for contractor users and
/// is ignored for the other roles.
pub fn visible_tickets(
    user: &CurrentUser,
    contractor_id: Option<Uuid>,
    tickets: &[Ticket],
    connections: &[LandlordTenantConnection],
) -> Vec<Ticket> {
    let email = normalize_email(&user.email);

    match user.role {
        UserRole::Tenant => tickets
            .iter()
            .filter(|t| t.submitted_by == email && t.submitted_by_role == UserRole::Tenant)
            .cloned()
            .collect(),
        UserRole::Landlord => {
            let tenants = connected_tenants(&email, connections);
            tickets
                .iter()
                .filter(|t| {
                    t.submitted_by_role == UserRole::Tenant && tenants.contains(&t.submitted_by)
                })
                .cloned()
                .collect()
        }
        UserRole::Contractor => tickets
            .iter()
            .filter(|t| {
                (contractor_id.is_some() && t.assigned_to == contractor_id) || t.is_open()
            })
            .cloned()
            .collect(),
    }
}

pub fn project_tickets(user: &CurrentUser, snapshot: &Snapshot) -> Vec<Ticket> {
    let contractor_id = match user.role {
        UserRole::Contractor => resolve_contractor_id(user, &snapshot.contractors),
        _ => None,
    };
    visible_tickets(user, contractor_id, &snapshot.tickets, &snapshot.connections)
}

/// Jobs visible to `user`: a contractor's own jobs, or the jobs behind the tickets they can see.
pub fn project_jobs(user: &CurrentUser, snapshot: &Snapshot) -> Vec<Job> {
    match user.role {
        UserRole::Contractor => {
            let Some(contractor_id) = account_contractor_id(user, &snapshot.contractors) else {
                return Vec::new();
            };
            snapshot
                .jobs
                .iter()
                .filter(|j| j.contractor_id == contractor_id)
                .cloned()
                .collect()
        }
        _ => {
            let visible: HashSet<Uuid> = project_tickets(user, snapshot)
                .into_iter()
                .map(|t| t.id)
                .collect();
            snapshot
                .jobs
                .iter()
                .filter(|j| visible.contains(&j.ticket_id))
                .cloned()
                .collect()
        }
    }
}
