use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contractor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub specialization: Vec<String>,
    /// State name -> cities served in that state.
    pub service_areas: BTreeMap<String, Vec<String>>,
    pub rating: f32,
    pub completed_jobs: i32,
    pub preferred: bool,
    pub created_at: DateTime<Utc>,
    /// Bumped on every write; rating and job count are read-modify-write.
    pub revision: i64,
}
