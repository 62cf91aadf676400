use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "connection_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandlordTenantConnection {
    pub id: Uuid,
    pub landlord_email: String,
    pub tenant_email: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub revision: i64,
}
