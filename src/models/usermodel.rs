use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Tenant,
    Landlord,
    Contractor,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Tenant => "tenant",
            UserRole::Landlord => "landlord",
            UserRole::Contractor => "contractor",
        }
    }
}

/// The signed-in user as handed over by the auth provider.
///
/// `contractor_id` is only present for contractor accounts that were linked to
/// a roster entry when the account was created.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CurrentUser {
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub contractor_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn new(email: &str, display_name: &str, role: UserRole) -> Self {
        Self {
            email: email.to_string(),
            display_name: display_name.to_string(),
            role,
            contractor_id: None,
        }
    }

    pub fn with_contractor_id(mut self, contractor_id: Uuid) -> Self {
        self.contractor_id = Some(contractor_id);
        self
    }
}

/// Emails are compared trimmed and lowercased everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
