use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequestConnectionDto {
    #[validate(email(message = "Invalid tenant email"))]
    pub tenant_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RespondConnectionDto {
    pub accept: bool,
}
