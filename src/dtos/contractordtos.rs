use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::service::lifecycle::ContractorDraft;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterContractorDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email"))]
    pub email: String,

    #[serde(default)]
    pub company: String,

    #[validate(length(min = 1, message = "At least one specialization is required"))]
    pub specialization: Vec<String>,

    #[serde(default)]
    pub service_areas: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub preferred: bool,
}

impl From<RegisterContractorDto> for ContractorDraft {
    fn from(dto: RegisterContractorDto) -> Self {
        ContractorDraft {
            name: dto.name,
            email: dto.email,
            company: dto.company,
            specialization: dto.specialization,
            service_areas: dto.service_areas,
            preferred: dto.preferred,
        }
    }
}
