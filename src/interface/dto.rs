//! Wire-facing DTOs (SPEC_FULL §6 "Interface DTO → input validation → use
//! case"): plain serde structs translating JSON payloads into the
//! application layer's input types. No behavior, no HTTP routing — this
//! crate has no transport of its own, but the conversion boundary is a
//! real, testable seam rather than an implicit one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::application::attendance_use_case::CreateCollectionInput;
use crate::application::license_claim::{LicenseClaimInput, LicenseClaimOutput};
use crate::application::schedule_use_case::CreateScheduleInput;
use crate::domain::attendance_collection::TargetType;
use crate::error::AppError;
use crate::id::TenantId;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LicenseClaimRequestDto {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub tenant_name: String,
    pub license_key: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<LicenseClaimRequestDto> for LicenseClaimInput {
    fn from(dto: LicenseClaimRequestDto) -> Self {
        LicenseClaimInput {
            email: dto.email,
            password: dto.password,
            display_name: dto.display_name,
            tenant_name: dto.tenant_name,
            license_key: dto.license_key,
            ip: dto.ip,
            user_agent: dto.user_agent,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LicenseClaimResponseDto {
    pub tenant_id: String,
    pub admin_id: String,
    pub tenant_name: String,
    pub email: String,
}

impl From<LicenseClaimOutput> for LicenseClaimResponseDto {
    fn from(out: LicenseClaimOutput) -> Self {
        LicenseClaimResponseDto {
            tenant_id: out.tenant_id.as_str().to_string(),
            admin_id: out.admin_id.as_str().to_string(),
            tenant_name: out.tenant_name,
            email: out.email,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateCollectionRequestDto {
    pub tenant_id: String,
    pub title: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

impl TryFrom<CreateCollectionRequestDto> for CreateCollectionInput {
    type Error = AppError;

    fn try_from(dto: CreateCollectionRequestDto) -> Result<Self, Self::Error> {
        Ok(CreateCollectionInput {
            tenant_id: TenantId::parse(dto.tenant_id).map_err(AppError::validation)?,
            title: dto.title,
            target_type: dto.target_type,
            target_id: dto.target_id,
            deadline: dto.deadline,
            dates: dto.dates,
            group_ids: dto.group_ids,
            role_ids: dto.role_ids,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateScheduleRequestDto {
    pub tenant_id: String,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub candidate_dates: Vec<NaiveDate>,
}

impl TryFrom<CreateScheduleRequestDto> for CreateScheduleInput {
    type Error = AppError;

    fn try_from(dto: CreateScheduleRequestDto) -> Result<Self, Self::Error> {
        Ok(CreateScheduleInput {
            tenant_id: TenantId::parse(dto.tenant_id).map_err(AppError::validation)?,
            title: dto.title,
            deadline: dto.deadline,
            candidate_dates: dto.candidate_dates,
        })
    }
}
