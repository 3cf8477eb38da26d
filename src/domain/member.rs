//! Member entity (spec §3, §4.4.3, §6.2 Members CSV).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{MemberId, TenantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub tenant_id: TenantId,
    pub name: String,
    pub display_name: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Member {
    /// `display_name` defaults to `name` when blank (spec §6.2).
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("メンバー名を入力してください"));
        }
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            name.clone()
        } else {
            display_name
        };
        Ok(Member {
            id: MemberId::generate(),
            tenant_id,
            name,
            display_name,
            note,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }
}

impl HasTimestamps for Member {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl crate::domain::SoftDeletable for Member {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
