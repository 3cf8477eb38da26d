//! Position entity (spec §3, C4): a role a shift slot is staffed with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{PositionId, TenantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub tenant_id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, now: DateTime<Utc>) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("役職名を入力してください"));
        }
        Ok(Position {
            id: PositionId::generate(),
            tenant_id,
            name,
            created_at: now,
            updated_at: now,
        })
    }
}

impl HasTimestamps for Position {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
