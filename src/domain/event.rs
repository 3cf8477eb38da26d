//! Event + EventBusinessDay entities (spec §3, C4).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{BusinessDayId, EventId, TenantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, now: DateTime<Utc>) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("イベント名を入力してください"));
        }
        Ok(Event {
            id: EventId::generate(),
            tenant_id,
            name,
            created_at: now,
            updated_at: now,
        })
    }
}

impl HasTimestamps for Event {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A concrete date instance of an event (glossary: "Business day").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventBusinessDay {
    pub id: BusinessDayId,
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventBusinessDay {
    pub fn new(tenant_id: TenantId, event_id: EventId, date: NaiveDate, now: DateTime<Utc>) -> Self {
        EventBusinessDay {
            id: BusinessDayId::generate(),
            event_id,
            tenant_id,
            date,
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasTimestamps for EventBusinessDay {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
