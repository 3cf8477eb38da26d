//! Domain layer: entities, value objects, and the invariants they enforce
//! (spec §3, §4). No module here talks to a repository or a transaction —
//! that is the application layer's job.

pub mod admin;
pub mod attendance_collection;
pub mod date_schedule;
pub mod event;
pub mod import_job;
pub mod license;
pub mod member;
pub mod position;
pub mod shift;
pub mod tenant;

use chrono::{DateTime, Utc};

/// Convention shared by every entity that carries a lifecycle (spec §3).
pub trait HasTimestamps {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Convention for entities that support soft delete: non-null `deleted_at`
/// means logically absent (spec §3).
pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
