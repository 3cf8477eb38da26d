//! Application layer: transaction boundary, repository ports, and the
//! use cases that orchestrate domain objects across them (spec §4, §5).

pub mod actual_attendance_import;
pub mod admin_tenant;
pub mod attendance_use_case;
pub mod license_claim;
pub mod members_import;
pub mod ports;
pub mod schedule_use_case;
