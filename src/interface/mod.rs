//! Interface-layer seam (SPEC_FULL §6): wire DTOs translating JSON payloads
//! into application-layer input types. No HTTP routing of its own.

pub mod dto;
