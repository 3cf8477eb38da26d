//! Domain and application core for a multi-tenant shift-scheduling
//! backend: tenant lifecycle, license claim, CSV bulk import of
//! attendance and member rosters, and public-token addressed
//! attendance/date-coordination polls.
//!
//! This crate holds the domain model and application use cases; it has
//! no HTTP/RPC surface of its own. Concrete persistence lives behind the
//! `application::ports` traits — an in-memory adapter (`infra::in_memory`)
//! is always available, and a Postgres adapter (`infra::postgres`) is
//! gated behind the `postgres-repositories` feature.

pub mod application;
pub mod clock;
pub mod config;
pub mod csv;
pub mod domain;
pub mod error;
pub mod id;
pub mod infra;
pub mod interface;
pub mod timezone;
