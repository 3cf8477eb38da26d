pub mod in_memory;

#[cfg(feature = "postgres-repositories")]
pub mod postgres;
