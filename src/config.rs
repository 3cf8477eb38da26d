//! Process-wide configuration (spec §5 "process-wide state: none beyond
//! configured singletons").
//!
//! No config-file parser here: the teacher reads connection strings and
//! schema names straight from constructor args / environment variables
//! (see `PostgresRuntimeRepository::new`), so we follow the same idiom
//! rather than pull in a dedicated config crate.

use crate::timezone::DEFAULT_TIMEZONE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Postgres connection string for the optional `postgres-repositories`
    /// adapters. `None` when running fully in-memory (e.g. unit tests).
    pub database_url: Option<String>,
    /// Default IANA timezone assigned to newly-provisioned tenants.
    pub default_timezone: String,
    /// Grace-period length used by `calculate_grace_until` (spec §4.1).
    pub grace_days: i64,
    /// Hard cap on CSV import row count (spec §4.3 step 3, §8 boundary).
    pub import_row_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            grace_days: 14,
            import_row_limit: 10_000,
        }
    }
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `SHIFTCORE_DEFAULT_TIMEZONE`, and
    /// `SHIFTCORE_GRACE_DAYS` from the environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = Some(url);
            }
        }
        if let Ok(tz) = std::env::var("SHIFTCORE_DEFAULT_TIMEZONE") {
            if !tz.is_empty() {
                config.default_timezone = tz;
            }
        }
        if let Ok(days) = std::env::var("SHIFTCORE_GRACE_DAYS") {
            if let Ok(parsed) = days.parse::<i64>() {
                config.grace_days = parsed;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_constants() {
        let config = AppConfig::default();
        assert_eq!(config.default_timezone, "Asia/Tokyo");
        assert_eq!(config.grace_days, 14);
        assert_eq!(config.import_row_limit, 10_000);
        assert!(config.database_url.is_none());
    }
}
