//! IANA timezone loader (spec §3 "timezone (IANA, validated with a loader)",
//! §5 "timezone loader value (default `Asia/Tokyo`, offset +9h)",
//! §8 "Timezone loader: unknown IANA id rejected at tenant validation").

use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Validates and resolves an IANA timezone identifier.
///
/// This is the single process-wide "timezone loader" referenced by spec §5;
/// it is stateless and immutable, so a bare function suffices instead of a
/// singleton struct.
pub fn load(id: &str) -> Result<Tz, String> {
    id.parse::<Tz>()
        .map_err(|_| format!("unknown IANA timezone id: {id}"))
}

pub fn default_tz() -> Tz {
    load(DEFAULT_TIMEZONE).expect("DEFAULT_TIMEZONE must be a valid IANA id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_iana_ids() {
        assert!(load("Asia/Tokyo").is_ok());
        assert!(load("UTC").is_ok());
        assert!(load("America/New_York").is_ok());
    }

    #[test]
    fn rejects_unknown_ids() {
        assert!(load("Not/A_Zone").is_err());
        assert!(load("").is_err());
    }

    #[test]
    fn default_is_asia_tokyo_plus_nine_hours() {
        use chrono::offset::TimeZone;
        let tz = default_tz();
        let sample = tz.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(sample.offset().fix().local_minus_utc(), 9 * 3600);
    }
}
