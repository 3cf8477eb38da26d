//! Identifiers (spec §3, §6.2): 26-character, lexicographically-sortable,
//! Crockford base32 IDs ("SID"), typed per entity, plus `PublicToken`.

use rand::RngCore;
use std::fmt;
use std::marker::PhantomData;

const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const SID_LEN: usize = 26;

fn crockford_decode_char(c: u8) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    CROCKFORD_ALPHABET.iter().position(|&b| b == upper).map(|p| p as u8)
}

/// Encodes a 48-bit millisecond timestamp and 80 bits of randomness as a
/// 26-character Crockford base32 string, sortable by creation order (ULID
/// layout, without pulling in an external `ulid` crate).
fn encode_sid(timestamp_ms: u64, random: &[u8; 10]) -> String {
    let mut bytes = [0u8; 16];
    bytes[0..6].copy_from_slice(&timestamp_ms.to_be_bytes()[2..8]);
    bytes[6..16].copy_from_slice(random);

    let mut out = Vec::with_capacity(SID_LEN);
    // 128 bits packed 5 bits at a time into 26 base32 characters (the last
    // character only carries 2 significant bits).
    let mut acc: u128 = 0;
    for b in bytes {
        acc = (acc << 8) | b as u128;
    }
    acc <<= 130 - 128; // left-align into a 130-bit window (26 * 5)
    for i in 0..SID_LEN {
        let shift = 130 - 5 * (i + 1);
        let idx = ((acc >> shift) & 0b11111) as usize;
        out.push(CROCKFORD_ALPHABET[idx]);
    }
    String::from_utf8(out).expect("crockford alphabet is ASCII")
}

fn is_valid_sid_format(s: &str) -> bool {
    s.len() == SID_LEN && s.bytes().all(|b| crockford_decode_char(b).is_some())
}

/// A raw, untyped sortable identifier. Most call sites use the typed
/// `Id<Marker>` wrapper instead.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Sid(String);

impl Sid {
    /// Generates a new SID from the given millisecond timestamp, using the
    /// thread-local RNG for the random component.
    pub fn generate_at(timestamp_ms: u64) -> Self {
        let mut random = [0u8; 10];
        rand::thread_rng().fill_bytes(&mut random);
        Sid(encode_sid(timestamp_ms, &random))
    }

    pub fn generate() -> Self {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self::generate_at(now_ms)
    }

    /// Validates non-empty + Crockford base32 alphabet + fixed length.
    pub fn parse(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("id must not be empty".to_string());
        }
        if !is_valid_sid_format(&s) {
            return Err(format!("id '{s}' is not a valid 26-character Crockford base32 id"));
        }
        Ok(Sid(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A SID typed to a specific entity, so `TenantId` and `AdminId` are not
/// interchangeable at compile time even though both wrap the same layout.
pub struct Id<Marker> {
    sid: Sid,
    _marker: PhantomData<Marker>,
}

impl<Marker> Id<Marker> {
    pub fn generate() -> Self {
        Id {
            sid: Sid::generate(),
            _marker: PhantomData,
        }
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, String> {
        Ok(Id {
            sid: Sid::parse(s)?,
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        self.sid.as_str()
    }

    pub fn into_sid(self) -> Sid {
        self.sid
    }
}

impl<Marker> Clone for Id<Marker> {
    fn clone(&self) -> Self {
        Id {
            sid: self.sid.clone(),
            _marker: PhantomData,
        }
    }
}
impl<Marker> fmt::Debug for Id<Marker> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sid)
    }
}
impl<Marker> fmt::Display for Id<Marker> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sid)
    }
}
impl<Marker> PartialEq for Id<Marker> {
    fn eq(&self, other: &Self) -> bool {
        self.sid == other.sid
    }
}
impl<Marker> Eq for Id<Marker> {}
impl<Marker> std::hash::Hash for Id<Marker> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sid.hash(state)
    }
}
impl<Marker> Ord for Id<Marker> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sid.cmp(&other.sid)
    }
}
impl<Marker> PartialOrd for Id<Marker> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<Marker> serde::Serialize for Id<Marker> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sid.serialize(serializer)
    }
}
impl<'de, Marker> serde::Deserialize<'de> for Id<Marker> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let sid = Sid::deserialize(deserializer)?;
        Ok(Id {
            sid,
            _marker: PhantomData,
        })
    }
}

/// Declares a typed ID alias backed by `Id<Marker>`.
macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub(crate) crate::id::Id<$name>);

        impl $name {
            pub fn generate() -> Self {
                $name(crate::id::Id::generate())
            }
            pub fn parse(s: impl Into<String>) -> Result<Self, String> {
                Ok($name(crate::id::Id::parse(s)?))
            }
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(TenantId);
typed_id!(AdminId);
typed_id!(LicenseKeyId);
typed_id!(EntitlementId);
typed_id!(SubscriptionId);
typed_id!(BillingAuditLogId);
typed_id!(MemberId);
typed_id!(EventId);
typed_id!(BusinessDayId);
typed_id!(PositionId);
typed_id!(ShiftSlotId);
typed_id!(ShiftAssignmentId);
typed_id!(AttendanceCollectionId);
typed_id!(TargetDateId);
typed_id!(AttendanceResponseId);
typed_id!(DateScheduleId);
typed_id!(CandidateDateId);
typed_id!(ScheduleResponseId);
typed_id!(ImportJobId);

/// URL-safe token granting unauthenticated access to one collection or
/// schedule (spec §3, §6.1). Distinct type from `Sid`: different length,
/// different alphabet rules (not required to be sortable).
#[derive(Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PublicToken(String);

const PUBLIC_TOKEN_BYTES: usize = 24;

impl PublicToken {
    pub fn generate() -> Self {
        let mut raw = [0u8; PUBLIC_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        PublicToken(urlencoding::encode_binary(&raw).into_owned())
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("public token must not be empty".to_string());
        }
        Ok(PublicToken(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PublicToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicToken({}...)", &self.0.chars().take(6).collect::<String>())
    }
}
impl fmt::Display for PublicToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sid_round_trips_through_display_and_parse() {
        let id = TenantId::generate();
        let reparsed = TenantId::parse(id.as_str().to_string()).unwrap();
        assert_eq!(id, reparsed);
    }

    #[test]
    fn sid_rejects_bad_length_and_alphabet() {
        assert!(Sid::parse("").is_err());
        assert!(Sid::parse("TOOSHORT").is_err());
        assert!(Sid::parse("IILLOOUU00000000000000000000").is_err()); // I,L,O,U excluded
    }

    #[test]
    fn sids_generated_in_order_sort_lexicographically() {
        let a = Sid::generate_at(1_000);
        let b = Sid::generate_at(2_000);
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn public_token_is_url_safe_and_non_empty() {
        let token = PublicToken::generate();
        assert!(!token.as_str().is_empty());
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '%'));
    }
}
