//! Identifier and view types shared by every resource.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a stored record.
///
/// Identifiers are 24 lowercase hex characters: a 4-byte big-endian seconds
/// timestamp followed by 8 random bytes. Anything else never names a record.
///
/// ```rust
/// use game_store::domain::RecordId;
///
/// let id: RecordId = "000000000000000000000000".parse().unwrap();
/// assert_eq!(id.as_str(), "000000000000000000000000");
/// assert!("not-an-id".parse::<RecordId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub const LEN: usize = 24;

    #[must_use]
    pub fn generate() -> Self {
        let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        let random: u64 = rand::random();
        Self(format!("{seconds:08x}{random:016x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a value read back from the database without re-validating it.
    #[must_use]
    pub(crate) const fn from_stored(raw: String) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id: {0:?}")]
pub struct InvalidRecordId(pub String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == Self::LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidRecordId(s.to_string()))
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Picks out the well-formed ids from submitted values, dropping blanks and
/// duplicates while keeping submission order.
#[must_use]
pub fn parse_ids<S: AsRef<str>>(raw: &[S]) -> Vec<RecordId> {
    let mut ids: Vec<RecordId> = Vec::with_capacity(raw.len());
    for value in raw {
        if let Ok(id) = value.as_ref().trim().parse::<RecordId>()
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}
