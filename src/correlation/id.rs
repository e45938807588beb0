//! Correlation identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while parsing a correlation identifier.
#[derive(Debug, Error)]
pub enum CorrelationIdError {
    /// The value was empty or whitespace only.
    #[error("correlation id is empty")]
    Empty,

    /// The raw header bytes were not visible ASCII.
    #[error("correlation id is not valid ASCII")]
    Encoding,

    /// The value is not a UUID in any accepted form.
    #[error("invalid correlation id {value:?}: {source}")]
    Invalid {
        value: String,
        #[source]
        source: uuid::Error,
    },
}

/// 128-bit key joining an asynchronous result to the request that started it.
///
/// Parses both the 32-digit simple form (`"9f1c..."`) and the hyphenated
/// form. Always displays hyphenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a raw header value.
    pub fn from_header_bytes(bytes: &[u8]) -> Result<Self, CorrelationIdError> {
        let value = std::str::from_utf8(bytes).map_err(|_| CorrelationIdError::Encoding)?;
        value.parse()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CorrelationId> for Uuid {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl FromStr for CorrelationId {
    type Err = CorrelationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CorrelationIdError::Empty);
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|source| CorrelationIdError::Invalid {
                value: trimmed.to_string(),
                source,
            })
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_and_hyphenated() {
        let id = CorrelationId::new();
        let simple = id.as_uuid().simple().to_string();
        let hyphenated = id.to_string();

        assert_eq!(simple.len(), 32);
        assert_eq!(simple.parse::<CorrelationId>().unwrap(), id);
        assert_eq!(hyphenated.parse::<CorrelationId>().unwrap(), id);
        assert_eq!(format!("  {}\t", hyphenated).parse::<CorrelationId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("".parse::<CorrelationId>(), Err(CorrelationIdError::Empty)));
        assert!(matches!("   ".parse::<CorrelationId>(), Err(CorrelationIdError::Empty)));

        let err = "not-a-uuid".parse::<CorrelationId>().unwrap_err();
        assert!(matches!(err, CorrelationIdError::Invalid { .. }));
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_header_bytes() {
        let id = CorrelationId::new();
        assert_eq!(CorrelationId::from_header_bytes(id.to_string().as_bytes()).unwrap(), id);
        assert!(matches!(
            CorrelationId::from_header_bytes(&[0xff, 0xfe]),
            Err(CorrelationIdError::Encoding)
        ));
    }

    #[test]
    fn test_serde_is_a_plain_string() {
        let id = CorrelationId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let simple = format!("\"{}\"", id.as_uuid().simple());
        let decoded: CorrelationId = serde_json::from_str(&simple).unwrap();
        assert_eq!(decoded, id);
    }
}
