//! Type-safe identifiers using the TypeID specification
//!
//! Request ids and document ids are both TypeIDs backed by UUIDv7, so they
//! carry a readable prefix and sort by creation time.
//!
//! ```rust
//! use tour_service::ids::{DocumentId, RequestId};
//!
//! let request_id = RequestId::new();
//! assert!(request_id.as_str().starts_with("req_"));
//!
//! let tour_id = DocumentId::new("tour");
//! assert_eq!(tour_id.prefix(), "tour");
//! ```

use mti::prelude::*;
use std::fmt;
use std::str::FromStr;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};
use http::Request;

/// A type-safe request identifier for distributed tracing.
///
/// Format: `req_<base32-encoded-uuidv7>`, e.g. `req_01h455vb4pex5vsknk084sn02q`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// The prefix used for request IDs
    pub const PREFIX: &'static str = "req";

    /// Creates a new request ID with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mti = parse_with_prefix(s, Self::PREFIX)?;
        Ok(Self(mti))
    }
}

/// Identifier of a stored document.
///
/// The prefix names the resource (`tour`, `review`, `user`, `booking`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(MagicTypeId);

impl DocumentId {
    /// Generate a fresh time-sortable id for the given resource prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>())
    }

    /// Parse an id, requiring the given resource prefix.
    pub fn parse(value: &str, prefix: &str) -> Result<Self, IdError> {
        parse_with_prefix(value, prefix).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0.to_string()
    }
}

fn parse_with_prefix(value: &str, prefix: &str) -> Result<MagicTypeId, IdError> {
    let mti = MagicTypeId::from_str(value).map_err(IdError::Parse)?;
    if mti.prefix().as_str() != prefix {
        return Err(IdError::InvalidPrefix {
            expected: prefix.to_string(),
            actual: mti.prefix().as_str().to_string(),
        });
    }
    Ok(mti)
}

/// Error type for id parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The ID could not be parsed as a valid TypeID.
    #[error("failed to parse id: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

/// A `MakeRequestId` implementation that generates `RequestId`s for tower-http.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
