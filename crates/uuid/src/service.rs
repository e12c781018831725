//! Identifier generation.

use crate::{IdError, IdResult};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use uuid::Uuid;

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct UuidService(Uuid);

impl UuidService {
    /// Generates a new random (version 4) UUID.
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UuidService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A time-prefixed unique identifier.
///
/// Format: `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TimestampUuid {
    timestamp: DateTime<Utc>,
    uuid: UuidService,
}

impl TimestampUuid {
    /// Generate a new timestamp UUID.
    ///
    /// If `last` is provided, the timestamp is strictly greater than `last`'s timestamp (by at
    /// least 1 ms).
    fn generate(last: Option<&TimestampUuid>) -> Self {
        let now = Utc::now();

        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: UuidService::new(),
        }
    }
}

impl fmt::Display for TimestampUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.uuid
        )
    }
}

/// The kind of entity an identifier is allocated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Trial,
    Patient,
    Criterion,
}

impl EntityKind {
    /// Prefix used at the start of generated identifiers.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Trial => "trial",
            EntityKind::Patient => "patient",
            EntityKind::Criterion => "criterion",
        }
    }
}

/// Opaque, non-empty identifier of a trial, patient or criterion.
///
/// Stored identifiers are accepted as-is (any non-empty string); only freshly generated ones
/// follow the `<kind>-<timestamp>-<uuid>` shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps an existing identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is empty or whitespace only.
    pub fn new(input: impl Into<String>) -> IdResult<Self> {
        let input = input.into();
        if input.trim().is_empty() {
            return Err(IdError::InvalidInput("identifier cannot be empty".into()));
        }
        Ok(Self(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the kind encoded in the prefix, if the identifier carries a known one.
    pub fn kind(&self) -> Option<EntityKind> {
        let (prefix, _) = self.0.split_once('-')?;
        [EntityKind::Trial, EntityKind::Patient, EntityKind::Criterion]
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntityId::new(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Allocates fresh [`EntityId`] values.
///
/// Timestamps are monotonic per generator, so a single generator should be shared by everything
/// that creates entities in one process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Option<TimestampUuid>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new identifier for an entity of `kind`.
    pub fn next_id(&mut self, kind: EntityKind) -> EntityId {
        let stamp = TimestampUuid::generate(self.last.as_ref());
        let id = EntityId(format!("{}-{}", kind.prefix(), stamp));
        self.last = Some(stamp);
        id
    }
}
