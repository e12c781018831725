//! Identifier utilities for the clinical trial matcher.
//!
//! Every trial, patient and criterion carries an opaque string identifier. Identifiers that
//! this crate *generates* have the form:
//!
//! `<kind>-<YYYYMMDDTHHMMSS.mmmZ>-<canonical_uuid>`
//!
//! Example:
//! `trial-20260111T143522.045Z-550e8400e29b41d4a716446655440000`
//!
//! - The kind prefix (`trial`, `patient`, `criterion`) keeps identifiers readable in stored
//!   JSON and in CLI output.
//! - The timestamp is strictly increasing within one [`IdGenerator`], so identifiers allocated
//!   in the same millisecond still sort in creation order.
//! - The UUID component (32 lowercase hex characters, no hyphens) makes two identifiers created
//!   in the same process collision-free regardless of clock behaviour.
//!
//! Identifiers *read back* from storage are not required to follow this shape. Older data used
//! schemes such as `trial-1712345678901`, so [`EntityId`] only guarantees a non-empty value.

mod service;

pub use service::{EntityId, EntityKind, IdGenerator};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
