//! # API Shared
//!
//! Shared definitions for the CTM APIs.
//!
//! Contains:
//! - Wire types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `ctm-run` binary.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
