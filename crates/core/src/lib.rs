//! # CTM Core
//!
//! Core matching logic for the clinical trial matcher.
//!
//! This crate contains the data model and pure operations:
//! - Per-category criteria checklists ([`criteria`])
//! - Patient-versus-trial eligibility ([`eligibility`]) and the cross-patient [`report`]
//! - The immutable state container and its CRUD transitions ([`state`])
//! - Whole-collection key-value persistence ([`store`])
//! - [`TrialMatcherService`], which ties state and store together with write-through
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and `cli`.

pub mod config;
pub mod constants;
pub mod criteria;
pub mod eligibility;
pub mod error;
pub mod model;
pub mod report;
pub mod service;
pub mod state;
pub mod store;
pub mod text;
pub mod validation;

pub use config::{data_dir_from_env_value, CoreConfig};
pub use constants::DEFAULT_DATA_DIR;
pub use error::{CoreError, CoreResult};
pub use model::{
    ClinicalTrial, Criterion, CriterionKind, CriterionTag, Patient, PatientReport,
    TrialEligibility,
};
pub use service::TrialMatcherService;
pub use state::MatcherState;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use text::{NonEmptyText, TextError};
pub use validation::{PatientDraft, TrialDraft};

pub use ctm_uuid::{EntityId, EntityKind};
