//! Constants used throughout the core crate.
//!
//! Storage keys mirror the persisted layout: one key per whole collection.

/// Default directory for persisted matcher data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "trial_data";

/// Storage key holding the JSON array of clinical trials.
pub const TRIALS_KEY: &str = "trials";

/// Storage key holding the JSON array of patients.
pub const PATIENTS_KEY: &str = "patients";

/// Storage key holding the patient under active eligibility review (or `null`).
pub const SELECTED_PATIENT_KEY: &str = "selected-patient";

/// File extension used by the JSON file store.
pub const STORE_FILE_EXTENSION: &str = "json";

/// Maximum length of a storage key.
pub const MAX_STORE_KEY_LEN: usize = 64;
