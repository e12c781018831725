use crate::store::StoreError;
use crate::text::TextError;
use ctm_uuid::{EntityId, IdError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
    #[error("invalid identifier: {0}")]
    Id(#[from] IdError),

    #[error("trial not found: {0}")]
    TrialNotFound(EntityId),
    #[error("patient not found: {0}")]
    PatientNotFound(EntityId),
    #[error("no trials exist in category '{0}'")]
    UnknownCategory(String),
    #[error("no patient is selected")]
    NoPatientSelected,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// True for errors caused by caller input rather than by storage.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidInput(_)
                | CoreError::Text(_)
                | CoreError::Id(_)
                | CoreError::UnknownCategory(_)
                | CoreError::NoPatientSelected
        )
    }

    /// True for lookups of an identifier that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::TrialNotFound(_) | CoreError::PatientNotFound(_)
        )
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
