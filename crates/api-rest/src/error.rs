//! Mapping from core errors to HTTP responses.

use axum::http::StatusCode;
use ctm_core::CoreError;

/// Error half of every handler result.
pub type ApiError = (StatusCode, &'static str);

pub(crate) const INTERNAL: ApiError = (StatusCode::INTERNAL_SERVER_ERROR, "Internal error");

/// Converts a core error into a status and a short message.
///
/// Caller mistakes map to 4xx and are logged at `warn`; storage failures map to 500 and are
/// logged at `error`.
pub(crate) fn from_core(context: &str, e: CoreError) -> ApiError {
    let mapped = if e.is_not_found() {
        let message = match &e {
            CoreError::TrialNotFound(_) => "Trial not found",
            _ => "Patient not found",
        };
        (StatusCode::NOT_FOUND, message)
    } else if e.is_invalid_input() {
        let message = match &e {
            CoreError::UnknownCategory(_) => "No trials exist in category",
            CoreError::NoPatientSelected => "No patient selected",
            _ => "Invalid input",
        };
        (StatusCode::BAD_REQUEST, message)
    } else {
        tracing::error!("{} error: {:?}", context, e);
        return INTERNAL;
    };
    tracing::warn!("{} rejected: {}", context, e);
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctm_core::{EntityId, StoreError};

    #[test]
    fn test_status_mapping() {
        let id = EntityId::new("trial-1").unwrap();
        assert_eq!(
            from_core("t", CoreError::TrialNotFound(id)).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            from_core("t", CoreError::InvalidInput("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            from_core("t", CoreError::UnknownCategory("A".into())),
            (StatusCode::BAD_REQUEST, "No trials exist in category")
        );
        assert_eq!(
            from_core("t", CoreError::PatientNotFound(EntityId::new("p").unwrap())),
            (StatusCode::NOT_FOUND, "Patient not found")
        );
        assert_eq!(
            from_core("t", StoreError::InvalidKey("k".into()).into()).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
