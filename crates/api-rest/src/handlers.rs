//! HTTP handlers.
//!
//! Each handler takes the service lock once, applies one operation and releases the lock
//! before returning. Nothing here awaits while holding the lock.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use ctm_core::{CoreError, EntityId};

use crate::error::{from_core, ApiError};
use crate::AppState;
use api_shared::{
    CategoriesRes, ConfirmQuery, CriteriaRes, DeleteTrialRes, EligibilityRes, HealthRes,
    HealthService, ListPatientsRes, ListTrialsRes, PatientDto, PatientReq, ReportRes,
    SelectPatientReq, SelectedPatientRes, TrialDto, TrialReq,
};

fn parse_id(context: &str, raw: String) -> Result<EntityId, ApiError> {
    EntityId::new(raw).map_err(|e| from_core(context, CoreError::from(e)))
}

fn require_confirm(query: &ConfirmQuery) -> Result<(), ApiError> {
    if query.confirm {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            "Bulk delete requires confirm=true",
        ))
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// ============================================================================
// TRIALS
// ============================================================================

#[utoipa::path(
    get,
    path = "/trials",
    responses(
        (status = 200, description = "All trials in stored order", body = ListTrialsRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_trials(
    State(state): State<AppState>,
) -> Result<Json<ListTrialsRes>, ApiError> {
    let service = state.lock()?;
    let trials: Vec<TrialDto> = service.trials().iter().cloned().map(Into::into).collect();
    Ok(Json(ListTrialsRes { trials }))
}

#[utoipa::path(
    post,
    path = "/trials",
    request_body = TrialReq,
    responses(
        (status = 201, description = "Trial created", body = TrialDto),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a trial
///
/// Text fields are trimmed and blank criteria dropped. A trial needs a name, a category and at
/// least one criterion.
///
/// # Errors
/// Returns `400 Bad Request` if validation fails and `500 Internal Server Error` if the trial
/// cannot be persisted.
#[axum::debug_handler]
pub(crate) async fn create_trial(
    State(state): State<AppState>,
    Json(req): Json<TrialReq>,
) -> Result<(StatusCode, Json<TrialDto>), ApiError> {
    let draft = req
        .into_draft()
        .map_err(|e| from_core("Create trial", e))?;
    let trial = state
        .lock()?
        .create_trial(draft)
        .map_err(|e| from_core("Create trial", e))?;
    Ok((StatusCode::CREATED, Json(trial.into())))
}

#[utoipa::path(
    put,
    path = "/trials/{id}",
    request_body = TrialReq,
    params(("id" = String, Path, description = "Trial id")),
    responses(
        (status = 200, description = "Trial updated", body = TrialDto),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Trial not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Replace a trial's fields, keeping its id and the ids of unchanged criteria.
#[axum::debug_handler]
pub(crate) async fn update_trial(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<TrialReq>,
) -> Result<Json<TrialDto>, ApiError> {
    let id = parse_id("Update trial", id)?;
    let draft = req
        .into_draft()
        .map_err(|e| from_core("Update trial", e))?;
    let trial = state
        .lock()?
        .update_trial(&id, draft)
        .map_err(|e| from_core("Update trial", e))?;
    Ok(Json(trial.into()))
}

#[utoipa::path(
    delete,
    path = "/trials/{id}",
    params(("id" = String, Path, description = "Trial id")),
    responses(
        (status = 200, description = "Trial deleted", body = DeleteTrialRes),
        (status = 404, description = "Trial not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Delete a trial
///
/// Every patient in the trial's category is deleted with it. The response lists their ids.
#[axum::debug_handler]
pub(crate) async fn delete_trial(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DeleteTrialRes>, ApiError> {
    let id = parse_id("Delete trial", id)?;
    let removed = state
        .lock()?
        .delete_trial(&id)
        .map_err(|e| from_core("Delete trial", e))?;
    Ok(Json(DeleteTrialRes {
        removed_patient_ids: removed.into_iter().map(|p| p.id.into()).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/trials",
    params(ConfirmQuery),
    responses(
        (status = 204, description = "All trials removed"),
        (status = 400, description = "Missing confirmation"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn clear_trials(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Result<StatusCode, ApiError> {
    require_confirm(&query)?;
    state
        .lock()?
        .clear_trials()
        .map_err(|e| from_core("Clear trials", e))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Distinct trial categories", body = CategoriesRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesRes>, ApiError> {
    let categories = state.lock()?.categories();
    Ok(Json(CategoriesRes { categories }))
}

#[utoipa::path(
    get,
    path = "/categories/{category}/criteria",
    params(("category" = String, Path, description = "Trial category")),
    responses(
        (status = 200, description = "Deduplicated intake checklist", body = CriteriaRes)
    )
)]
/// The patient intake checklist for a category
///
/// Criteria of every trial in the category, deduplicated by description. An unknown category
/// yields an empty list.
#[axum::debug_handler]
pub(crate) async fn category_criteria(
    State(state): State<AppState>,
    AxumPath(category): AxumPath<String>,
) -> Result<Json<CriteriaRes>, ApiError> {
    let criteria = state.lock()?.criteria_for_category(&category);
    Ok(Json(CriteriaRes {
        category,
        criteria: criteria.into_iter().map(Into::into).collect(),
    }))
}

// ============================================================================
// PATIENTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients in stored order", body = ListPatientsRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let service = state.lock()?;
    let patients: Vec<PatientDto> = service.patients().iter().cloned().map(Into::into).collect();
    Ok(Json(ListPatientsRes { patients }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created and selected", body = PatientDto),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a patient
///
/// The new patient becomes the selected patient. Selections that are not on the category's
/// checklist are dropped.
///
/// # Errors
/// Returns `400 Bad Request` if the name or category is blank or no trial exists in the
/// category.
#[axum::debug_handler]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<PatientReq>,
) -> Result<(StatusCode, Json<PatientDto>), ApiError> {
    let draft = req
        .into_draft()
        .map_err(|e| from_core("Create patient", e))?;
    let patient = state
        .lock()?
        .create_patient(draft)
        .map_err(|e| from_core("Create patient", e))?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = PatientReq,
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient updated and selected", body = PatientDto),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<PatientReq>,
) -> Result<Json<PatientDto>, ApiError> {
    let id = parse_id("Update patient", id)?;
    let draft = req
        .into_draft()
        .map_err(|e| from_core("Update patient", e))?;
    let patient = state
        .lock()?
        .update_patient(&id, draft)
        .map_err(|e| from_core("Update patient", e))?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("Delete patient", id)?;
    state
        .lock()?
        .delete_patient(&id)
        .map_err(|e| from_core("Delete patient", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/patients",
    params(ConfirmQuery),
    responses(
        (status = 204, description = "All patients removed and selection cleared"),
        (status = 400, description = "Missing confirmation"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn clear_patients(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Result<StatusCode, ApiError> {
    require_confirm(&query)?;
    state
        .lock()?
        .clear_patients()
        .map_err(|e| from_core("Clear patients", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/eligibility",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Eligibility for each trial in the patient's category", body = EligibilityRes),
        (status = 404, description = "Patient not found")
    )
)]
/// Check one patient against every trial of the patient's category
///
/// Ineligible results list the unmet inclusion criteria and the met exclusion criteria.
#[axum::debug_handler]
pub(crate) async fn patient_eligibility(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<EligibilityRes>, ApiError> {
    let id = parse_id("Check eligibility", id)?;
    let service = state.lock()?;
    let (patient, results) = service
        .check_eligibility(Some(&id))
        .map_err(|e| from_core("Check eligibility", e))?;
    Ok(Json(EligibilityRes {
        patient: patient.clone().into(),
        results: results.into_iter().map(Into::into).collect(),
    }))
}

// ============================================================================
// SELECTION AND REPORT
// ============================================================================

#[utoipa::path(
    get,
    path = "/selected-patient",
    responses(
        (status = 200, description = "The patient under review, if any", body = SelectedPatientRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_selected_patient(
    State(state): State<AppState>,
) -> Result<Json<SelectedPatientRes>, ApiError> {
    let patient: Option<PatientDto> =
        state.lock()?.selected_patient().cloned().map(Into::into);
    Ok(Json(SelectedPatientRes { patient }))
}

#[utoipa::path(
    put,
    path = "/selected-patient",
    request_body = SelectPatientReq,
    responses(
        (status = 200, description = "Selection updated", body = SelectedPatientRes),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Select the patient under review, or clear the selection with a null id.
#[axum::debug_handler]
pub(crate) async fn put_selected_patient(
    State(state): State<AppState>,
    Json(req): Json<SelectPatientReq>,
) -> Result<Json<SelectedPatientRes>, ApiError> {
    let id = req
        .patient_id
        .map(|raw| parse_id("Select patient", raw))
        .transpose()?;
    let selected = state
        .lock()?
        .select_patient(id.as_ref())
        .map_err(|e| from_core("Select patient", e))?;
    Ok(Json(SelectedPatientRes {
        patient: selected.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/report",
    responses(
        (status = 200, description = "Eligible trials per patient", body = ReportRes)
    )
)]
/// Cross-patient report
///
/// One row per patient in stored order, listing the trials of the patient's category the
/// patient is eligible for.
#[axum::debug_handler]
pub(crate) async fn report(State(state): State<AppState>) -> Result<Json<ReportRes>, ApiError> {
    let rows = state.lock()?.report();
    Ok(Json(ReportRes {
        rows: rows.into_iter().map(Into::into).collect(),
    }))
}
