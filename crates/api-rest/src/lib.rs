//! # API REST
//!
//! REST API implementation for CTM.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Uses `api-shared` for wire types and `ctm-core` for all matching and persistence.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

use axum::{
    http::StatusCode,
    routing::{get, put},
    Router,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    CategoriesRes, CriteriaRes, CriterionDto, CriterionTagDto, CriterionType, DeleteTrialRes,
    EligibilityRes, HealthRes, ListPatientsRes, ListTrialsRes, PatientDto, PatientReportDto,
    PatientReq, ReportRes, SelectPatientReq, SelectedPatientRes, TrialDto, TrialEligibilityDto,
    TrialReq,
};
use ctm_core::{CoreConfig, CoreResult, JsonFileStore, KeyValueStore, TrialMatcherService};

pub use error::ApiError;

/// Store type behind the shared service. Boxed so the router is not generic over the backend.
pub type DynStore = Box<dyn KeyValueStore + Send>;

/// Application state shared across REST API handlers
///
/// Holds the one matcher service. Each request locks it for a single operation.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Mutex<TrialMatcherService<DynStore>>>,
}

impl AppState {
    /// Loads the service from the JSON file store under the configured data directory.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let store = JsonFileStore::open(cfg.data_dir())?;
        Ok(Self::from_store(store))
    }

    pub fn from_store(store: impl KeyValueStore + Send + 'static) -> Self {
        let store: DynStore = Box::new(store);
        Self {
            service: Arc::new(Mutex::new(TrialMatcherService::load(store))),
        }
    }

    pub(crate) fn lock(
        &self,
    ) -> Result<MutexGuard<'_, TrialMatcherService<DynStore>>, ApiError> {
        self.service.lock().map_err(|e| {
            tracing::error!("Service lock poisoned: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_trials,
        handlers::create_trial,
        handlers::update_trial,
        handlers::delete_trial,
        handlers::clear_trials,
        handlers::list_categories,
        handlers::category_criteria,
        handlers::list_patients,
        handlers::create_patient,
        handlers::update_patient,
        handlers::delete_patient,
        handlers::clear_patients,
        handlers::patient_eligibility,
        handlers::get_selected_patient,
        handlers::put_selected_patient,
        handlers::report,
    ),
    components(schemas(
        HealthRes,
        CriterionType,
        CriterionDto,
        CriterionTagDto,
        TrialDto,
        PatientDto,
        TrialEligibilityDto,
        PatientReportDto,
        TrialReq,
        PatientReq,
        SelectPatientReq,
        ListTrialsRes,
        ListPatientsRes,
        CategoriesRes,
        CriteriaRes,
        DeleteTrialRes,
        EligibilityRes,
        SelectedPatientRes,
        ReportRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/trials",
            get(handlers::list_trials)
                .post(handlers::create_trial)
                .delete(handlers::clear_trials),
        )
        .route(
            "/trials/:id",
            put(handlers::update_trial).delete(handlers::delete_trial),
        )
        .route("/categories", get(handlers::list_categories))
        .route(
            "/categories/:category/criteria",
            get(handlers::category_criteria),
        )
        .route(
            "/patients",
            get(handlers::list_patients)
                .post(handlers::create_patient)
                .delete(handlers::clear_patients),
        )
        .route(
            "/patients/:id",
            put(handlers::update_patient).delete(handlers::delete_patient),
        )
        .route(
            "/patients/:id/eligibility",
            get(handlers::patient_eligibility),
        )
        .route(
            "/selected-patient",
            get(handlers::get_selected_patient).put(handlers::put_selected_patient),
        )
        .route("/report", get(handlers::report))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
