//! Request and response bodies.
//!
//! These mirror the core records field for field (camelCase on the wire) and add the
//! OpenAPI schema derives the core crate does not carry.

use ctm_core::{
    ClinicalTrial, CoreResult, Criterion, CriterionKind, CriterionTag, Patient, PatientDraft,
    PatientReport, TrialDraft, TrialEligibility,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CriterionType {
    Inclusion,
    Exclusion,
}

impl From<CriterionKind> for CriterionType {
    fn from(kind: CriterionKind) -> Self {
        match kind {
            CriterionKind::Inclusion => CriterionType::Inclusion,
            CriterionKind::Exclusion => CriterionType::Exclusion,
        }
    }
}

impl From<CriterionType> for CriterionKind {
    fn from(kind: CriterionType) -> Self {
        match kind {
            CriterionType::Inclusion => CriterionKind::Inclusion,
            CriterionType::Exclusion => CriterionKind::Exclusion,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CriterionDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CriterionType,
    pub description: String,
}

impl From<Criterion> for CriterionDto {
    fn from(criterion: Criterion) -> Self {
        Self {
            id: criterion.id.into(),
            kind: criterion.kind.into(),
            description: criterion.description,
        }
    }
}

/// A selected criterion: the `(type, description)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CriterionTagDto {
    #[serde(rename = "type")]
    pub kind: CriterionType,
    pub description: String,
}

impl From<CriterionTag> for CriterionTagDto {
    fn from(tag: CriterionTag) -> Self {
        Self {
            kind: tag.kind.into(),
            description: tag.description,
        }
    }
}

impl From<CriterionTagDto> for CriterionTag {
    fn from(tag: CriterionTagDto) -> Self {
        CriterionTag::new(tag.kind.into(), tag.description)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub inclusion_criteria: Vec<CriterionDto>,
    pub exclusion_criteria: Vec<CriterionDto>,
}

impl From<ClinicalTrial> for TrialDto {
    fn from(trial: ClinicalTrial) -> Self {
        Self {
            id: trial.id.into(),
            name: trial.name,
            description: trial.description,
            category: trial.category,
            inclusion_criteria: trial.inclusion_criteria.into_iter().map(Into::into).collect(),
            exclusion_criteria: trial.exclusion_criteria.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: String,
    pub name: String,
    pub selected_category: String,
    pub selected_criteria: Vec<CriterionTagDto>,
}

impl From<Patient> for PatientDto {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id.into(),
            name: patient.name,
            selected_category: patient.selected_category,
            selected_criteria: patient.selected_criteria.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialEligibilityDto {
    pub trial_id: String,
    pub is_eligible: bool,
    pub reasons: Vec<String>,
}

impl From<TrialEligibility> for TrialEligibilityDto {
    fn from(result: TrialEligibility) -> Self {
        Self {
            trial_id: result.trial_id.into(),
            is_eligible: result.is_eligible,
            reasons: result.reasons,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReportDto {
    pub patient: PatientDto,
    pub eligible_trials: Vec<TrialDto>,
}

impl From<PatientReport> for PatientReportDto {
    fn from(row: PatientReport) -> Self {
        Self {
            patient: row.patient.into(),
            eligible_trials: row.eligible_trials.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Body for creating or editing a trial. Criteria are plain descriptions.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialReq {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub inclusion_criteria: Vec<String>,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
}

impl TrialReq {
    pub fn into_draft(self) -> CoreResult<TrialDraft> {
        TrialDraft::new(
            &self.name,
            &self.description,
            &self.category,
            &self.inclusion_criteria,
            &self.exclusion_criteria,
        )
    }
}

/// Body for creating or editing a patient.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReq {
    pub name: String,
    pub selected_category: String,
    #[serde(default)]
    pub selected_criteria: Vec<CriterionTagDto>,
}

impl PatientReq {
    pub fn into_draft(self) -> CoreResult<PatientDraft> {
        PatientDraft::new(
            &self.name,
            &self.selected_category,
            self.selected_criteria.into_iter().map(Into::into).collect(),
        )
    }
}

/// Body for `PUT /selected-patient`. A missing or null id clears the selection.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectPatientReq {
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// Query string guarding bulk deletes.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmQuery {
    /// Must be `true` for the delete to go ahead.
    #[serde(default)]
    pub confirm: bool,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListTrialsRes {
    pub trials: Vec<TrialDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesRes {
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CriteriaRes {
    pub category: String,
    pub criteria: Vec<CriterionDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTrialRes {
    /// Ids of the patients removed along with the trial's category.
    pub removed_patient_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EligibilityRes {
    pub patient: PatientDto,
    pub results: Vec<TrialEligibilityDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SelectedPatientRes {
    pub patient: Option<PatientDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportRes {
    pub rows: Vec<PatientReportDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctm_core::EntityId;

    #[test]
    fn test_trial_dto_uses_camel_case_and_type_field() {
        let trial = ClinicalTrial {
            id: EntityId::new("trial-1").unwrap(),
            name: "Lung Study".into(),
            description: String::new(),
            category: "Oncology".into(),
            inclusion_criteria: vec![Criterion {
                id: EntityId::new("criterion-1").unwrap(),
                kind: CriterionKind::Inclusion,
                description: "Age over 18".into(),
            }],
            exclusion_criteria: vec![],
        };

        let json = serde_json::to_value(TrialDto::from(trial)).unwrap();

        assert_eq!(json["inclusionCriteria"][0]["type"], "inclusion");
        assert_eq!(json["inclusionCriteria"][0]["id"], "criterion-1");
        assert!(json["exclusionCriteria"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_patient_req_into_draft() {
        let req: PatientReq = serde_json::from_str(
            r#"{"name":" Ada ","selectedCategory":"Oncology",
                "selectedCriteria":[{"type":"exclusion","description":"Pregnant"}]}"#,
        )
        .unwrap();

        let draft = req.into_draft().expect("draft should be valid");

        assert_eq!(draft.name(), "Ada");
        assert_eq!(draft.selected(), &[CriterionTag::exclusion("Pregnant")]);
    }

    #[test]
    fn test_trial_req_rejects_missing_criteria() {
        let req = TrialReq {
            name: "T".into(),
            category: "A".into(),
            ..Default::default()
        };
        assert!(req.into_draft().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_select_patient_req_accepts_null() {
        let req: SelectPatientReq = serde_json::from_str(r#"{"patientId":null}"#).unwrap();
        assert!(req.patient_id.is_none());
        let req: SelectPatientReq = serde_json::from_str("{}").unwrap();
        assert!(req.patient_id.is_none());
    }
}
