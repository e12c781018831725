//! Patient-versus-trial eligibility.
//!
//! A patient is eligible for a trial when every inclusion criterion of the trial is among the
//! patient's selections and no exclusion criterion of the trial is. Nothing is weighted and
//! there is no partial credit. A trial without criteria is eligible for everyone.

use crate::criteria::trials_in_category;
use crate::model::{ClinicalTrial, CriterionKind, Patient, TrialEligibility};
use std::collections::HashSet;

/// Set view over a patient's selected criteria.
struct Selections<'a>(HashSet<(CriterionKind, &'a str)>);

impl<'a> Selections<'a> {
    fn of(patient: &'a Patient) -> Self {
        Self(
            patient
                .selected_criteria
                .iter()
                .map(|tag| (tag.kind, tag.description.as_str()))
                .collect(),
        )
    }

    fn contains(&self, kind: CriterionKind, description: &str) -> bool {
        self.0.contains(&(kind, description))
    }

    fn is_eligible(&self, trial: &ClinicalTrial) -> bool {
        trial
            .inclusion_criteria
            .iter()
            .all(|c| self.contains(CriterionKind::Inclusion, &c.description))
            && trial
                .exclusion_criteria
                .iter()
                .all(|c| !self.contains(CriterionKind::Exclusion, &c.description))
    }
}

/// Decides whether `patient` is eligible for `trial`.
///
/// Categories are not compared here; see [`crate::report::report`] and [`check_patient`] for
/// the category-scoped views.
pub fn is_eligible(patient: &Patient, trial: &ClinicalTrial) -> bool {
    Selections::of(patient).is_eligible(trial)
}

/// Like [`is_eligible`], but also lists why the patient is not eligible.
pub fn evaluate(patient: &Patient, trial: &ClinicalTrial) -> TrialEligibility {
    let selections = Selections::of(patient);

    let missing = trial
        .inclusion_criteria
        .iter()
        .filter(|c| !selections.contains(CriterionKind::Inclusion, &c.description))
        .map(|c| format!("inclusion criterion not met: {}", c.description));
    let excluded = trial
        .exclusion_criteria
        .iter()
        .filter(|c| selections.contains(CriterionKind::Exclusion, &c.description))
        .map(|c| format!("exclusion criterion met: {}", c.description));
    let reasons: Vec<String> = missing.chain(excluded).collect();

    TrialEligibility {
        trial_id: trial.id.clone(),
        is_eligible: reasons.is_empty(),
        reasons,
    }
}

/// Evaluates `patient` against every trial of the patient's category, in trial order.
pub fn check_patient(patient: &Patient, trials: &[ClinicalTrial]) -> Vec<TrialEligibility> {
    trials_in_category(trials, &patient.selected_category)
        .map(|trial| evaluate(patient, trial))
        .collect()
}
