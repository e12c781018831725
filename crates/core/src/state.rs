//! The matcher's state container.
//!
//! [`MatcherState`] holds the trial and patient collections plus the patient under active
//! eligibility review. Every mutation consumes the state and returns the next one, so the
//! aggregator, evaluator and report generator only ever see plain immutable inputs.

use crate::criteria;
use crate::eligibility;
use crate::model::{ClinicalTrial, Criterion, Patient, PatientReport, TrialEligibility};
use crate::report;
use ctm_uuid::EntityId;

/// Trials, patients and the selected patient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatcherState {
    trials: Vec<ClinicalTrial>,
    patients: Vec<Patient>,
    selected_patient: Option<Patient>,
}

/// Which persisted collections differ between two states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    pub trials: bool,
    pub patients: bool,
    pub selected_patient: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.trials || self.patients || self.selected_patient
    }
}

impl MatcherState {
    /// Builds a state from loaded collections.
    ///
    /// The selected patient is resolved against `patients`: if a patient with the same id
    /// exists, that record becomes the selection; a selection with no matching patient is
    /// dropped.
    pub fn new(
        trials: Vec<ClinicalTrial>,
        patients: Vec<Patient>,
        selected_patient: Option<Patient>,
    ) -> Self {
        let selected_patient = selected_patient
            .and_then(|selected| patients.iter().find(|p| p.id == selected.id).cloned());
        Self {
            trials,
            patients,
            selected_patient,
        }
    }

    pub fn trials(&self) -> &[ClinicalTrial] {
        &self.trials
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.selected_patient.as_ref()
    }

    pub fn trial(&self, id: &EntityId) -> Option<&ClinicalTrial> {
        self.trials.iter().find(|t| &t.id == id)
    }

    pub fn patient(&self, id: &EntityId) -> Option<&Patient> {
        self.patients.iter().find(|p| &p.id == id)
    }

    pub fn categories(&self) -> Vec<String> {
        criteria::categories(&self.trials)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.trials.iter().any(|t| t.in_category(category))
    }

    /// The deduplicated intake checklist for `category`.
    pub fn criteria_for_category(&self, category: &str) -> Vec<Criterion> {
        criteria::aggregate(&self.trials, category)
    }

    /// Eligibility of `patient` for every trial of its category.
    pub fn check_patient(&self, patient: &Patient) -> Vec<TrialEligibility> {
        eligibility::check_patient(patient, &self.trials)
    }

    pub fn report(&self) -> Vec<PatientReport> {
        report::report(&self.patients, &self.trials)
    }

    /// Compares two states collection by collection.
    pub fn changes_from(&self, previous: &MatcherState) -> Changes {
        Changes {
            trials: self.trials != previous.trials,
            patients: self.patients != previous.patients,
            selected_patient: self.selected_patient != previous.selected_patient,
        }
    }

    // ------------------------------------------------------------------
    // Trials
    // ------------------------------------------------------------------

    pub fn add_trial(mut self, trial: ClinicalTrial) -> Self {
        self.trials.push(trial);
        self
    }

    /// Replaces the trial with the same id in place. Unknown ids leave the state unchanged.
    pub fn update_trial(mut self, trial: ClinicalTrial) -> Self {
        if let Some(slot) = self.trials.iter_mut().find(|t| t.id == trial.id) {
            *slot = trial;
        }
        self
    }

    /// Removes the trial with `id` and every patient whose category is that trial's category.
    ///
    /// The selected patient is deselected if it was in that category.
    pub fn delete_trial(mut self, id: &EntityId) -> Self {
        let Some(index) = self.trials.iter().position(|t| &t.id == id) else {
            return self;
        };
        let removed = self.trials.remove(index);

        self.patients
            .retain(|p| p.selected_category != removed.category);
        if self
            .selected_patient
            .as_ref()
            .is_some_and(|p| p.selected_category == removed.category)
        {
            self.selected_patient = None;
        }
        self
    }

    /// Empties the trial collection. Patients are kept.
    pub fn clear_trials(mut self) -> Self {
        self.trials.clear();
        self
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    /// Appends `patient` and makes it the selected patient.
    pub fn add_patient(mut self, patient: Patient) -> Self {
        self.selected_patient = Some(patient.clone());
        self.patients.push(patient);
        self
    }

    /// Replaces the patient with the same id in place and selects the updated record.
    /// Unknown ids leave the state unchanged.
    pub fn update_patient(mut self, patient: Patient) -> Self {
        if let Some(slot) = self.patients.iter_mut().find(|p| p.id == patient.id) {
            *slot = patient.clone();
            self.selected_patient = Some(patient);
        }
        self
    }

    /// Removes the patient with `id`; deselects it if it was selected.
    pub fn delete_patient(mut self, id: &EntityId) -> Self {
        self.patients.retain(|p| &p.id != id);
        if self.selected_patient.as_ref().is_some_and(|p| &p.id == id) {
            self.selected_patient = None;
        }
        self
    }

    /// Empties the patient collection and clears the selection.
    pub fn clear_patients(mut self) -> Self {
        self.patients.clear();
        self.selected_patient = None;
        self
    }

    /// Selects the patient with `id`, or clears the selection when `id` is `None`.
    /// Unknown ids leave the state unchanged.
    pub fn select_patient(mut self, id: Option<&EntityId>) -> Self {
        match id {
            None => self.selected_patient = None,
            Some(id) => {
                if let Some(patient) = self.patients.iter().find(|p| &p.id == id) {
                    self.selected_patient = Some(patient.clone());
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriterionKind, CriterionTag};

    fn id(value: &str) -> EntityId {
        EntityId::new(value).unwrap()
    }

    fn trial(trial_id: &str, category: &str) -> ClinicalTrial {
        ClinicalTrial {
            id: id(trial_id),
            name: trial_id.into(),
            description: String::new(),
            category: category.into(),
            inclusion_criteria: vec![Criterion {
                id: id(&format!("{}-c1", trial_id)),
                kind: CriterionKind::Inclusion,
                description: "Age over 18".into(),
            }],
            exclusion_criteria: vec![],
        }
    }

    fn patient(patient_id: &str, category: &str) -> Patient {
        Patient {
            id: id(patient_id),
            name: patient_id.into(),
            selected_category: category.into(),
            selected_criteria: vec![CriterionTag::inclusion("Age over 18")],
        }
    }

    fn patient_ids(state: &MatcherState) -> Vec<&str> {
        state.patients().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_new_resolves_selected_patient_against_collection() {
        let mut stale = patient("p1", "Oncology");
        stale.name = "Old name".into();
        let state = MatcherState::new(vec![], vec![patient("p1", "Oncology")], Some(stale));
        assert_eq!(state.selected_patient().map(|p| p.name.as_str()), Some("p1"));

        let orphan = MatcherState::new(vec![], vec![], Some(patient("p9", "Oncology")));
        assert!(orphan.selected_patient().is_none());
    }

    #[test]
    fn test_update_trial_replaces_in_place() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "A"))
            .add_trial(trial("t2", "A"))
            .add_trial(trial("t3", "B"));

        let mut edited = trial("t2", "C");
        edited.name = "Edited".into();
        let state = state.update_trial(edited);

        let names: Vec<&str> = state.trials().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "Edited", "t3"]);
        assert_eq!(state.trial(&id("t2")).unwrap().category, "C");
    }

    #[test]
    fn test_update_unknown_trial_is_noop() {
        let state = MatcherState::default().add_trial(trial("t1", "A"));
        let next = state.clone().update_trial(trial("t9", "A"));
        assert_eq!(next, state);
    }

    #[test]
    fn test_delete_trial_cascades_to_category_patients() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "Oncology"))
            .add_trial(trial("t2", "Cardiology"))
            .add_patient(patient("p1", "Oncology"))
            .add_patient(patient("p2", "Cardiology"))
            .add_patient(patient("p3", "Oncology"))
            .select_patient(Some(&id("p1")));

        let state = state.delete_trial(&id("t1"));

        assert!(state.trial(&id("t1")).is_none());
        assert_eq!(patient_ids(&state), vec!["p2"]);
        assert!(state.selected_patient().is_none());
    }

    #[test]
    fn test_delete_trial_keeps_selection_outside_category() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "Oncology"))
            .add_trial(trial("t2", "Cardiology"))
            .add_patient(patient("p1", "Cardiology"));

        let state = state.delete_trial(&id("t1"));

        assert_eq!(
            state.selected_patient().map(|p| p.id.as_str()),
            Some("p1")
        );
    }

    #[test]
    fn test_delete_trial_cascades_even_when_category_has_other_trials() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "Oncology"))
            .add_trial(trial("t2", "Oncology"))
            .add_patient(patient("p1", "Oncology"));

        let state = state.delete_trial(&id("t1"));

        assert_eq!(state.trials().len(), 1);
        assert!(state.patients().is_empty());
    }

    #[test]
    fn test_add_and_update_patient_select_it() {
        let state = MatcherState::default()
            .add_patient(patient("p1", "A"))
            .add_patient(patient("p2", "A"));
        assert_eq!(state.selected_patient().map(|p| p.id.as_str()), Some("p2"));

        let mut edited = patient("p1", "A");
        edited.name = "Edited".into();
        let state = state.update_patient(edited);

        assert_eq!(patient_ids(&state), vec!["p1", "p2"]);
        assert_eq!(
            state.selected_patient().map(|p| p.name.as_str()),
            Some("Edited")
        );
    }

    #[test]
    fn test_delete_patient_does_not_cascade() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "A"))
            .add_patient(patient("p1", "A"))
            .add_patient(patient("p2", "A"));

        let state = state.delete_patient(&id("p2"));

        assert_eq!(patient_ids(&state), vec!["p1"]);
        assert_eq!(state.trials().len(), 1);
        assert!(state.selected_patient().is_none());
    }

    #[test]
    fn test_clear_patients_clears_selection() {
        let state = MatcherState::default()
            .add_patient(patient("p1", "A"))
            .clear_patients();
        assert!(state.patients().is_empty());
        assert!(state.selected_patient().is_none());
    }

    #[test]
    fn test_clear_trials_keeps_patients() {
        let state = MatcherState::default()
            .add_trial(trial("t1", "A"))
            .add_patient(patient("p1", "A"))
            .clear_trials();
        assert!(state.trials().is_empty());
        assert_eq!(patient_ids(&state), vec!["p1"]);
    }

    #[test]
    fn test_select_unknown_patient_is_noop() {
        let state = MatcherState::default().add_patient(patient("p1", "A"));
        let next = state.clone().select_patient(Some(&id("p9")));
        assert_eq!(next, state);
        assert!(next.select_patient(None).selected_patient().is_none());
    }

    #[test]
    fn test_changes_from_reports_touched_collections() {
        let before = MatcherState::default().add_trial(trial("t1", "A"));
        let after = before.clone().add_patient(patient("p1", "A"));

        let changes = after.changes_from(&before);

        assert!(!changes.trials);
        assert!(changes.patients);
        assert!(changes.selected_patient);
        assert!(!before.changes_from(&before).any());
    }
}
