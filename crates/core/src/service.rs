//! The trial matcher service.
//!
//! [`TrialMatcherService`] owns the persisted store, the in-memory [`MatcherState`] and the id
//! generator. It is the only place that mutates state: every operation computes the next state,
//! writes the collections that changed, and only then swaps the new state in. A failed write
//! leaves the in-memory state as it was, and keys already written by that operation are
//! restored to their previous values.

use crate::config::CoreConfig;
use crate::constants::{PATIENTS_KEY, SELECTED_PATIENT_KEY, TRIALS_KEY};
use crate::model::{
    ClinicalTrial, Criterion, CriterionKind, Patient, PatientReport, TrialEligibility,
};
use crate::state::MatcherState;
use crate::store::{self, JsonFileStore, KeyValueStore};
use crate::validation::{PatientDraft, TrialDraft};
use crate::{CoreError, CoreResult};
use ctm_uuid::{EntityId, EntityKind, IdGenerator};
use std::collections::HashSet;
use std::sync::Arc;

/// Manages trials, patients and the selected patient on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct TrialMatcherService<S> {
    store: S,
    state: MatcherState,
    ids: IdGenerator,
}

impl TrialMatcherService<JsonFileStore> {
    /// Opens the JSON file store under the configured data directory and loads its state.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Store` if the data directory cannot be created.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let store = JsonFileStore::open(cfg.data_dir())?;
        Ok(Self::load(store))
    }
}

impl<S: KeyValueStore> TrialMatcherService<S> {
    /// Loads state from `store`. Missing or malformed collections start empty.
    pub fn load(store: S) -> Self {
        let trials: Vec<ClinicalTrial> = store::load_or_default(&store, TRIALS_KEY);
        let patients: Vec<Patient> = store::load_or_default(&store, PATIENTS_KEY);
        let selected: Option<Patient> = store::load_or_default(&store, SELECTED_PATIENT_KEY);

        if let Some(stale) = selected
            .as_ref()
            .filter(|s| !patients.iter().any(|p| p.id == s.id))
        {
            tracing::warn!(
                "selected patient {} is not in the patient list, clearing selection",
                stale.id
            );
        }

        let state = MatcherState::new(trials, patients, selected);
        tracing::info!(
            "loaded {} trials and {} patients",
            state.trials().len(),
            state.patients().len()
        );

        Self {
            store,
            state,
            ids: IdGenerator::new(),
        }
    }

    pub fn state(&self) -> &MatcherState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn trials(&self) -> &[ClinicalTrial] {
        self.state.trials()
    }

    pub fn patients(&self) -> &[Patient] {
        self.state.patients()
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.state.selected_patient()
    }

    pub fn categories(&self) -> Vec<String> {
        self.state.categories()
    }

    pub fn criteria_for_category(&self, category: &str) -> Vec<Criterion> {
        self.state.criteria_for_category(category)
    }

    pub fn report(&self) -> Vec<PatientReport> {
        self.state.report()
    }

    /// Checks a patient against every trial of its category.
    ///
    /// With `id` of `None` the selected patient is checked.
    ///
    /// # Errors
    ///
    /// - `CoreError::PatientNotFound` if `id` names no patient.
    /// - `CoreError::NoPatientSelected` if `id` is `None` and nothing is selected.
    pub fn check_eligibility(
        &self,
        id: Option<&EntityId>,
    ) -> CoreResult<(&Patient, Vec<TrialEligibility>)> {
        let patient = match id {
            Some(id) => self
                .state
                .patient(id)
                .ok_or_else(|| CoreError::PatientNotFound(id.clone()))?,
            None => self
                .state
                .selected_patient()
                .ok_or(CoreError::NoPatientSelected)?,
        };
        Ok((patient, self.state.check_patient(patient)))
    }

    // ------------------------------------------------------------------
    // Trials
    // ------------------------------------------------------------------

    /// Creates a trial from a validated draft, assigning fresh trial and criterion ids.
    pub fn create_trial(&mut self, draft: TrialDraft) -> CoreResult<ClinicalTrial> {
        let id = self.ids.next_id(EntityKind::Trial);
        let trial = self.build_trial(id, &draft, &[]);

        let next = self.state.clone().add_trial(trial.clone());
        self.commit(next)?;

        tracing::info!("created trial {} in category '{}'", trial.id, trial.category);
        Ok(trial)
    }

    /// Replaces the trial `id` with the draft's content.
    ///
    /// Criteria whose `(kind, description)` already existed on the trial keep their ids.
    pub fn update_trial(
        &mut self,
        id: &EntityId,
        draft: TrialDraft,
    ) -> CoreResult<ClinicalTrial> {
        let existing = self
            .state
            .trial(id)
            .ok_or_else(|| CoreError::TrialNotFound(id.clone()))?;
        let previous: Vec<Criterion> = existing.criteria().cloned().collect();
        let trial = self.build_trial(id.clone(), &draft, &previous);

        let next = self.state.clone().update_trial(trial.clone());
        self.commit(next)?;

        tracing::info!("updated trial {}", trial.id);
        Ok(trial)
    }

    /// Deletes the trial `id` and every patient in its category.
    ///
    /// Returns the patients removed by the cascade.
    pub fn delete_trial(&mut self, id: &EntityId) -> CoreResult<Vec<Patient>> {
        let category = self
            .state
            .trial(id)
            .map(|t| t.category.clone())
            .ok_or_else(|| CoreError::TrialNotFound(id.clone()))?;
        let removed: Vec<Patient> = self
            .state
            .patients()
            .iter()
            .filter(|p| p.selected_category == category)
            .cloned()
            .collect();

        let next = self.state.clone().delete_trial(id);
        self.commit(next)?;

        tracing::info!(
            "deleted trial {} and {} patients in category '{}'",
            id,
            removed.len(),
            category
        );
        Ok(removed)
    }

    /// Removes every trial. Patients are kept.
    pub fn clear_trials(&mut self) -> CoreResult<()> {
        self.write_keys(vec![(TRIALS_KEY, None)])?;
        self.state = std::mem::take(&mut self.state).clear_trials();
        tracing::info!("cleared all trials");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    /// Creates a patient and makes it the selected patient.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownCategory` if no trial exists in the draft's category.
    pub fn create_patient(&mut self, draft: PatientDraft) -> CoreResult<Patient> {
        let draft = self.prune_selections(draft)?;
        let patient = Patient {
            id: self.ids.next_id(EntityKind::Patient),
            name: draft.name().to_string(),
            selected_category: draft.category().to_string(),
            selected_criteria: draft.selected().to_vec(),
        };

        let next = self.state.clone().add_patient(patient.clone());
        self.commit(next)?;

        tracing::info!(
            "created patient {} in category '{}'",
            patient.id,
            patient.selected_category
        );
        Ok(patient)
    }

    /// Replaces the patient `id` with the draft's content and selects it.
    pub fn update_patient(&mut self, id: &EntityId, draft: PatientDraft) -> CoreResult<Patient> {
        if self.state.patient(id).is_none() {
            return Err(CoreError::PatientNotFound(id.clone()));
        }
        let draft = self.prune_selections(draft)?;
        let patient = Patient {
            id: id.clone(),
            name: draft.name().to_string(),
            selected_category: draft.category().to_string(),
            selected_criteria: draft.selected().to_vec(),
        };

        let next = self.state.clone().update_patient(patient.clone());
        self.commit(next)?;

        tracing::info!("updated patient {}", patient.id);
        Ok(patient)
    }

    pub fn delete_patient(&mut self, id: &EntityId) -> CoreResult<()> {
        if self.state.patient(id).is_none() {
            return Err(CoreError::PatientNotFound(id.clone()));
        }
        let next = self.state.clone().delete_patient(id);
        self.commit(next)?;

        tracing::info!("deleted patient {}", id);
        Ok(())
    }

    /// Removes every patient and clears the selection.
    pub fn clear_patients(&mut self) -> CoreResult<()> {
        self.write_keys(vec![(PATIENTS_KEY, None), (SELECTED_PATIENT_KEY, None)])?;
        self.state = std::mem::take(&mut self.state).clear_patients();
        tracing::info!("cleared all patients");
        Ok(())
    }

    /// Selects the patient `id`, or clears the selection when `id` is `None`.
    pub fn select_patient(&mut self, id: Option<&EntityId>) -> CoreResult<Option<Patient>> {
        if let Some(id) = id {
            if self.state.patient(id).is_none() {
                return Err(CoreError::PatientNotFound(id.clone()));
            }
        }
        let next = self.state.clone().select_patient(id);
        self.commit(next)?;
        Ok(self.state.selected_patient().cloned())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Builds a trial from `draft`, reusing ids from `previous` for unchanged criteria.
    ///
    /// Each previous id is reused at most once, so a repeated description gets a fresh id.
    fn build_trial(
        &mut self,
        id: EntityId,
        draft: &TrialDraft,
        previous: &[Criterion],
    ) -> ClinicalTrial {
        let mut unclaimed: Vec<&Criterion> = previous.iter().collect();
        let mut criteria = |kind: CriterionKind| -> Vec<Criterion> {
            draft
                .criteria(kind)
                .map(|description| {
                    let id = match unclaimed
                        .iter()
                        .position(|c| c.kind == kind && c.description == description)
                    {
                        Some(index) => unclaimed.swap_remove(index).id.clone(),
                        None => self.ids.next_id(EntityKind::Criterion),
                    };
                    Criterion {
                        id,
                        kind,
                        description: description.to_string(),
                    }
                })
                .collect()
        };

        let inclusion_criteria = criteria(CriterionKind::Inclusion);
        let exclusion_criteria = criteria(CriterionKind::Exclusion);

        ClinicalTrial {
            id,
            name: draft.name().to_string(),
            description: draft.description().to_string(),
            category: draft.category().to_string(),
            inclusion_criteria,
            exclusion_criteria,
        }
    }

    /// Drops selections that are not on the draft category's checklist.
    fn prune_selections(&self, mut draft: PatientDraft) -> CoreResult<PatientDraft> {
        if !self.state.has_category(draft.category()) {
            return Err(CoreError::UnknownCategory(draft.category().to_string()));
        }

        let checklist: HashSet<_> = self
            .state
            .criteria_for_category(draft.category())
            .iter()
            .map(Criterion::tag)
            .collect();

        let before = draft.selected().len();
        draft.retain_selected(|tag| checklist.contains(tag));
        let dropped = before - draft.selected().len();
        if dropped > 0 {
            tracing::debug!(
                "dropped {} selections not on the '{}' checklist",
                dropped,
                draft.category()
            );
        }
        Ok(draft)
    }

    /// Writes the collections that differ from the current state, then adopts `next`.
    fn commit(&mut self, next: MatcherState) -> CoreResult<()> {
        let changes = next.changes_from(&self.state);
        let mut writes = Vec::new();

        if changes.trials {
            writes.push((TRIALS_KEY, Some(store::to_json(TRIALS_KEY, next.trials())?)));
        }
        if changes.patients {
            writes.push((PATIENTS_KEY, Some(store::to_json(PATIENTS_KEY, next.patients())?)));
        }
        if changes.selected_patient {
            let selected = next
                .selected_patient()
                .map(|patient| store::to_json(SELECTED_PATIENT_KEY, patient))
                .transpose()?;
            writes.push((SELECTED_PATIENT_KEY, selected));
        }

        self.write_keys(writes)?;
        self.state = next;
        Ok(())
    }

    /// Applies `writes` in order; `None` removes the key.
    ///
    /// If any write fails, the keys written before it are put back to their previous values
    /// and the original error is returned.
    fn write_keys(&mut self, writes: Vec<(&'static str, Option<String>)>) -> CoreResult<()> {
        let mut undo: Vec<(&'static str, Option<String>)> = Vec::with_capacity(writes.len());

        for (key, value) in writes {
            let result = self.store.get(key).and_then(|previous| {
                match &value {
                    Some(raw) => self.store.set(key, raw)?,
                    None => self.store.remove(key)?,
                }
                undo.push((key, previous));
                Ok(())
            });

            if let Err(e) = result {
                self.restore(undo);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn restore(&mut self, undo: Vec<(&'static str, Option<String>)>) {
        for (key, previous) in undo.into_iter().rev() {
            let result = match &previous {
                Some(raw) => self.store.set(key, raw),
                None => self.store.remove(key),
            };
            if let Err(e) = result {
                tracing::error!("failed to restore {} after a failed write: {}", key, e);
            }
        }
    }
}
