//! Cross-patient eligibility summary.

use crate::criteria::trials_in_category;
use crate::eligibility::is_eligible;
use crate::model::{ClinicalTrial, Patient, PatientReport};

/// Produces one row per patient, in patient order, listing the trials of the patient's
/// category that the patient is eligible for (in trial order).
///
/// Patients with no eligible trial still get a row with an empty list.
pub fn report(patients: &[Patient], trials: &[ClinicalTrial]) -> Vec<PatientReport> {
    patients
        .iter()
        .map(|patient| PatientReport {
            patient: patient.clone(),
            eligible_trials: trials_in_category(trials, &patient.selected_category)
                .filter(|trial| is_eligible(patient, trial))
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Criterion, CriterionKind, CriterionTag};
    use ctm_uuid::EntityId;

    fn trial(id: &str, category: &str, inclusion: &[&str]) -> ClinicalTrial {
        ClinicalTrial {
            id: EntityId::new(id).unwrap(),
            name: id.to_uppercase(),
            description: String::new(),
            category: category.into(),
            inclusion_criteria: inclusion
                .iter()
                .map(|d| Criterion {
                    id: EntityId::new(format!("{}-{}", id, d)).unwrap(),
                    kind: CriterionKind::Inclusion,
                    description: d.to_string(),
                })
                .collect(),
            exclusion_criteria: vec![],
        }
    }

    fn patient(id: &str, category: &str, selected: &[&str]) -> Patient {
        Patient {
            id: EntityId::new(id).unwrap(),
            name: id.to_uppercase(),
            selected_category: category.into(),
            selected_criteria: selected.iter().map(|d| CriterionTag::inclusion(*d)).collect(),
        }
    }

    fn trial_ids(row: &PatientReport) -> Vec<&str> {
        row.eligible_trials.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_report_with_no_trials_has_one_empty_row_per_patient() {
        let patients = vec![patient("p1", "A", &[]), patient("p2", "B", &["X"])];

        let rows = report(&patients, &[]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].patient.id.as_str(), "p1");
        assert_eq!(rows[1].patient.id.as_str(), "p2");
        assert!(rows.iter().all(|row| row.eligible_trials.is_empty()));
    }

    #[test]
    fn test_report_filters_by_category_and_eligibility_in_trial_order() {
        let trials = vec![
            trial("t1", "A", &["X"]),
            trial("t2", "B", &[]),
            trial("t3", "A", &[]),
            trial("t4", "A", &["Z"]),
        ];
        let patients = vec![patient("p1", "A", &["X"]), patient("p2", "B", &[])];

        let rows = report(&patients, &trials);

        assert_eq!(trial_ids(&rows[0]), vec!["t1", "t3"]);
        assert_eq!(trial_ids(&rows[1]), vec!["t2"]);
    }

    #[test]
    fn test_vacuous_trial_excluded_when_category_differs() {
        let trials = vec![trial("t1", "A", &[])];
        let patients = vec![patient("p1", "B", &[])];

        let rows = report(&patients, &trials);

        assert!(crate::eligibility::is_eligible(&patients[0], &trials[0]));
        assert!(rows[0].eligible_trials.is_empty());
    }

    #[test]
    fn test_report_with_no_patients_is_empty() {
        assert!(report(&[], &[trial("t1", "A", &[])]).is_empty());
    }
}
