//! Per-category criteria checklists.
//!
//! The patient intake checklist for a category is the union of the criteria of every trial in
//! that category, deduplicated by description.

use crate::model::{ClinicalTrial, Criterion};
use ctm_uuid::EntityId;
use std::collections::HashSet;

/// Builds the deduplicated checklist of criteria for `category`.
///
/// Trials are visited in collection order, and within each trial inclusion criteria come
/// before exclusion criteria. The first occurrence of a description wins: a later criterion
/// with the same description is skipped even when its type differs.
///
/// Each returned criterion carries the consistent id `"<type>-<description>"` of the kept
/// occurrence, so the same checklist entry has the same id no matter which trial supplied it.
///
/// An unknown category yields an empty checklist.
pub fn aggregate(trials: &[ClinicalTrial], category: &str) -> Vec<Criterion> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut checklist = Vec::new();

    for criterion in trials_in_category(trials, category).flat_map(ClinicalTrial::criteria) {
        if !seen.insert(criterion.description.as_str()) {
            continue;
        }

        let id =
            EntityId::new(criterion.tag().to_string()).unwrap_or_else(|_| criterion.id.clone());
        checklist.push(Criterion {
            id,
            kind: criterion.kind,
            description: criterion.description.clone(),
        });
    }

    checklist
}

/// Trials whose category equals `category`, in collection order.
pub fn trials_in_category<'a>(
    trials: &'a [ClinicalTrial],
    category: &'a str,
) -> impl Iterator<Item = &'a ClinicalTrial> + 'a {
    trials.iter().filter(move |trial| trial.in_category(category))
}

/// Distinct trial categories in order of first appearance.
pub fn categories(trials: &[ClinicalTrial]) -> Vec<String> {
    let mut seen = HashSet::new();
    trials
        .iter()
        .filter(|trial| seen.insert(trial.category.as_str()))
        .map(|trial| trial.category.clone())
        .collect()
}
