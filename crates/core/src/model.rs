//! Trial, criterion and patient records.
//!
//! Field names serialise in camelCase so the stored JSON matches the persisted layout
//! (`inclusionCriteria`, `selectedCategory`, ...).

use ctm_uuid::EntityId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a criterion must hold (inclusion) or must not hold (exclusion).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    Inclusion,
    Exclusion,
}

impl CriterionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CriterionKind::Inclusion => "inclusion",
            CriterionKind::Exclusion => "exclusion",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriterionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inclusion" => Ok(CriterionKind::Inclusion),
            "exclusion" => Ok(CriterionKind::Exclusion),
            other => Err(format!(
                "unknown criterion type '{}' (expected 'inclusion' or 'exclusion')",
                other
            )),
        }
    }
}

/// A single inclusion or exclusion condition attached to a trial.
///
/// The description is the identity used for matching and deduplication; the id is only used
/// for display and for removing a criterion while editing a trial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: CriterionKind,
    pub description: String,
}

impl Criterion {
    /// The selection key a patient uses to mark this criterion.
    pub fn tag(&self) -> CriterionTag {
        CriterionTag::new(self.kind, self.description.clone())
    }
}

/// A patient's selection of one criterion: the `(kind, description)` pair.
///
/// Serialises as `{"type": "...", "description": "..."}`. The older composite string form
/// (`"inclusion-Age over 18"`) is still accepted when reading stored data, and is what
/// `Display` renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CriterionTag {
    #[serde(rename = "type")]
    pub kind: CriterionKind,
    pub description: String,
}

impl CriterionTag {
    pub fn new(kind: CriterionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn inclusion(description: impl Into<String>) -> Self {
        Self::new(CriterionKind::Inclusion, description)
    }

    pub fn exclusion(description: impl Into<String>) -> Self {
        Self::new(CriterionKind::Exclusion, description)
    }

    /// Parses the composite `"<type>-<description>"` form.
    ///
    /// The type prefix is one of two fixed words, so the first `-` after it always ends the
    /// prefix even when the description itself contains `-`.
    pub fn parse_composite(input: &str) -> Option<Self> {
        [CriterionKind::Inclusion, CriterionKind::Exclusion]
            .into_iter()
            .find_map(|kind| {
                input
                    .strip_prefix(kind.as_str())
                    .and_then(|rest| rest.strip_prefix('-'))
                    .map(|description| Self::new(kind, description))
            })
    }
}

impl fmt::Display for CriterionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.description)
    }
}

impl<'de> Deserialize<'de> for CriterionTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TagRepr {
            Composite(String),
            Structured {
                #[serde(rename = "type")]
                kind: CriterionKind,
                description: String,
            },
        }

        match TagRepr::deserialize(deserializer)? {
            TagRepr::Structured { kind, description } => Ok(Self { kind, description }),
            TagRepr::Composite(raw) => Self::parse_composite(&raw).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "criterion tag '{}' must start with 'inclusion-' or 'exclusion-'",
                    raw
                ))
            }),
        }
    }
}

/// A clinical trial and its eligibility criteria.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTrial {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub inclusion_criteria: Vec<Criterion>,
    #[serde(default)]
    pub exclusion_criteria: Vec<Criterion>,
}

impl ClinicalTrial {
    /// All criteria, inclusion first, each list in its stored order.
    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.inclusion_criteria
            .iter()
            .chain(self.exclusion_criteria.iter())
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.category == category
    }
}

/// A patient and the criteria selected for them within one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: EntityId,
    pub name: String,
    pub selected_category: String,
    #[serde(default)]
    pub selected_criteria: Vec<CriterionTag>,
}

impl Patient {
    pub fn has_selected(&self, tag: &CriterionTag) -> bool {
        self.selected_criteria.contains(tag)
    }
}

/// Outcome of checking one patient against one trial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialEligibility {
    pub trial_id: EntityId,
    pub is_eligible: bool,
    /// One entry per unmet inclusion criterion and per met exclusion criterion.
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// One row of the cross-patient eligibility summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientReport {
    pub patient: Patient,
    pub eligible_trials: Vec<ClinicalTrial>,
}
