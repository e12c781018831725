//! Input validation.
//!
//! Trial and patient submissions pass through draft types before they can reach the state.
//! A draft that fails validation is rejected as a whole; nothing is partially applied.

use crate::constants::MAX_STORE_KEY_LEN;
use crate::model::{CriterionKind, CriterionTag};
use crate::store::StoreError;
use crate::text::NonEmptyText;
use crate::{CoreError, CoreResult};

/// Validates that a storage key is safe to use as a file name.
///
/// Keys are restricted to ASCII alphanumerics, `-` and `_`, so a key can never address a path
/// outside the store directory.
pub fn validate_store_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".into()));
    }

    if key.len() > MAX_STORE_KEY_LEN {
        return Err(StoreError::InvalidKey(format!(
            "key exceeds maximum length of {} characters",
            MAX_STORE_KEY_LEN
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(StoreError::InvalidKey(format!(
            "'{}' contains invalid characters (only alphanumeric, '-', '_' allowed)",
            key
        )));
    }

    Ok(())
}

/// A validated trial submission, used for both create and edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialDraft {
    name: NonEmptyText,
    description: String,
    category: NonEmptyText,
    inclusion: Vec<NonEmptyText>,
    exclusion: Vec<NonEmptyText>,
}

impl TrialDraft {
    /// Validates a trial submission.
    ///
    /// All text is trimmed and blank criterion descriptions are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if:
    /// - the name or category is blank,
    /// - no criterion remains after dropping blank descriptions.
    pub fn new(
        name: &str,
        description: &str,
        category: &str,
        inclusion: &[String],
        exclusion: &[String],
    ) -> CoreResult<Self> {
        let name = NonEmptyText::new("trial name", name)?;
        let category = NonEmptyText::new("category", category)?;
        let inclusion: Vec<NonEmptyText> =
            inclusion.iter().filter_map(NonEmptyText::non_blank).collect();
        let exclusion: Vec<NonEmptyText> =
            exclusion.iter().filter_map(NonEmptyText::non_blank).collect();

        if inclusion.is_empty() && exclusion.is_empty() {
            return Err(CoreError::InvalidInput(
                "a trial needs at least one inclusion or exclusion criterion".into(),
            ));
        }

        Ok(Self {
            name,
            description: description.trim().to_string(),
            category,
            inclusion,
            exclusion,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Criterion descriptions of `kind`, in submission order.
    pub fn criteria(&self, kind: CriterionKind) -> impl Iterator<Item = &str> {
        let list = match kind {
            CriterionKind::Inclusion => &self.inclusion,
            CriterionKind::Exclusion => &self.exclusion,
        };
        list.iter().map(NonEmptyText::as_str)
    }
}

/// A validated patient submission, used for both create and edit.
///
/// Selections are category-scoped: moving the draft to another category clears them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientDraft {
    name: NonEmptyText,
    category: NonEmptyText,
    selected: Vec<CriterionTag>,
}

impl PatientDraft {
    /// Validates a patient submission. Duplicate selections are collapsed, first one kept.
    pub fn new(name: &str, category: &str, selected: Vec<CriterionTag>) -> CoreResult<Self> {
        let mut draft = Self {
            name: NonEmptyText::new("patient name", name)?,
            category: NonEmptyText::new("category", category)?,
            selected: Vec::with_capacity(selected.len()),
        };
        for tag in selected {
            draft.select(tag);
        }
        Ok(draft)
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    pub fn selected(&self) -> &[CriterionTag] {
        &self.selected
    }

    /// Moves the draft to `category`. Selections are cleared if the category changes.
    pub fn with_category(mut self, category: &str) -> CoreResult<Self> {
        let category = NonEmptyText::new("category", category)?;
        if category != self.category {
            self.selected.clear();
            self.category = category;
        }
        Ok(self)
    }

    /// Adds `tag` unless it is already selected.
    pub fn select(&mut self, tag: CriterionTag) {
        if !self.selected.contains(&tag) {
            self.selected.push(tag);
        }
    }

    /// Keeps only selections for which `visible` returns true.
    pub(crate) fn retain_selected(&mut self, mut visible: impl FnMut(&CriterionTag) -> bool) {
        self.selected.retain(|tag| visible(tag));
    }
}
