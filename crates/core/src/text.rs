//! Validated free-text values used by trial and patient drafts.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// A trimmed string that contains at least one non-whitespace character.
///
/// Form submissions trim names, categories and criterion descriptions before they reach the
/// state, so two categories that differ only by surrounding whitespace are the same category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input` and rejects it if nothing is left.
    ///
    /// `field` names the value in the error message (for example `"trial name"`).
    pub fn new(field: &'static str, input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty { field });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`] but returns `None` for blank input.
    pub fn non_blank(input: impl AsRef<str>) -> Option<Self> {
        let trimmed = input.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
