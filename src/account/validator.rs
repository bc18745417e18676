//! Username checks done before any lookup.

use validator::ValidationError;

pub const MIN_NAME_LENGTH: usize = 3;

/// Validates the raw `name` query parameter.
#[derive(Debug, Clone, Copy)]
pub struct NameValidator {
    min_length: usize,
}

impl NameValidator {
    /// Create a new [`NameValidator`].
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Check a name and return it trimmed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the name is missing or shorter than the minimum
    /// length once trimmed. Length is counted in characters.
    pub fn validate(
        &self,
        raw: Option<&str>,
    ) -> Result<String, ValidationError> {
        let Some(raw) = raw else {
            return Err(ValidationError::new("required")
                .with_message("Name is required".into()));
        };

        let name = raw.trim();
        if name.chars().count() < self.min_length {
            return Err(ValidationError::new("length").with_message(
                format!(
                    "Name must be at least {} characters long",
                    self.min_length
                )
                .into(),
            ));
        }

        Ok(name.to_owned())
    }
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::new(MIN_NAME_LENGTH)
    }
}
