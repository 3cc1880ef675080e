//! Field-level validation of pages and parts.
//!
//! Failures are collected into [`ValidationErrors`], a list of
//! `(field, message)` pairs, instead of stopping at the first one.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use trellis_storage::PartRecord;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?:[-_.A-Za-z0-9]*|/)\z").unwrap());

pub(crate) const TITLE_MAX: usize = 255;
pub(crate) const SLUG_MAX: usize = 100;
pub(crate) const BREADCRUMB_MAX: usize = 160;
pub(crate) const PART_NAME_MAX: usize = 100;
pub(crate) const FILTER_ID_MAX: usize = 25;

/// Whether `slug` has an acceptable shape: empty, `/`, or only letters,
/// digits, `-`, `_` and `.`.
///
/// This is the format rule alone; a page additionally requires a non-empty
/// slug.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// One failed check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All failed checks for a record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Prefix every field with `scope` (e.g. `parts[0].name`).
    pub(crate) fn merge_scoped(&mut self, scope: &str, other: Self) {
        for error in other.errors {
            self.add(format!("{scope}.{}", error.field), error.message);
        }
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Presence and maximum length of a required string field.
pub(crate) fn check_required(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    }
    check_length(errors, field, value, max);
}

pub(crate) fn check_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("is too long (maximum is {max} characters)"));
    }
}

/// Validate a part on its own.
#[must_use]
pub fn validate_part(part: &PartRecord) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &part.name, PART_NAME_MAX);
    if let Some(filter_id) = &part.filter_id {
        check_length(&mut errors, "filter_id", filter_id, FILTER_ID_MAX);
    }
    errors
}
