//! Write-path validation for pet field sets.
//!
//! # Responsibility
//! - Check a proposed `ContentValues` against the pet schema before any
//!   storage mutation.
//! - Normalize accepted values to the storage scalar types.
//!
//! # Invariants
//! - Validation is pure: no I/O, no storage access.
//! - Create mode requires `name` and `gender`; update mode checks only the
//!   columns that are present.
//! - `_id` is never writable and unknown columns are rejected.

use crate::model::pet::{
    is_known_column, Gender, COLUMN_BREED, COLUMN_GENDER, COLUMN_ID, COLUMN_NAME,
    COLUMN_WEIGHT,
};
use crate::model::values::{ContentValues, FieldValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which write operation the field set is proposed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Rejection reason naming the offending column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(String),
    InvalidValue(String),
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField(field) | Self::InvalidValue(field) => field.as_str(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "pet requires field `{field}`"),
            Self::InvalidValue(field) => write!(f, "pet field `{field}` has an invalid value"),
        }
    }
}

impl Error for ValidationError {}

/// Field set that passed validation for one mode.
///
/// Only `validate_pet_values` constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedValues {
    mode: ValidationMode,
    values: ContentValues,
}

impl ValidatedValues {
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn values(&self) -> &ContentValues {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validates `values` for `mode` and returns the normalized field set.
///
/// # Errors
/// - `MissingField` when create mode lacks `name` or `gender`.
/// - `InvalidValue` for a blank/null name, a gender outside {0,1,2}, a
///   negative weight, a non-text breed, any `_id`, or an unknown column.
pub fn validate_pet_values(
    values: &ContentValues,
    mode: ValidationMode,
) -> Result<ValidatedValues, ValidationError> {
    let mut normalized = ContentValues::new();

    match values.get(COLUMN_NAME) {
        Some(value) => {
            normalized.put(COLUMN_NAME, check_name(value)?);
        }
        None if mode == ValidationMode::Create => return Err(missing(COLUMN_NAME)),
        None => {}
    }

    match values.get(COLUMN_GENDER) {
        Some(value) => {
            normalized.put(COLUMN_GENDER, check_gender(value)?.as_i64());
        }
        None if mode == ValidationMode::Create => return Err(missing(COLUMN_GENDER)),
        None => {}
    }

    if let Some(value) = values.get(COLUMN_WEIGHT) {
        match (value, mode) {
            // Column default (0) applies when a new pet carries no weight.
            (FieldValue::Null, ValidationMode::Create) => {}
            _ => {
                normalized.put(COLUMN_WEIGHT, check_weight(value)?);
            }
        }
    }

    if let Some(value) = values.get(COLUMN_BREED) {
        normalized.put(COLUMN_BREED, check_breed(value)?);
    }

    if values.contains_key(COLUMN_ID) {
        return Err(invalid(COLUMN_ID));
    }
    if let Some(column) = values.columns().find(|column| !is_known_column(column)) {
        return Err(invalid(column));
    }

    Ok(ValidatedValues {
        mode,
        values: normalized,
    })
}

fn check_name(value: &FieldValue) -> Result<FieldValue, ValidationError> {
    match value.as_str() {
        Some(name) if !name.trim().is_empty() => Ok(value.clone()),
        _ => Err(invalid(COLUMN_NAME)),
    }
}

fn check_gender(value: &FieldValue) -> Result<Gender, ValidationError> {
    value
        .as_i64()
        .and_then(Gender::from_i64)
        .ok_or_else(|| invalid(COLUMN_GENDER))
}

fn check_weight(value: &FieldValue) -> Result<i64, ValidationError> {
    match value.as_i64() {
        Some(weight) if weight >= 0 => Ok(weight),
        _ => Err(invalid(COLUMN_WEIGHT)),
    }
}

fn check_breed(value: &FieldValue) -> Result<FieldValue, ValidationError> {
    match value {
        FieldValue::Null | FieldValue::Text(_) => Ok(value.clone()),
        FieldValue::Integer(_) => Err(invalid(COLUMN_BREED)),
    }
}

fn missing(column: &str) -> ValidationError {
    ValidationError::MissingField(column.to_string())
}

fn invalid(column: &str) -> ValidationError {
    ValidationError::InvalidValue(column.to_string())
}
