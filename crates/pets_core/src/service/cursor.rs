//! Query result snapshots.
//!
//! # Responsibility
//! - Hold the rows a query returned together with the identifier the query
//!   was issued against.
//! - Offer typed column access and conversion into `Pet` read models.
//!
//! # Invariants
//! - A cursor is an immutable snapshot; it never refreshes itself. Callers
//!   observe `notification_uri` and re-query.

use crate::model::pet::{
    Gender, Pet, COLUMN_BREED, COLUMN_GENDER, COLUMN_ID, COLUMN_NAME, COLUMN_WEIGHT,
};
use crate::model::values::FieldValue;
use crate::repo::storage::RowSet;
use crate::uri::content_uri::ContentUri;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure converting cursor rows into typed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    MissingColumn(String),
    InvalidData(String),
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(column) => write!(f, "cursor has no column `{column}`"),
            Self::InvalidData(message) => write!(f, "invalid pet row data: {message}"),
        }
    }
}

impl Error for CursorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    notification_uri: ContentUri,
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl Cursor {
    pub(crate) fn new(notification_uri: ContentUri, row_set: RowSet) -> Self {
        Self {
            notification_uri,
            columns: row_set.columns,
            rows: row_set.rows,
        }
    }

    /// Identifier whose change signals invalidate this snapshot.
    pub fn notification_uri(&self) -> &ContentUri {
        &self.notification_uri
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn get_i64(&self, row: usize, column: &str) -> Option<i64> {
        match self.get(row, column)? {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_str(&self, row: usize, column: &str) -> Option<&str> {
        self.get(row, column)?.as_str()
    }

    /// Decodes every row into a `Pet`.
    ///
    /// # Errors
    /// - `MissingColumn` when the projection lacked a pet column.
    /// - `InvalidData` when a stored value breaks the pet schema.
    pub fn to_pets(&self) -> Result<Vec<Pet>, CursorError> {
        let index = |column: &str| {
            self.column_index(column)
                .ok_or_else(|| CursorError::MissingColumn(column.to_string()))
        };
        let id_at = index(COLUMN_ID)?;
        let name_at = index(COLUMN_NAME)?;
        let breed_at = index(COLUMN_BREED)?;
        let gender_at = index(COLUMN_GENDER)?;
        let weight_at = index(COLUMN_WEIGHT)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let cell = move |at: usize| {
                    row.get(at).ok_or_else(|| {
                        CursorError::InvalidData(format!(
                            "row {row_index} has {} values for {} columns",
                            row.len(),
                            self.columns.len()
                        ))
                    })
                };
                let id = integer(cell(id_at)?, COLUMN_ID)?;
                let name = match cell(name_at)? {
                    FieldValue::Text(name) => name.clone(),
                    other => return Err(invalid(COLUMN_NAME, other)),
                };
                let breed = match cell(breed_at)? {
                    FieldValue::Null => None,
                    FieldValue::Text(breed) => Some(breed.clone()),
                    other => return Err(invalid(COLUMN_BREED, other)),
                };
                let gender_value = cell(gender_at)?;
                let gender = Gender::from_i64(integer(gender_value, COLUMN_GENDER)?)
                    .ok_or_else(|| invalid(COLUMN_GENDER, gender_value))?;
                let weight = integer(cell(weight_at)?, COLUMN_WEIGHT)?;

                Ok(Pet {
                    id,
                    name,
                    breed,
                    gender,
                    weight,
                })
            })
            .collect()
    }
}

fn integer(value: &FieldValue, column: &str) -> Result<i64, CursorError> {
    match value {
        FieldValue::Integer(value) => Ok(*value),
        other => Err(invalid(column, other)),
    }
}

fn invalid(column: &str, value: &FieldValue) -> CursorError {
    CursorError::InvalidData(format!("value `{value}` in pets.{column}"))
}
