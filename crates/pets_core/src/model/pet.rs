//! Pet entity schema.
//!
//! # Responsibility
//! - Name the authority, path, table and columns of the pet store.
//! - Define the legal value set for `gender`.
//! - Provide the `Pet` read model built from cursor rows.
//!
//! # Invariants
//! - `_id` is assigned by the storage engine once and never rewritten.
//! - Persisted `gender` is always one of `Gender`'s discriminants.
//! - MIME-equivalent tags depend only on authority and path.
//!
//! # See also
//! - crate::model::validation

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Default content authority for the pet store.
pub const CONTENT_AUTHORITY: &str = "com.example.android.pets";
/// Scheme used when rendering identifiers.
pub const CONTENT_SCHEME: &str = "content";
/// Collection path appended to the authority.
pub const PATH_PETS: &str = "pets";
/// Storage table name.
pub const TABLE_NAME: &str = "pets";

pub const COLUMN_ID: &str = "_id";
pub const COLUMN_NAME: &str = "name";
pub const COLUMN_BREED: &str = "breed";
pub const COLUMN_GENDER: &str = "gender";
pub const COLUMN_WEIGHT: &str = "weight";

/// Full projection in table order.
pub const ALL_COLUMNS: &[&str] = &[
    COLUMN_ID,
    COLUMN_NAME,
    COLUMN_BREED,
    COLUMN_GENDER,
    COLUMN_WEIGHT,
];

const CURSOR_DIR_BASE_TYPE: &str = "vnd.android.cursor.dir";
const CURSOR_ITEM_BASE_TYPE: &str = "vnd.android.cursor.item";

/// Returns whether `column` belongs to the pets table.
pub fn is_known_column(column: &str) -> bool {
    ALL_COLUMNS.contains(&column)
}

/// MIME-equivalent tag for "list of pets" under `authority`.
pub fn content_list_type(authority: &str) -> String {
    format!("{CURSOR_DIR_BASE_TYPE}/{authority}/{PATH_PETS}")
}

/// MIME-equivalent tag for "single pet" under `authority`.
pub fn content_item_type(authority: &str) -> String {
    format!("{CURSOR_ITEM_BASE_TYPE}/{authority}/{PATH_PETS}")
}

/// Legal values of the `gender` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Unknown,
    Male,
    Female,
}

impl Gender {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Male => 1,
            Self::Female => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Male),
            2 => Some(Self::Female),
            _ => None,
        }
    }

    pub fn is_valid(value: i64) -> bool {
        Self::from_i64(value).is_some()
    }
}

impl TryFrom<i64> for Gender {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_i64(value).ok_or(value)
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Male => "male",
            Self::Female => "female",
        };
        f.write_str(label)
    }
}

/// One persisted pet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    pub breed: Option<String>,
    pub gender: Gender,
    pub weight: i64,
}
