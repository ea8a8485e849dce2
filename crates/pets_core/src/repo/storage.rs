//! Storage engine contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the synchronous query/insert/update/delete contract the access
//!   layer issues against durable storage.
//! - Keep SQL statement assembly and row decoding inside this boundary.
//!
//! # Invariants
//! - Each call holds the connection lock only for its own statement.
//! - `insert_row` returns the key assigned to the row it just inserted.
//! - Column and table names reaching this layer were checked by callers;
//!   they are still quoted when spliced into statements.
//! - `SqliteStorage` runs every call, reads included, on one connection
//!   behind one lock, so concurrent queries execute one after another.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::values::{ContentValues, FieldValue};
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type StorageResult<T> = Result<T, StorageError>;

/// Engine-level failure surfaced to callers as a storage failure.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    LockPoisoned,
    InsertRejected(String),
    UnsupportedValue { column: String },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "storage connection lock poisoned"),
            Self::InsertRejected(table) => write!(f, "storage rejected insert into `{table}`"),
            Self::UnsupportedValue { column } => {
                write!(f, "unsupported stored value type in column `{column}`")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Materialized query result: column names plus row values in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

/// Durable table storage used by the access layer.
///
/// Implementations serialize writers themselves and guarantee distinct keys
/// for concurrent inserts.
pub trait StorageEngine: Send + Sync {
    fn query_rows(
        &self,
        table: &str,
        projection: &[&str],
        selection: Option<&str>,
        selection_args: &[FieldValue],
        order_by: Option<&str>,
    ) -> StorageResult<RowSet>;

    fn insert_row(&self, table: &str, values: &ContentValues) -> StorageResult<i64>;

    fn update_rows(
        &self,
        table: &str,
        values: &ContentValues,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize>;

    fn delete_rows(
        &self,
        table: &str,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize>;
}

impl<S: StorageEngine + ?Sized> StorageEngine for Arc<S> {
    fn query_rows(
        &self,
        table: &str,
        projection: &[&str],
        selection: Option<&str>,
        selection_args: &[FieldValue],
        order_by: Option<&str>,
    ) -> StorageResult<RowSet> {
        (**self).query_rows(table, projection, selection, selection_args, order_by)
    }

    fn insert_row(&self, table: &str, values: &ContentValues) -> StorageResult<i64> {
        (**self).insert_row(table, values)
    }

    fn update_rows(
        &self,
        table: &str,
        values: &ContentValues,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        (**self).update_rows(table, values, selection, selection_args)
    }

    fn delete_rows(
        &self,
        table: &str,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        (**self).delete_rows(table, selection, selection_args)
    }
}

/// SQLite-backed storage engine sharing one migrated connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl StorageEngine for SqliteStorage {
    fn query_rows(
        &self,
        table: &str,
        projection: &[&str],
        selection: Option<&str>,
        selection_args: &[FieldValue],
        order_by: Option<&str>,
    ) -> StorageResult<RowSet> {
        let columns = projection
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(table));
        push_where(&mut sql, selection);
        if let Some(order_by) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        debug!("event=storage_query module=storage status=start table={table}");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(selection_args.iter()))?;
        let mut result = RowSet {
            columns: projection.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        };

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(projection.len());
            for (index, column) in projection.iter().enumerate() {
                values.push(decode_value(row.get_ref(index)?, column)?);
            }
            result.rows.push(values);
        }

        Ok(result)
    }

    fn insert_row(&self, table: &str, values: &ContentValues) -> StorageResult<i64> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table))
        } else {
            let columns = values
                .columns()
                .map(quote_identifier)
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; values.len()].join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                quote_identifier(table)
            )
        };

        let conn = self.lock()?;
        let inserted = conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        if inserted != 1 {
            return Err(StorageError::InsertRejected(table.to_string()));
        }
        Ok(conn.last_insert_rowid())
    }

    fn update_rows(
        &self,
        table: &str,
        values: &ContentValues,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        let assignments = values
            .columns()
            .map(|column| format!("{} = ?", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {assignments}", quote_identifier(table));
        push_where(&mut sql, selection);

        let args = values
            .iter()
            .map(|(_, value)| value)
            .chain(selection_args.iter());
        let conn = self.lock()?;
        Ok(conn.execute(&sql, params_from_iter(args))?)
    }

    fn delete_rows(
        &self,
        table: &str,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        let mut sql = format!("DELETE FROM {}", quote_identifier(table));
        push_where(&mut sql, selection);

        let conn = self.lock()?;
        Ok(conn.execute(&sql, params_from_iter(selection_args.iter()))?)
    }
}

fn push_where(sql: &mut String, selection: Option<&str>) {
    if let Some(selection) = selection.filter(|s| !s.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(selection);
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decode_value(value: ValueRef<'_>, column: &str) -> StorageResult<FieldValue> {
    match value {
        ValueRef::Null => Ok(FieldValue::Null),
        ValueRef::Integer(value) => Ok(FieldValue::Integer(value)),
        ValueRef::Text(bytes) => Ok(FieldValue::Text(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
        ValueRef::Real(_) | ValueRef::Blob(_) => Err(StorageError::UnsupportedValue {
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{quote_identifier, SqliteStorage, StorageEngine};
    use crate::model::values::{ContentValues, FieldValue};

    const ALL: &[&str] = &["_id", "name", "breed", "gender", "weight"];

    fn pet(name: &str, gender: i64) -> ContentValues {
        ContentValues::new().with("name", name).with("gender", gender)
    }

    #[test]
    fn insert_returns_distinct_increasing_keys() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let first = storage.insert_row("pets", &pet("Toto", 1)).unwrap();
        let second = storage.insert_row("pets", &pet("Rex", 0)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn query_applies_selection_and_order() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert_row("pets", &pet("Toto", 1)).unwrap();
        storage.insert_row("pets", &pet("Alba", 2)).unwrap();
        storage.insert_row("pets", &pet("Rex", 1)).unwrap();

        let rows = storage
            .query_rows(
                "pets",
                &["name"],
                Some("gender = ?"),
                &[FieldValue::Integer(1)],
                Some("name ASC"),
            )
            .unwrap();
        assert_eq!(rows.columns, vec!["name".to_string()]);
        assert_eq!(
            rows.rows,
            vec![vec![FieldValue::from("Rex")], vec![FieldValue::from("Toto")]]
        );
    }

    #[test]
    fn missing_weight_takes_column_default() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let id = storage.insert_row("pets", &pet("Toto", 1)).unwrap();
        let rows = storage
            .query_rows("pets", ALL, Some("_id = ?"), &[FieldValue::Integer(id)], None)
            .unwrap();
        assert_eq!(rows.rows[0][2], FieldValue::Null);
        assert_eq!(rows.rows[0][4], FieldValue::Integer(0));
    }

    #[test]
    fn update_and_delete_report_affected_counts() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert_row("pets", &pet("Toto", 1)).unwrap();
        storage.insert_row("pets", &pet("Rex", 1)).unwrap();

        let changes = ContentValues::new().with("weight", 9);
        assert_eq!(storage.update_rows("pets", &changes, None, &[]).unwrap(), 2);
        assert_eq!(
            storage
                .delete_rows("pets", Some("name = ?"), &[FieldValue::from("Rex")])
                .unwrap(),
            1
        );
        assert_eq!(storage.delete_rows("pets", None, &[]).unwrap(), 1);
        assert_eq!(storage.delete_rows("pets", None, &[]).unwrap(), 0);
    }

    #[test]
    fn constraint_violation_is_reported_as_error() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let no_gender = ContentValues::new().with("name", "Toto");
        assert!(storage.insert_row("pets", &no_gender).is_err());
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("pets"), "\"pets\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
