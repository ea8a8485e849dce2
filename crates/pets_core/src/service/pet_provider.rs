//! Pet access layer: identifier-addressed CRUD over the storage engine.
//!
//! # Responsibility
//! - Route each request by identifier, validate writes, execute the storage
//!   call and signal observers.
//! - Be the only component that maps identifiers to storage rows.
//!
//! # Invariants
//! - Validation and routing run before any storage call and never block.
//! - No state survives between calls; each call is one storage statement.
//! - Change signals are issued after the storage call returned, so no
//!   storage lock is held while observers are scheduled.
//! - Insert and non-empty update signal only when rows changed. Deleting
//!   through the collection identifier signals unconditionally; deleting
//!   through an item identifier signals only when a row was removed.

use crate::model::pet::{is_known_column, ALL_COLUMNS, CONTENT_AUTHORITY, TABLE_NAME};
use crate::model::validation::{validate_pet_values, ValidationError, ValidationMode};
use crate::model::values::ContentValues;
use crate::notify::notifier::ChangeNotifier;
use crate::repo::selection::{Projection, Selection, SortOrder};
use crate::repo::storage::{StorageEngine, StorageError};
use crate::service::cursor::Cursor;
use crate::uri::content_uri::{ContentUri, UriParseError};
use crate::uri::router::{PetRoute, PetRouter};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Caller-facing error surface of the access layer.
#[derive(Debug)]
pub enum ProviderError {
    /// Identifier is not served, or the operation is not legal for it.
    UnsupportedResource(String),
    MissingField(String),
    InvalidValue(String),
    /// Storage engine failed; surfaced without retry.
    StorageFailure(StorageError),
}

impl ProviderError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::InvalidValue(_))
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedResource(uri) => write!(f, "unsupported resource: {uri}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidValue(field) => write!(f, "invalid value for field `{field}`"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ProviderError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::MissingField(field) => Self::MissingField(field),
            ValidationError::InvalidValue(field) => Self::InvalidValue(field),
        }
    }
}

impl From<StorageError> for ProviderError {
    fn from(value: StorageError) -> Self {
        Self::StorageFailure(value)
    }
}

impl From<UriParseError> for ProviderError {
    fn from(value: UriParseError) -> Self {
        Self::UnsupportedResource(value.0)
    }
}

/// Identifier classification for resolution callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    Item,
}

/// Identifier-addressed data access contract.
pub trait ContentProvider {
    fn query(
        &self,
        uri: &ContentUri,
        projection: &Projection,
        selection: &Selection,
        order: &SortOrder,
    ) -> ProviderResult<Cursor>;

    /// Inserts one row through a collection identifier and returns the new
    /// item identifier.
    fn insert(&self, uri: &ContentUri, values: &ContentValues) -> ProviderResult<ContentUri>;

    fn update(
        &self,
        uri: &ContentUri,
        values: &ContentValues,
        selection: &Selection,
    ) -> ProviderResult<usize>;

    fn delete(&self, uri: &ContentUri, selection: &Selection) -> ProviderResult<usize>;

    fn resource_kind(&self, uri: &ContentUri) -> ProviderResult<ResourceKind>;

    /// MIME-equivalent type tag of `uri`.
    fn get_type(&self, uri: &ContentUri) -> ProviderResult<String>;
}

/// Access layer for the pets table.
pub struct PetProvider<S: StorageEngine> {
    router: PetRouter,
    storage: S,
    notifier: Arc<ChangeNotifier>,
}

impl<S: StorageEngine> PetProvider<S> {
    pub fn new(authority: impl Into<String>, storage: S, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            router: PetRouter::new(authority),
            storage,
            notifier,
        }
    }

    /// Provider on the default authority, signalling through the
    /// process-wide notifier.
    pub fn with_defaults(storage: S) -> Self {
        Self::new(CONTENT_AUTHORITY, storage, ChangeNotifier::shared())
    }

    pub fn router(&self) -> &PetRouter {
        &self.router
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Identifier of the pet collection on this provider's authority.
    pub fn collection_uri(&self) -> ContentUri {
        self.router.collection_uri()
    }

    fn route(&self, uri: &ContentUri, operation: &str) -> ProviderResult<PetRoute> {
        self.router.classify(uri).ok_or_else(|| {
            warn!(
                "event=pet_{} module=provider status=error error_code=unsupported_resource uri={}",
                operation, uri
            );
            ProviderError::UnsupportedResource(uri.to_string())
        })
    }

    /// Routes `uri` and derives the effective row filter: an item
    /// identifier pins `_id` to its key.
    fn target(
        &self,
        uri: &ContentUri,
        operation: &str,
        selection: &Selection,
    ) -> ProviderResult<(PetRoute, Selection)> {
        let route = self.route(uri, operation)?;
        let selection = match route {
            PetRoute::Pets => selection.clone(),
            PetRoute::PetId(id) => selection.clone().with_id(id),
        };
        Ok((route, selection))
    }

    fn storage_failure(
        &self,
        operation: &str,
        uri: &ContentUri,
        err: StorageError,
    ) -> ProviderError {
        error!(
            "event=pet_{} module=provider status=error error_code=storage_failure uri={} error={}",
            operation, uri, err
        );
        ProviderError::StorageFailure(err)
    }
}

impl<S: StorageEngine> ContentProvider for PetProvider<S> {
    fn query(
        &self,
        uri: &ContentUri,
        projection: &Projection,
        selection: &Selection,
        order: &SortOrder,
    ) -> ProviderResult<Cursor> {
        let (_, selection) = self.target(uri, "query", selection)?;
        let columns = projection.resolve(ALL_COLUMNS);
        check_columns(columns.iter().copied())?;
        check_columns(selection.columns())?;
        check_columns(order.columns())?;

        let (where_sql, args) = selection.to_sql();
        let order_sql = order.to_sql();
        let rows = self
            .storage
            .query_rows(
                TABLE_NAME,
                &columns,
                where_sql.as_deref(),
                &args,
                order_sql.as_deref(),
            )
            .map_err(|err| self.storage_failure("query", uri, err))?;

        debug!(
            "event=pet_query module=provider status=ok uri={} rows={}",
            uri,
            rows.rows.len()
        );
        Ok(Cursor::new(uri.clone(), rows))
    }

    fn insert(&self, uri: &ContentUri, values: &ContentValues) -> ProviderResult<ContentUri> {
        match self.route(uri, "insert")? {
            PetRoute::Pets => {}
            PetRoute::PetId(_) => {
                warn!(
                    "event=pet_insert module=provider status=error error_code=unsupported_resource uri={}",
                    uri
                );
                return Err(ProviderError::UnsupportedResource(uri.to_string()));
            }
        }

        let validated = validate_pet_values(values, ValidationMode::Create).map_err(|err| {
            warn!(
                "event=pet_insert module=provider status=rejected error_code=validation field={}",
                err.field()
            );
            err
        })?;

        let id = self
            .storage
            .insert_row(TABLE_NAME, validated.values())
            .map_err(|err| self.storage_failure("insert", uri, err))?;

        let item_uri = uri.with_appended_id(id);
        self.notifier.notify(uri);
        info!("event=pet_insert module=provider status=ok uri={uri} id={id}");
        Ok(item_uri)
    }

    fn update(
        &self,
        uri: &ContentUri,
        values: &ContentValues,
        selection: &Selection,
    ) -> ProviderResult<usize> {
        let (_, selection) = self.target(uri, "update", selection)?;

        let validated = validate_pet_values(values, ValidationMode::Update).map_err(|err| {
            warn!(
                "event=pet_update module=provider status=rejected error_code=validation field={}",
                err.field()
            );
            err
        })?;
        if validated.is_empty() {
            debug!("event=pet_update module=provider status=skipped reason=empty_values uri={uri}");
            return Ok(0);
        }
        check_columns(selection.columns())?;

        let (where_sql, args) = selection.to_sql();
        let updated = self
            .storage
            .update_rows(TABLE_NAME, validated.values(), where_sql.as_deref(), &args)
            .map_err(|err| self.storage_failure("update", uri, err))?;

        if updated > 0 {
            self.notifier.notify(uri);
        }
        info!(
            "event=pet_update module=provider status=ok uri={} rows={}",
            uri, updated
        );
        Ok(updated)
    }

    fn delete(&self, uri: &ContentUri, selection: &Selection) -> ProviderResult<usize> {
        let (route, selection) = self.target(uri, "delete", selection)?;
        check_columns(selection.columns())?;

        let (where_sql, args) = selection.to_sql();
        let deleted = self
            .storage
            .delete_rows(TABLE_NAME, where_sql.as_deref(), &args)
            .map_err(|err| self.storage_failure("delete", uri, err))?;

        match route {
            PetRoute::Pets => {
                self.notifier.notify(uri);
            }
            PetRoute::PetId(_) if deleted > 0 => {
                self.notifier.notify(uri);
            }
            PetRoute::PetId(_) => {}
        }
        info!(
            "event=pet_delete module=provider status=ok uri={} rows={}",
            uri, deleted
        );
        Ok(deleted)
    }

    fn resource_kind(&self, uri: &ContentUri) -> ProviderResult<ResourceKind> {
        Ok(match self.route(uri, "get_type")? {
            PetRoute::Pets => ResourceKind::Collection,
            PetRoute::PetId(_) => ResourceKind::Item,
        })
    }

    fn get_type(&self, uri: &ContentUri) -> ProviderResult<String> {
        let route = self.route(uri, "get_type")?;
        Ok(self.router.content_type(route))
    }
}

fn check_columns<'a>(mut columns: impl Iterator<Item = &'a str>) -> ProviderResult<()> {
    match columns.find(|column| !is_known_column(column)) {
        Some(column) => Err(ProviderError::InvalidValue(column.to_string())),
        None => Ok(()),
    }
}
