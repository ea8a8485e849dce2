//! Core data-access layer for the pet shelter store.
//! Routing, validation, storage dispatch and change signals live here.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod uri;

pub use config::{ConfigError, ConfigResult, DatabaseLocation, PetsConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::pet::{Gender, Pet};
pub use model::validation::{validate_pet_values, ValidationError, ValidationMode};
pub use model::values::{ContentValues, FieldValue};
pub use notify::notifier::{ChangeNotifier, ChangeObserver, ChannelObserver, ObserverId};
pub use repo::selection::{Comparison, Direction, Projection, Selection, SortOrder};
pub use repo::storage::{RowSet, SqliteStorage, StorageEngine, StorageError, StorageResult};
pub use service::cursor::{Cursor, CursorError};
pub use service::live_query::LiveQuery;
pub use service::pet_provider::{
    ContentProvider, PetProvider, ProviderError, ProviderResult, ResourceKind,
};
pub use uri::content_uri::{ContentUri, UriParseError};
pub use uri::router::{PetRoute, PetRouter};

