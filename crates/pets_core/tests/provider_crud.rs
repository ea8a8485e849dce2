use pets_core::db::DbError;
use pets_core::model::pet::{COLUMN_BREED, COLUMN_GENDER, COLUMN_ID, COLUMN_NAME, COLUMN_WEIGHT};
use pets_core::{
    ChangeNotifier, ChannelObserver, Comparison, ContentProvider, ContentUri, ContentValues,
    FieldValue, Gender, PetProvider, Projection, ProviderError, RowSet, Selection, SortOrder,
    SqliteStorage, StorageEngine, StorageError, StorageResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Storage double that records every call and can be switched to fail.
struct RecordingStorage {
    inner: SqliteStorage,
    calls: Mutex<Vec<&'static str>>,
    failing: AtomicBool,
}

impl RecordingStorage {
    fn new() -> Self {
        Self {
            inner: SqliteStorage::open_in_memory().unwrap(),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_next_calls(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: &'static str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Db(DbError::Sqlite(
                rusqlite::Error::InvalidQuery,
            )));
        }
        Ok(())
    }
}

impl StorageEngine for RecordingStorage {
    fn query_rows(
        &self,
        table: &str,
        projection: &[&str],
        selection: Option<&str>,
        selection_args: &[FieldValue],
        order_by: Option<&str>,
    ) -> StorageResult<RowSet> {
        self.record("query")?;
        self.inner
            .query_rows(table, projection, selection, selection_args, order_by)
    }

    fn insert_row(&self, table: &str, values: &ContentValues) -> StorageResult<i64> {
        self.record("insert")?;
        self.inner.insert_row(table, values)
    }

    fn update_rows(
        &self,
        table: &str,
        values: &ContentValues,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        self.record("update")?;
        self.inner
            .update_rows(table, values, selection, selection_args)
    }

    fn delete_rows(
        &self,
        table: &str,
        selection: Option<&str>,
        selection_args: &[FieldValue],
    ) -> StorageResult<usize> {
        self.record("delete")?;
        self.inner.delete_rows(table, selection, selection_args)
    }
}

fn provider() -> PetProvider<Arc<RecordingStorage>> {
    PetProvider::with_defaults(Arc::new(RecordingStorage::new()))
}

fn isolated_provider() -> PetProvider<Arc<RecordingStorage>> {
    PetProvider::new(
        "com.example.android.pets",
        Arc::new(RecordingStorage::new()),
        Arc::new(ChangeNotifier::new()),
    )
}

fn pet(name: &str, breed: Option<&str>, gender: Gender, weight: i64) -> ContentValues {
    ContentValues::new()
        .with(COLUMN_NAME, name)
        .with(COLUMN_BREED, breed)
        .with(COLUMN_GENDER, gender.as_i64())
        .with(COLUMN_WEIGHT, weight)
}

fn query_all<S: StorageEngine>(provider: &PetProvider<S>, uri: &ContentUri) -> pets_core::Cursor {
    provider
        .query(
            uri,
            &Projection::All,
            &Selection::all(),
            &SortOrder::asc(COLUMN_ID),
        )
        .unwrap()
}

#[test]
fn insert_then_query_item_returns_stored_row() {
    let provider = provider();
    let pets = provider.collection_uri();

    let item = provider
        .insert(&pets, &pet("Toto", Some("Terrier"), Gender::Male, 7))
        .unwrap();
    assert_eq!(item.to_string(), "content://com.example.android.pets/pets/1");

    let stored = query_all(&provider, &item).to_pets().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, 1);
    assert_eq!(stored[0].name, "Toto");
    assert_eq!(stored[0].breed.as_deref(), Some("Terrier"));
    assert_eq!(stored[0].gender, Gender::Male);
    assert_eq!(stored[0].weight, 7);
}

#[test]
fn insert_without_weight_or_breed_uses_defaults() {
    let provider = provider();
    let pets = provider.collection_uri();
    let values = ContentValues::new()
        .with(COLUMN_NAME, "Binx")
        .with(COLUMN_GENDER, 0);

    let item = provider.insert(&pets, &values).unwrap();
    let stored = query_all(&provider, &item).to_pets().unwrap();
    assert_eq!(stored[0].weight, 0);
    assert_eq!(stored[0].breed, None);
    assert_eq!(stored[0].gender, Gender::Unknown);
}

#[test]
fn insert_keys_are_distinct_and_increasing() {
    let provider = provider();
    let pets = provider.collection_uri();

    let first = provider
        .insert(&pets, &pet("A", None, Gender::Female, 1))
        .unwrap();
    let second = provider
        .insert(&pets, &pet("B", None, Gender::Female, 2))
        .unwrap();
    assert!(second.parse_id().unwrap() > first.parse_id().unwrap());
}

#[test]
fn rejected_writes_never_reach_storage() {
    let storage = Arc::new(RecordingStorage::new());
    let provider = PetProvider::with_defaults(Arc::clone(&storage));
    let pets = provider.collection_uri();

    let cases = [
        (
            ContentValues::new().with(COLUMN_GENDER, 1),
            ProviderError::MissingField(COLUMN_NAME.to_string()),
        ),
        (
            ContentValues::new().with(COLUMN_NAME, "Toto"),
            ProviderError::MissingField(COLUMN_GENDER.to_string()),
        ),
        (
            pet("Toto", None, Gender::Male, 0).with(COLUMN_GENDER, 7),
            ProviderError::InvalidValue(COLUMN_GENDER.to_string()),
        ),
        (
            pet("Toto", None, Gender::Male, -1),
            ProviderError::InvalidValue(COLUMN_WEIGHT.to_string()),
        ),
        (
            pet("  ", None, Gender::Male, 3),
            ProviderError::InvalidValue(COLUMN_NAME.to_string()),
        ),
    ];

    for (values, expected) in cases {
        let err = provider.insert(&pets, &values).unwrap_err();
        assert_eq!(err.to_string(), expected.to_string());
        assert!(err.is_validation());
    }

    let item = pets.with_appended_id(1);
    let err = provider
        .update(
            &item,
            &ContentValues::new().with(COLUMN_WEIGHT, -5),
            &Selection::all(),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidValue(field) if field == COLUMN_WEIGHT));

    assert!(storage.calls().is_empty());
}

#[test]
fn insert_on_item_identifier_is_unsupported() {
    let storage = Arc::new(RecordingStorage::new());
    let provider = PetProvider::with_defaults(Arc::clone(&storage));
    let item = provider.collection_uri().with_appended_id(3);

    let err = provider
        .insert(&item, &pet("Toto", None, Gender::Male, 7))
        .unwrap_err();
    assert!(matches!(err, ProviderError::UnsupportedResource(_)));
    assert!(storage.calls().is_empty());
}

#[test]
fn partial_update_changes_only_present_fields() {
    let provider = provider();
    let pets = provider.collection_uri();
    let item = provider
        .insert(&pets, &pet("Toto", Some("Terrier"), Gender::Male, 7))
        .unwrap();

    let updated = provider
        .update(
            &item,
            &ContentValues::new().with(COLUMN_WEIGHT, 9),
            &Selection::all(),
        )
        .unwrap();
    assert_eq!(updated, 1);

    let stored = query_all(&provider, &item).to_pets().unwrap();
    assert_eq!(stored[0].weight, 9);
    assert_eq!(stored[0].name, "Toto");
    assert_eq!(stored[0].breed.as_deref(), Some("Terrier"));
    assert_eq!(stored[0].gender, Gender::Male);
}

#[test]
fn update_with_null_breed_clears_it() {
    let provider = provider();
    let pets = provider.collection_uri();
    let item = provider
        .insert(&pets, &pet("Toto", Some("Terrier"), Gender::Male, 7))
        .unwrap();

    let mut values = ContentValues::new();
    values.put_null(COLUMN_BREED);
    provider.update(&item, &values, &Selection::all()).unwrap();

    let stored = query_all(&provider, &item).to_pets().unwrap();
    assert_eq!(stored[0].breed, None);
}

#[test]
fn empty_update_on_existing_row_is_a_silent_no_op() {
    let storage = Arc::new(RecordingStorage::new());
    let notifier = Arc::new(ChangeNotifier::new());
    let provider = PetProvider::new(
        "com.example.android.pets",
        Arc::clone(&storage),
        Arc::clone(&notifier),
    );
    let pets = provider.collection_uri();
    let item = provider
        .insert(&pets, &pet("Toto", Some("Terrier"), Gender::Male, 7))
        .unwrap();
    let (observer, events) = ChannelObserver::new();
    notifier.subscribe(&pets, observer);

    let updated = provider
        .update(&item, &ContentValues::new(), &Selection::all())
        .unwrap();

    assert_eq!(updated, 0);
    notifier.flush();
    assert!(events.try_iter().next().is_none());
    assert_eq!(storage.calls(), ["insert"]);
}

#[test]
fn rejected_collection_update_leaves_every_row_unchanged() {
    let storage = Arc::new(RecordingStorage::new());
    let provider = PetProvider::with_defaults(Arc::clone(&storage));
    let pets = provider.collection_uri();
    for (name, weight) in [("Rex", 30), ("Binx", 4), ("Toto", 7)] {
        provider
            .insert(&pets, &pet(name, None, Gender::Male, weight))
            .unwrap();
    }
    let before = query_all(&provider, &pets);

    let err = provider
        .update(
            &pets,
            &ContentValues::new().with(COLUMN_WEIGHT, -1),
            &Selection::all().and(COLUMN_WEIGHT, Comparison::Lt, 10),
        )
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidValue(field) if field == COLUMN_WEIGHT));
    assert_eq!(query_all(&provider, &pets), before);
    assert!(!storage.calls().contains(&"update"));
}

#[test]
fn filtered_collection_update_reports_matched_rows() {
    let provider = provider();
    let pets = provider.collection_uri();
    for (name, weight) in [("Rex", 30), ("Binx", 4), ("Toto", 7)] {
        provider
            .insert(&pets, &pet(name, None, Gender::Male, weight))
            .unwrap();
    }

    let updated = provider
        .update(
            &pets,
            &ContentValues::new().with(COLUMN_GENDER, Gender::Female.as_i64()),
            &Selection::all().and(COLUMN_WEIGHT, Comparison::Lt, 10),
        )
        .unwrap();
    assert_eq!(updated, 2);

    let females = provider
        .query(
            &pets,
            &Projection::All,
            &Selection::eq(COLUMN_GENDER, Gender::Female.as_i64()),
            &SortOrder::asc(COLUMN_NAME),
        )
        .unwrap()
        .to_pets()
        .unwrap();
    let names = females.iter().map(|pet| pet.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Binx", "Toto"]);
}

#[test]
fn item_operations_on_missing_key_affect_nothing() {
    let provider = provider();
    let missing = provider.collection_uri().with_appended_id(404);

    assert!(query_all(&provider, &missing).is_empty());
    assert_eq!(
        provider
            .update(
                &missing,
                &ContentValues::new().with(COLUMN_NAME, "Ghost"),
                &Selection::all(),
            )
            .unwrap(),
        0
    );
    assert_eq!(provider.delete(&missing, &Selection::all()).unwrap(), 0);
}

#[test]
fn item_key_overrides_caller_id_filter() {
    let provider = provider();
    let pets = provider.collection_uri();
    let first = provider
        .insert(&pets, &pet("A", None, Gender::Male, 1))
        .unwrap();
    provider
        .insert(&pets, &pet("B", None, Gender::Male, 2))
        .unwrap();

    let cursor = provider
        .query(
            &first,
            &Projection::All,
            &Selection::eq(COLUMN_ID, 2),
            &SortOrder::unordered(),
        )
        .unwrap();
    let stored = cursor.to_pets().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "A");
}

#[test]
fn collection_query_honors_filter_projection_and_order() {
    let provider = provider();
    let pets = provider.collection_uri();
    for (name, weight) in [("Rex", 30), ("Binx", 4), ("Toto", 7)] {
        provider
            .insert(&pets, &pet(name, None, Gender::Male, weight))
            .unwrap();
    }

    let cursor = provider
        .query(
            &pets,
            &Projection::columns([COLUMN_NAME, COLUMN_WEIGHT]),
            &Selection::all().and(COLUMN_WEIGHT, Comparison::Ge, 5),
            &SortOrder::desc(COLUMN_WEIGHT),
        )
        .unwrap();

    assert_eq!(cursor.columns(), [COLUMN_NAME, COLUMN_WEIGHT]);
    assert_eq!(cursor.len(), 2);
    assert_eq!(cursor.get_str(0, COLUMN_NAME), Some("Rex"));
    assert_eq!(cursor.get_i64(1, COLUMN_WEIGHT), Some(7));
    assert_eq!(cursor.notification_uri(), &pets);
}

#[test]
fn unknown_columns_in_query_are_rejected_before_storage() {
    let storage = Arc::new(RecordingStorage::new());
    let provider = PetProvider::with_defaults(Arc::clone(&storage));
    let pets = provider.collection_uri();

    let err = provider
        .query(
            &pets,
            &Projection::columns(["owner"]),
            &Selection::all(),
            &SortOrder::unordered(),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidValue(column) if column == "owner"));

    let err = provider
        .delete(&pets, &Selection::eq("owner; DROP TABLE pets", 1))
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidValue(_)));
    assert!(storage.calls().is_empty());
}

#[test]
fn collection_delete_removes_everything_matching() {
    let provider = provider();
    let pets = provider.collection_uri();
    for name in ["A", "B", "C"] {
        provider
            .insert(&pets, &pet(name, None, Gender::Female, 1))
            .unwrap();
    }

    let deleted = provider
        .delete(&pets, &Selection::eq(COLUMN_NAME, "B"))
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(provider.delete(&pets, &Selection::all()).unwrap(), 2);
    assert!(query_all(&provider, &pets).is_empty());
}

#[test]
fn storage_failure_is_surfaced_without_retry() {
    let storage = Arc::new(RecordingStorage::new());
    let provider = PetProvider::new(
        "com.example.android.pets",
        Arc::clone(&storage),
        Arc::new(ChangeNotifier::new()),
    );
    let pets = provider.collection_uri();
    storage.fail_next_calls();

    let err = provider
        .insert(&pets, &pet("Toto", None, Gender::Male, 7))
        .unwrap_err();
    assert!(matches!(err, ProviderError::StorageFailure(_)));
    assert!(!err.is_validation());
    assert_eq!(storage.calls(), ["insert"]);
}

#[test]
fn concurrent_inserts_get_distinct_keys() {
    let provider = Arc::new(isolated_provider());
    let handles = (0..8)
        .map(|index| {
            let provider = Arc::clone(&provider);
            std::thread::spawn(move || {
                let pets = provider.collection_uri();
                provider
                    .insert(
                        &pets,
                        &pet(&format!("pet-{index}"), None, Gender::Unknown, index),
                    )
                    .unwrap()
                    .parse_id()
                    .unwrap()
            })
        })
        .collect::<Vec<_>>();

    let mut ids = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
