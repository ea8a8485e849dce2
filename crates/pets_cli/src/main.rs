//! Command-line entry point over `pets_core`.
//!
//! # Responsibility
//! - Load configuration, open storage and run one access-layer call.
//! - Print results as JSON on stdout.

mod args;

use anyhow::{bail, Context, Result};
use args::{Cli, Command};
use log::info;
use pets_core::model::pet::{
    COLUMN_BREED, COLUMN_GENDER, COLUMN_ID, COLUMN_NAME, COLUMN_WEIGHT,
};
use pets_core::{
    init_logging, ChangeNotifier, ContentProvider, ContentUri, ContentValues, DatabaseLocation,
    Gender, PetProvider, PetsConfig, Projection, Selection, SortOrder, SqliteStorage,
};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let mut config = PetsConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(db) = &cli.db {
        config.database = DatabaseLocation::File(db.clone());
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)
            .map_err(anyhow::Error::msg)
            .context("initializing logging")?;
    }

    let storage = config.open_storage().context("opening pet database")?;
    let provider = PetProvider::new(
        config.authority.clone(),
        storage,
        Arc::new(ChangeNotifier::new()),
    );

    let output = run(&provider, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(provider: &PetProvider<SqliteStorage>, command: Command) -> Result<serde_json::Value> {
    let pets = provider.collection_uri();

    match command {
        Command::InsertDummy => {
            let values = ContentValues::new()
                .with(COLUMN_NAME, "Toto")
                .with(COLUMN_BREED, "Terrier")
                .with(COLUMN_GENDER, Gender::Male.as_i64())
                .with(COLUMN_WEIGHT, 7);
            let uri = provider.insert(&pets, &values)?;
            info!("event=cli_insert_dummy module=cli status=ok uri={uri}");
            Ok(json!({ "uri": uri.to_string() }))
        }
        Command::List => {
            let cursor = provider.query(
                &pets,
                &Projection::All,
                &Selection::all(),
                &SortOrder::asc(COLUMN_ID),
            )?;
            Ok(json!(cursor.to_pets()?))
        }
        Command::Get { id } => {
            let uri = pets.with_appended_id(id);
            let cursor = provider.query(
                &uri,
                &Projection::All,
                &Selection::all(),
                &SortOrder::unordered(),
            )?;
            match cursor.to_pets()?.into_iter().next() {
                Some(pet) => Ok(json!(pet)),
                None => bail!("no pet with id {id}"),
            }
        }
        Command::Update {
            id,
            name,
            breed,
            gender,
            weight,
        } => {
            let mut values = ContentValues::new();
            if let Some(name) = name {
                values.put(COLUMN_NAME, name);
            }
            if let Some(breed) = breed {
                values.put(COLUMN_BREED, breed);
            }
            if let Some(gender) = gender {
                values.put(COLUMN_GENDER, gender);
            }
            if let Some(weight) = weight {
                values.put(COLUMN_WEIGHT, weight);
            }
            let rows = provider.update(&pets.with_appended_id(id), &values, &Selection::all())?;
            Ok(json!({ "updated": rows }))
        }
        Command::Delete { id } => {
            let rows = provider.delete(&pets.with_appended_id(id), &Selection::all())?;
            Ok(json!({ "deleted": rows }))
        }
        Command::DeleteAll => {
            let rows = provider.delete(&pets, &Selection::all())?;
            Ok(json!({ "deleted": rows }))
        }
        Command::Type { uri } => {
            let uri: ContentUri = uri.parse()?;
            Ok(json!({ "type": provider.get_type(&uri)? }))
        }
    }
}
