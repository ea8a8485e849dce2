//! CLI argument definitions using clap.
//!
//! Commands:
//! - pets insert-dummy
//! - pets list
//! - pets get <id>
//! - pets update <id> [--name] [--breed] [--gender] [--weight]
//! - pets delete <id>
//! - pets delete-all
//! - pets type <uri>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pet shelter store front end
#[derive(Parser, Debug)]
#[command(name = "pets")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to JSON configuration file
    #[arg(long, global = true, default_value = "./pets.json")]
    pub config: PathBuf,

    /// Database file, overriding the configured location
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert the sample pet (Toto, Terrier, male, 7)
    InsertDummy,

    /// List every pet ordered by id
    List,

    /// Show one pet
    Get { id: i64 },

    /// Change fields of one pet
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        breed: Option<String>,

        /// 0 = unknown, 1 = male, 2 = female
        #[arg(long)]
        gender: Option<i64>,

        #[arg(long)]
        weight: Option<i64>,
    },

    /// Delete one pet
    Delete { id: i64 },

    /// Delete every pet
    DeleteAll,

    /// Print the type tag of a content identifier
    Type { uri: String },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
