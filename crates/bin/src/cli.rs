//! CLI argument definitions for the Substrata binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Replicated object store backed by synchronized Y-CRDT containers
#[derive(Parser, Debug)]
#[command(name = "substrata")]
#[command(about = "Substrata: edit a replicated JSON-like object stored in a local data file")]
#[command(version)]
pub struct Cli {
    /// File holding the persisted engine state
    #[arg(short = 'f', long, default_value = "substrata.json", env = "SUBSTRATA_DATA_FILE")]
    pub data_file: PathBuf,

    /// Id of the master container that anchors the object
    #[arg(long, env = "SUBSTRATA_MASTER_CONTAINER")]
    pub master_container: Option<String>,

    /// Id of the root map document inside the master container
    #[arg(long, env = "SUBSTRATA_ROOT_DOCUMENT")]
    pub root_document: Option<String>,

    /// Print machine-readable JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a JSON value under a root key
    Put(PutArgs),
    /// Print the value stored under a root key
    Get(KeyArgs),
    /// Delete a root key
    Remove(KeyArgs),
    /// List the root keys
    Keys,
    /// Print the whole object as JSON
    Show,
    /// Print the persisted representation of every document
    Dump,
    /// Manage the object's participants
    Participants {
        #[command(subcommand)]
        action: ParticipantAction,
    },
}

/// Arguments for the put command
#[derive(clap::Args, Debug)]
pub struct PutArgs {
    /// Root key to write
    pub key: String,

    /// Value as JSON; anything that does not parse is stored as a string
    pub value: String,

    /// Attach nested maps and lists into a freshly created container
    #[arg(long)]
    pub new_container: bool,
}

/// Arguments for commands addressing a single root key
#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Subcommand, Debug)]
pub enum ParticipantAction {
    /// List participants
    List,
    /// Add a participant (`name@domain`)
    Add { address: String },
    /// Remove a participant
    Remove { address: String },
}
