use std::sync::Arc;

use clap::Parser;
use substrata::{InMemoryEngine, ObjectConfig, ObjectRoot, object::UuidIdGenerator};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("substrata=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    let mut config = ObjectConfig::default();
    if let Some(master) = &cli.master_container {
        config = config.with_master_container(master);
    }
    if let Some(root) = &cli.root_document {
        config = config.with_root_document(root);
    }

    let engine = Arc::new(InMemoryEngine::load_from_file(&cli.data_file)?);
    let object = ObjectRoot::open_with(engine.clone(), config.clone(), Arc::new(UuidIdGenerator))?;

    let mutated = match &cli.command {
        Commands::Put(args) => {
            commands::object::put(&object, &args.key, &args.value, args.new_container, format)?;
            true
        }
        Commands::Get(args) => {
            commands::object::get(&object, &args.key, format)?;
            false
        }
        Commands::Remove(args) => {
            commands::object::remove(&object, &args.key, format)?;
            true
        }
        Commands::Keys => {
            commands::object::keys(&object, format)?;
            false
        }
        Commands::Show => {
            commands::object::show(&object, format)?;
            false
        }
        Commands::Dump => {
            commands::dump::run(&engine, &config, format)?;
            false
        }
        Commands::Participants { action } => {
            commands::participants::run(&object, action, format)?;
            !matches!(action, cli::ParticipantAction::List)
        }
    };

    // Opening an object for the first time creates its root, so a fresh data file
    // is written even by read-only commands.
    if mutated || !cli.data_file.exists() {
        engine.save_to_file(&cli.data_file)?;
        tracing::debug!(path = %cli.data_file.display(), "Saved engine state");
    }
    Ok(())
}
