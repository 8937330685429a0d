//! Participant management commands.

use substrata::ObjectRoot;

use crate::cli::ParticipantAction;
use crate::output::{OutputFormat, print_table};

/// Run a `participants` subcommand
pub fn run(
    object: &ObjectRoot,
    action: &ParticipantAction,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ParticipantAction::List => {
            let participants = object.participants()?;
            match format {
                OutputFormat::Human => {
                    if participants.is_empty() {
                        println!("No participants.");
                    } else {
                        let rows: Vec<Vec<String>> =
                            participants.into_iter().map(|p| vec![p]).collect();
                        print_table(&["PARTICIPANT"], &rows);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&participants)?),
            }
        }
        ParticipantAction::Add { address } => {
            object.add_participant(address)?;
            if format == OutputFormat::Human {
                println!("Added {address}");
            }
        }
        ParticipantAction::Remove { address } => {
            let removed = object.remove_participant(address)?;
            if format == OutputFormat::Human {
                if removed {
                    println!("Removed {address}");
                } else {
                    println!("{address} is not a participant.");
                }
            }
        }
    }
    Ok(())
}
