//! Subcommand implementations.

pub mod dump;
pub mod object;
pub mod participants;
