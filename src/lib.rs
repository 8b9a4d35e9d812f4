#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use clap::Subcommand;
use serde::{Deserialize, Serialize};

pub mod advisor;
pub mod config;
pub mod quota;
pub mod session;
pub mod transcript;

pub use config::Config;

/// Transcript management subcommands
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TranscriptCommands {
    /// Print the saved conversation transcript
    Show {
        /// Maximum number of turns to display (most recent last)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete the saved transcript and forget the advisor session
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
