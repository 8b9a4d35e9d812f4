//! Transcript persistence — ordered turn history, durably cached.

pub mod file;
pub mod in_memory;
pub mod traits;

pub use file::FileTranscriptStore;
pub use in_memory::InMemoryTranscriptStore;
pub use traits::{Role, TranscriptStore, Turn};

use crate::config::TranscriptConfig;
use anyhow::Result;
use std::path::Path;

/// Factory: create the right transcript store from config.
pub fn create_transcript_store(
    config: &TranscriptConfig,
    workspace_dir: &Path,
) -> Result<Box<dyn TranscriptStore>> {
    match config.backend.trim() {
        "file" => Ok(Box::new(FileTranscriptStore::new(
            workspace_dir,
            &config.slot,
        ))),
        "memory" => Ok(Box::new(InMemoryTranscriptStore::new())),
        other if other.is_empty() => {
            anyhow::bail!("transcript.backend cannot be empty. Supported values: file, memory")
        }
        other => anyhow::bail!(
            "Unknown transcript backend '{other}'. Supported values: file, memory"
        ),
    }
}

// ── CLI handler ──

/// Handle `admitwise transcript <subcommand>` CLI commands.
pub async fn handle_transcript_command(
    command: crate::TranscriptCommands,
    config: &crate::config::Config,
) -> Result<()> {
    match command {
        crate::TranscriptCommands::Show { limit } => {
            let store = create_transcript_store(&config.transcript, &config.workspace_dir)?;
            store.load().await;
            let mut turns = store.snapshot().await;
            if turns.is_empty() {
                println!("No saved transcript.");
                return Ok(());
            }
            let total = turns.len();
            if let Some(n) = limit {
                let start = turns.len().saturating_sub(n);
                turns.drain(..start);
            }
            println!("Transcript ({total} turns, showing {}):\n", turns.len());
            for turn in &turns {
                let who = match turn.role {
                    Role::User => "You",
                    Role::Assistant => "Advisor",
                };
                println!("{who}: {}\n", turn.content);
            }
        }
        crate::TranscriptCommands::Clear { yes } => {
            if !yes {
                eprintln!("Use --yes to confirm deleting the transcript and advisor session.");
                return Ok(());
            }
            // Transcript and session handle are cleared together.
            let manager = crate::session::create_session_manager(config)?;
            manager.hydrate().await;
            manager.reset().await?;
            println!("✓ Transcript cleared; next question starts a new advisor session.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptConfig;
    use tempfile::TempDir;

    #[test]
    fn factory_file() {
        let tmp = TempDir::new().unwrap();
        let cfg = TranscriptConfig::default();
        let store = create_transcript_store(&cfg, tmp.path()).unwrap();
        assert_eq!(store.name(), "file");
    }

    #[test]
    fn factory_memory() {
        let tmp = TempDir::new().unwrap();
        let cfg = TranscriptConfig {
            backend: "memory".into(),
            ..TranscriptConfig::default()
        };
        let store = create_transcript_store(&cfg, tmp.path()).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn factory_unknown_errors() {
        let tmp = TempDir::new().unwrap();
        let cfg = TranscriptConfig {
            backend: "cloud".into(),
            ..TranscriptConfig::default()
        };
        match create_transcript_store(&cfg, tmp.path()) {
            Err(err) => assert!(err.to_string().contains("Unknown transcript backend")),
            Ok(_) => panic!("unknown backend should error"),
        }
    }

    #[test]
    fn factory_empty_errors() {
        let tmp = TempDir::new().unwrap();
        let cfg = TranscriptConfig {
            backend: String::new(),
            ..TranscriptConfig::default()
        };
        match create_transcript_store(&cfg, tmp.path()) {
            Err(err) => assert!(err.to_string().contains("cannot be empty")),
            Ok(_) => panic!("empty backend should error"),
        }
    }
}
