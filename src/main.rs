#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{fmt, EnvFilter};

use admitwise::config::Config;
use admitwise::quota::QuotaLimit;
use admitwise::session::{self, SendError, SessionManager, TurnOutcome};
use admitwise::transcript;
use admitwise::TranscriptCommands;

const UPGRADE_URL: &str = "https://admitwise.app/pricing";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `AdmitWise` - your college-admissions advisor in the terminal.
#[derive(Parser, Debug)]
#[command(name = "admitwise")]
#[command(version)]
#[command(about = "Ask an admissions advisor, keep the conversation.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Talk to the admissions advisor
    #[command(long_about = "\
Talk to the admissions advisor.

Opens an interactive conversation that picks up where you left off. \
Use --message for single-shot questions without entering interactive \
mode. Inside the conversation, /new starts a fresh chat and /quit \
exits.

Examples:
  admitwise chat
  admitwise chat -m \"What are my chances at USC?\"")]
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show advisor session status
    Status,

    /// Manage the saved conversation transcript
    #[command(long_about = "\
Manage the saved conversation transcript.

Show the turns persisted from previous runs, or clear them. Clearing \
the transcript also forgets the advisor session, so the next question \
starts a new conversation.

Examples:
  admitwise transcript show
  admitwise transcript show --limit 6
  admitwise transcript clear --yes")]
    Transcript {
        #[command(subcommand)]
        transcript_command: TranscriptCommands,
    },

    /// Manage configuration
    #[command(long_about = "\
Manage AdmitWise configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  admitwise config schema
  admitwise config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `admitwise`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(admitwise completions bash)
  admitwise completions zsh > ~/.zfunc/_admitwise
  admitwise completions fish > ~/.config/fish/completions/admitwise.fish")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("ADMITWISE_CONFIG_DIR", config_dir);
    }

    // Completions must remain stdout-only and should not load config or
    // initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Completions { .. } => unreachable!(),

        Commands::Chat { message } => run_chat(&config, message).await,

        Commands::Status => run_status(&config).await,

        Commands::Transcript { transcript_command } => {
            transcript::handle_transcript_command(transcript_command, &config).await
        }

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&schema).expect("failed to serialize JSON Schema")
                );
                Ok(())
            }
        },
    }
}

async fn run_chat(config: &Config, message: Option<String>) -> Result<()> {
    let manager = session::create_session_manager(config)?;
    let restored = manager.hydrate().await;

    if let Some(message) = message {
        send_and_print(&manager, &message).await;
        return Ok(());
    }

    println!("🎓 AdmitWise advisor - admissions, essays, scholarships.");
    if restored > 0 {
        println!("Picking up your conversation ({restored} saved turns).");
    }
    println!("Commands: /new starts a fresh chat, /quit exits.\n");
    print_suggestions(&manager);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/new" => {
                manager.reset().await?;
                println!("Started a new chat.\n");
                print_suggestions(&manager);
                continue;
            }
            _ => {}
        }

        send_and_print(&manager, line).await;
    }

    Ok(())
}

/// Run one turn and render the outcome. Failed turns are inline
/// messages, never fatal.
async fn send_and_print(manager: &SessionManager, text: &str) {
    match manager.send(text).await {
        Ok(TurnOutcome::Answered { answer, .. }) => {
            println!("\n{answer}\n");
            print_suggestions(manager);
            if let QuotaLimit::Limited(n) = manager.quota_remaining() {
                println!("({n} questions left this billing period)");
            }
        }
        Ok(TurnOutcome::Superseded) => {
            // The conversation was reset while this reply was in
            // flight; there is nothing to show.
        }
        Err(SendError::QuotaExhausted) => {
            println!(
                "You've used all {} questions for this billing period.",
                manager.quota_limit()
            );
            println!("Upgrade to keep asking: {UPGRADE_URL}");
        }
        Err(SendError::TurnInFlight) => {
            println!("Still working on your last question - one moment.");
        }
        Err(err @ SendError::Backend(_)) => {
            println!("⚠ {err}");
            println!("Your question wasn't counted; please try again.");
        }
    }
}

fn print_suggestions(manager: &SessionManager) {
    println!("Try asking:");
    for suggestion in manager.suggestions() {
        println!("  • {suggestion}");
    }
    println!();
}

async fn run_status(config: &Config) -> Result<()> {
    let manager = session::create_session_manager(config)?;
    let restored = manager.hydrate().await;

    println!("🎓 AdmitWise Status");
    println!();
    println!("Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("Workspace:   {}", config.workspace_dir.display());
    println!("Config:      {}", config.config_path.display());
    println!();
    println!("🤖 Advisor:     {}", config.advisor.backend);
    println!("   Endpoint:    {}", config.advisor.base_url);
    println!(
        "   API key:     {}",
        if config.api_key.is_some() {
            "set"
        } else {
            "(not set)"
        }
    );
    println!();
    println!(
        "💬 Transcript:  {} ({} saved turns)",
        config.transcript.backend, restored
    );
    println!(
        "🔗 Session:     {}",
        manager
            .session_id()
            .unwrap_or_else(|| "(none - next question starts one)".to_string())
    );
    println!(
        "📊 Quota:       {} of {} questions remaining",
        manager.quota_remaining(),
        manager.quota_limit()
    );

    Ok(())
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
