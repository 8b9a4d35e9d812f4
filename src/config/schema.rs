use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level AdmitWise configuration, loaded from `config.toml`.
///
/// Resolution order: `ADMITWISE_CONFIG_DIR` env → `~/.admitwise/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the advisory service. Overridden by `ADMITWISE_API_KEY` or `API_KEY` env vars.
    pub api_key: Option<String>,

    /// Advisory service configuration (`[advisor]`).
    #[serde(default)]
    pub advisor: AdvisorConfig,

    /// Transcript persistence configuration (`[transcript]`).
    #[serde(default)]
    pub transcript: TranscriptConfig,

    /// Question quota configuration (`[quota]`).
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Follow-up suggestion configuration (`[suggestions]`).
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
}

/// Advisory service configuration (`[advisor]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdvisorConfig {
    /// Backend kind. Default: `"http"`.
    #[serde(default = "default_advisor_backend")]
    pub backend: String,
    /// Base URL of the advisory service API. Overridden by `ADMITWISE_API_URL`.
    #[serde(default = "default_advisor_base_url")]
    pub base_url: String,
    /// Stable anonymous identifier sent with every query. Generated on
    /// first run when absent.
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_advisor_backend() -> String {
    "http".to_string()
}

fn default_advisor_base_url() -> String {
    "https://api.admitwise.app/v1".to_string()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            backend: default_advisor_backend(),
            base_url: default_advisor_base_url(),
            user_id: None,
        }
    }
}

/// Transcript persistence configuration (`[transcript]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptConfig {
    /// Storage backend: `"file"` (durable) or `"memory"` (ephemeral). Default: `"file"`.
    #[serde(default = "default_transcript_backend")]
    pub backend: String,
    /// File name of the transcript slot under the workspace dir. Default: `"transcript.json"`.
    #[serde(default = "default_transcript_slot")]
    pub slot: String,
}

fn default_transcript_backend() -> String {
    "file".to_string()
}

fn default_transcript_slot() -> String {
    "transcript.json".to_string()
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            backend: default_transcript_backend(),
            slot: default_transcript_slot(),
        }
    }
}

/// Question quota configuration (`[quota]` section).
///
/// The billing subsystem owns the real counter; this only seeds the
/// local mirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuotaConfig {
    /// Permitted questions per billing period. Absent means unlimited.
    #[serde(default)]
    pub monthly_limit: Option<u32>,
}

/// Follow-up suggestion configuration (`[suggestions]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionsConfig {
    /// Default follow-up questions shown when the advisor returns none.
    #[serde(default = "default_suggestion_list")]
    pub defaults: Vec<String>,
}

fn default_suggestion_list() -> Vec<String> {
    crate::session::DEFAULT_SUGGESTIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            defaults: default_suggestion_list(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ADMITWISE_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let user_dirs = UserDirs::new().context("could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".admitwise"))
}

impl Config {
    fn with_dirs(config_dir: &Path) -> Self {
        Self {
            workspace_dir: config_dir.join("workspace"),
            config_path: config_dir.join("config.toml"),
            api_key: None,
            advisor: AdvisorConfig::default(),
            transcript: TranscriptConfig::default(),
            quota: QuotaConfig::default(),
            suggestions: SuggestionsConfig::default(),
        }
    }

    /// Load the config file, creating it with defaults on first run.
    /// Also mints the stable anonymous user id when absent and saves
    /// it back, so the advisory service sees one identity per install.
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = default_config_dir()?;
        let mut config = Self::with_dirs(&config_dir);

        fs::create_dir_all(&config.workspace_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create workspace dir {}",
                    config.workspace_dir.display()
                )
            })?;

        if config.config_path.exists() {
            let raw = fs::read_to_string(&config.config_path)
                .await
                .with_context(|| {
                    format!("failed to read config {}", config.config_path.display())
                })?;
            let parsed: Config = toml::from_str(&raw).with_context(|| {
                format!("invalid config file {}", config.config_path.display())
            })?;
            config = Config {
                workspace_dir: config.workspace_dir,
                config_path: config.config_path,
                ..parsed
            };
        }

        if config.advisor.user_id.is_none() {
            config.advisor.user_id = Some(uuid::Uuid::new_v4().to_string());
            config.save().await?;
        } else if !config.config_path.exists() {
            config.save().await?;
        }

        Ok(config)
    }

    /// Write the config back to its file.
    pub async fn save(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(self).context("failed to render config")?;
        fs::write(&self.config_path, rendered)
            .await
            .with_context(|| format!("failed to write config {}", self.config_path.display()))
    }

    /// Apply environment variable overrides. Env always wins over file.
    pub fn apply_env_overrides(&mut self) {
        for var in ["ADMITWISE_API_KEY", "API_KEY"] {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    self.api_key = Some(value.to_string());
                    break;
                }
            }
        }

        if let Ok(value) = std::env::var("ADMITWISE_API_URL") {
            let value = value.trim();
            if !value.is_empty() {
                self.advisor.base_url = value.to_string();
            }
        }
    }

    /// The stable anonymous identity sent to the advisory service.
    pub fn user_id(&self) -> &str {
        self.advisor.user_id.as_deref().unwrap_or("anonymous")
    }
}
