//! Configuration for a watch session.
//!
//! Values are layered: config file → environment → CLI flags. Environment
//! variables are read by clap alongside the flags, so by the time they reach
//! [`WatchConfig::resolve`] both arrive as one set of overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [watch]
//! project = "shop"
//! project_id = "shop-prod"
//! alert_level = "elevated"
//! tick_secs = 20
//! max_errors = 3
//!
//! [slack]
//! auth = "token"
//! channel = "#builds"
//! token = "xoxb-..."
//!
//! [cloud_build]
//! token = "ya29..."
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build::source::CLOUD_BUILD_API;
use crate::notify::threaded::SLACK_API;

pub const DEFAULT_TICK_SECS: u64 = 20;
pub const DEFAULT_MAX_ERRORS: u32 = 3;
pub const DEFAULT_ALERT_MENTION: &str = "<!subteam^S014F8S6EBH>";
const DEFAULT_PROJECT: &str = "unknown";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Whether failed builds page the on-call mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Normal,
    Elevated,
}

impl AlertLevel {
    /// Derive the level from a deployment environment name: only `dev` is quiet.
    pub fn from_env_name(env: &str) -> Self {
        if env == "dev" {
            AlertLevel::Normal
        } else {
            AlertLevel::Elevated
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Normal => write!(f, "normal"),
            AlertLevel::Elevated => write!(f, "elevated"),
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(AlertLevel::Normal),
            "elevated" => Ok(AlertLevel::Elevated),
            _ => anyhow::bail!("Invalid alert level '{}'. Valid values: normal, elevated", s),
        }
    }
}

/// How messages reach Slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Webhook,
    Token,
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Webhook => write!(f, "webhook"),
            AuthMethod::Token => write!(f, "token"),
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webhook" => Ok(AuthMethod::Webhook),
            "token" => Ok(AuthMethod::Token),
            _ => anyhow::bail!(
                "Invalid auth method '{}', must be one of: webhook, token",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub build: Option<String>,
    pub project: Option<String>,
    pub project_id: Option<String>,
    pub alert_level: Option<AlertLevel>,
    pub env: Option<String>,
    pub alert_mention: Option<String>,
    pub tick_secs: Option<u64>,
    pub max_errors: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackSection {
    pub auth: Option<AuthMethod>,
    pub webhook: Option<String>,
    pub channel: Option<String>,
    pub token: Option<String>,
    pub api: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudBuildSection {
    pub api: Option<String>,
    pub token: Option<String>,
}

/// On-disk configuration; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub watch: WatchSection,
    pub slack: SlackSection,
    pub cloud_build: CloudBuildSection,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Values supplied by flags or environment. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub build: Option<String>,
    pub project: Option<String>,
    pub project_id: Option<String>,
    pub auth: Option<AuthMethod>,
    pub webhook: Option<String>,
    pub channel: Option<String>,
    pub token: Option<String>,
    pub alert_level: Option<AlertLevel>,
    pub env: Option<String>,
    pub alert_mention: Option<String>,
    pub tick_secs: Option<u64>,
    pub max_errors: Option<u32>,
    pub slack_api: Option<String>,
    pub cloud_build_api: Option<String>,
    pub gcp_token: Option<String>,
}

/// Fully resolved settings for one monitoring session.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub build_id: String,
    pub project: String,
    pub project_id: String,
    pub auth: AuthMethod,
    pub webhook: String,
    pub channel: String,
    pub token: String,
    pub alert_level: AlertLevel,
    pub alert_mention: String,
    pub tick: Duration,
    pub max_errors: u32,
    pub slack_api: String,
    pub cloud_build_api: String,
    /// Static Cloud Build token; the metadata server is used when absent.
    pub gcp_token: Option<String>,
}

/// Default config file location: `<config dir>/buildwatch/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("buildwatch").join(CONFIG_FILE_NAME))
}

impl WatchConfig {
    /// Load the config file (explicit path, else the default location if it
    /// exists), apply overrides, and validate.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let file = match &overrides.config_file {
            Some(path) => Some(FileConfig::load(path)?),
            None => match default_config_path() {
                Some(path) if path.exists() => Some(FileConfig::load(&path)?),
                _ => None,
            },
        };
        let config = Self::resolve(overrides, file.unwrap_or_default());
        config.validate()?;
        Ok(config)
    }

    /// Merge overrides over file values over defaults. Does not validate.
    pub fn resolve(o: ConfigOverrides, file: FileConfig) -> Self {
        let FileConfig {
            watch,
            slack,
            cloud_build,
        } = file;

        let alert_level = o
            .alert_level
            .or(watch.alert_level)
            .or_else(|| o.env.or(watch.env).map(|e| AlertLevel::from_env_name(&e)))
            .unwrap_or_default();

        Self {
            build_id: o.build.or(watch.build).unwrap_or_default(),
            project: o
                .project
                .or(watch.project)
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            project_id: o.project_id.or(watch.project_id).unwrap_or_default(),
            auth: o.auth.or(slack.auth).unwrap_or_default(),
            webhook: o.webhook.or(slack.webhook).unwrap_or_default(),
            channel: o.channel.or(slack.channel).unwrap_or_default(),
            token: o.token.or(slack.token).unwrap_or_default(),
            alert_level,
            alert_mention: o
                .alert_mention
                .or(watch.alert_mention)
                .unwrap_or_else(|| DEFAULT_ALERT_MENTION.to_string()),
            tick: Duration::from_secs(
                o.tick_secs.or(watch.tick_secs).unwrap_or(DEFAULT_TICK_SECS),
            ),
            max_errors: o
                .max_errors
                .or(watch.max_errors)
                .unwrap_or(DEFAULT_MAX_ERRORS),
            slack_api: o
                .slack_api
                .or(slack.api)
                .unwrap_or_else(|| SLACK_API.to_string()),
            cloud_build_api: o
                .cloud_build_api
                .or(cloud_build.api)
                .unwrap_or_else(|| CLOUD_BUILD_API.to_string()),
            gcp_token: o.gcp_token.or(cloud_build.token).filter(|t| !t.is_empty()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.auth {
            AuthMethod::Webhook if self.webhook.is_empty() => {
                anyhow::bail!("Slack webhook must be provided.")
            }
            AuthMethod::Token if self.channel.is_empty() || self.token.is_empty() => {
                anyhow::bail!(
                    "Channel and bot token must be provided for token-based authorization."
                )
            }
            _ => {}
        }
        if self.build_id.is_empty() {
            anyhow::bail!("Build ID must be provided.");
        }
        if self.project_id.is_empty() {
            anyhow::bail!("Project ID must be provided.");
        }
        if self.tick.is_zero() {
            anyhow::bail!("Tick interval must be at least one second.");
        }
        Ok(())
    }

    /// Key/value view with secrets masked, for `check-config`.
    pub fn redacted(&self) -> Vec<(&'static str, String)> {
        vec![
            ("build", self.build_id.clone()),
            ("project", self.project.clone()),
            ("project_id", self.project_id.clone()),
            ("auth", self.auth.to_string()),
            ("webhook", mask(&self.webhook)),
            ("channel", self.channel.clone()),
            ("token", mask(&self.token)),
            ("alert_level", self.alert_level.to_string()),
            ("alert_mention", self.alert_mention.clone()),
            ("tick_secs", self.tick.as_secs().to_string()),
            ("max_errors", self.max_errors.to_string()),
            ("slack_api", self.slack_api.clone()),
            ("cloud_build_api", self.cloud_build_api.clone()),
            (
                "gcp_token",
                self.gcp_token
                    .as_deref()
                    .map(mask)
                    .unwrap_or_else(|| "(metadata server)".to_string()),
            ),
        ]
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}
