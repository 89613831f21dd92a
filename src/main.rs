use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use buildwatch::config::{AlertLevel, AuthMethod, ConfigOverrides, WatchConfig};
use buildwatch::telemetry::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(version, about = "Post Cloud Build status updates to Slack")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format: text, json
    #[arg(long, default_value = "text", global = true, env = "BUILDWATCH_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll a build until it finishes, posting notifications along the way
    Watch(WatchArgs),
    /// Resolve and validate configuration without contacting any API
    CheckConfig(WatchArgs),
}

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// TOML config file (defaults to <config dir>/buildwatch/config.toml if present)
    #[arg(long, env = "BUILDWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Id of the monitored build
    #[arg(long, env = "BUILDWATCH_BUILD")]
    pub build: Option<String>,

    /// Project name shown in messages
    #[arg(long, env = "BUILDWATCH_PROJECT")]
    pub project: Option<String>,

    /// Cloud project that owns the build
    #[arg(long, env = "BUILDWATCH_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Slack delivery: webhook or token
    #[arg(long, env = "BUILDWATCH_AUTH")]
    pub auth: Option<AuthMethod>,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK")]
    pub webhook: Option<String>,

    /// Channel to post to (token auth)
    #[arg(long, env = "SLACK_CHANNEL")]
    pub channel: Option<String>,

    /// Slack bot token (token auth)
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Alert level: normal, elevated
    #[arg(long, env = "BUILDWATCH_ALERT_LEVEL")]
    pub alert_level: Option<AlertLevel>,

    /// Environment name; anything but "dev" means elevated alerts
    #[arg(long)]
    pub env: Option<String>,

    /// Mention added to failed build messages when alerts are elevated
    #[arg(long)]
    pub alert_mention: Option<String>,

    /// Seconds between polls
    #[arg(long)]
    pub tick_secs: Option<u64>,

    /// Consecutive fetch failures tolerated before giving up
    #[arg(long)]
    pub max_errors: Option<u32>,

    /// Slack Web API base URL
    #[arg(long, hide = true)]
    pub slack_api: Option<String>,

    /// Cloud Build API base URL
    #[arg(long, hide = true)]
    pub cloud_build_api: Option<String>,

    /// Cloud Build access token; the metadata server is used when absent
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub gcp_token: Option<String>,
}

impl From<WatchArgs> for ConfigOverrides {
    fn from(a: WatchArgs) -> Self {
        Self {
            config_file: a.config,
            build: a.build,
            project: a.project,
            project_id: a
                .project_id
                .or_else(|| std::env::var("GOOGLE_CLOUD_PROJECT").ok()),
            auth: a.auth,
            webhook: a.webhook,
            channel: a.channel,
            token: a.token,
            alert_level: a.alert_level,
            env: a.env,
            alert_mention: a.alert_mention,
            tick_secs: a.tick_secs,
            max_errors: a.max_errors,
            slack_api: a.slack_api,
            cloud_build_api: a.cloud_build_api,
            gcp_token: a.gcp_token,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format, cli.verbose);

    let result = match cli.command {
        Commands::Watch(args) => match WatchConfig::load(args.into()) {
            Ok(config) => cmd::cmd_watch(config).await,
            Err(e) => Err(e),
        },
        Commands::CheckConfig(args) => {
            WatchConfig::load(args.into()).and_then(|config| cmd::cmd_check_config(&config))
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
