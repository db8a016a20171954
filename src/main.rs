use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::process::ExitCode;
use tracing::{error, info};

/// Daily guild donation checker: records who donated today into a JSON history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file with `apiDomain`, `guildIds` and `historyFile`
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// API host (overrides API_DOMAIN)
    #[arg(long)]
    api_domain: Option<String>,

    /// Guild ID to check; repeat or comma-separate for several (overrides GUILD_IDS)
    #[arg(long = "guild", short = 'g')]
    guilds: Vec<String>,

    /// History file to merge into (overrides HISTORY_FILE)
    #[arg(long)]
    history_file: Option<String>,

    /// Record under this date (YYYY-MM-DD) instead of today's UTC date
    #[arg(long)]
    date: Option<String>,
}

mod api;
mod config;
mod donations;
mod error;
mod logging;
mod period;
mod runner;
mod state;

use config::{parse_guild_list, TrackerConfig};
use period::RunPeriod;

/// Defaults < config file < environment < command line
fn build_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)?,
        None => TrackerConfig::default(),
    };
    config.apply_env();

    if let Some(domain) = &args.api_domain {
        config.api_domain = domain.clone();
    }
    if !args.guilds.is_empty() {
        config.guild_ids = args.guilds.iter().flat_map(|g| parse_guild_list(g)).collect();
    }
    if let Some(path) = &args.history_file {
        config.history_file = path.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(logging::split_by_level(std::io::stderr, std::io::stdout))
                .with_target(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = build_config(&args)?;
    let period = match &args.date {
        Some(raw) => RunPeriod::parse(raw).with_context(|| format!("Invalid --date '{}'", raw))?,
        None => RunPeriod::today(),
    };

    Ok(ExitCode::from(run_job(&config, &period).await))
}

/// Run the job and map the outcome to a process exit status.
/// Per-guild failures still exit 0; only a failed history write is fatal.
async fn run_job(config: &TrackerConfig, period: &RunPeriod) -> u8 {
    match runner::execute(config, period).await {
        Ok(summary) => {
            info!(
                "Done: {} guild(s) recorded, {} failed",
                summary.recorded(),
                summary.failed()
            );
            0
        }
        Err(e) => {
            error!("Failed to write history file: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_api() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn period() -> RunPeriod {
        RunPeriod::parse("2024-03-05").unwrap()
    }

    #[tokio::test]
    async fn test_unwritable_history_exits_with_one() {
        let dir = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let config = TrackerConfig {
            api_domain: unreachable_api(),
            guild_ids: vec!["64".to_string()],
            history_file: dir.join("donation_history.json").to_string_lossy().into_owned(),
        };

        assert_eq!(run_job(&config, &period()).await, 1);
    }

    #[tokio::test]
    async fn test_guild_failures_still_exit_with_zero() {
        let path = std::env::temp_dir()
            .join(format!("donation-main-{}.json", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        let config = TrackerConfig {
            api_domain: unreachable_api(),
            guild_ids: vec!["64".to_string(), "40".to_string()],
            history_file: path.clone(),
        };

        assert_eq!(run_job(&config, &period()).await, 0);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{}");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "guild-donations",
            "--guild",
            "5,6",
            "--guild",
            "7",
            "--api-domain",
            "example.org",
        ]);

        let config = build_config(&args).unwrap();
        assert_eq!(config.guild_ids, vec!["5", "6", "7"]);
        assert_eq!(config.api_domain, "example.org");
    }
}
