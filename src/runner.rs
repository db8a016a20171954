use tracing::{error, info};

use crate::api::{ApiClient, GuildSource};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::period::RunPeriod;
use crate::state::HistoryDocument;

/// What happened to one guild during a run
#[derive(Debug, Clone, PartialEq)]
pub enum GuildOutcome {
    /// Donors were written to the history
    Recorded { donors: usize },
    /// Fetch succeeded but nobody donated; history left untouched
    NoDonors,
    /// Fetch or decode failed; history left untouched
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<(String, GuildOutcome)>,
}

impl RunSummary {
    pub fn recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, GuildOutcome::Recorded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, GuildOutcome::Failed(_)))
            .count()
    }
}

/// Check every configured guild in order and merge today's donors into
/// `history`. Per-guild failures are logged and skipped.
pub async fn run(
    source: &dyn GuildSource,
    config: &TrackerConfig,
    period: &RunPeriod,
    history: &mut HistoryDocument,
) -> RunSummary {
    let date_key = period.date_key();
    let month_key = period.month_key();
    let mut summary = RunSummary::default();

    for guild_id in &config.guild_ids {
        let outcome = match source.fetch_donation_data(guild_id).await {
            Ok(snapshot) if !snapshot.donated_ids.is_empty() => {
                let donors = snapshot.donated_ids.len();
                info!(
                    "[SUCCESS] Guild {} ({}) found {} donors.",
                    guild_id, snapshot.name, donors
                );
                history.record(
                    guild_id,
                    &month_key,
                    &date_key,
                    snapshot.donated_ids,
                    snapshot.members,
                );
                GuildOutcome::Recorded { donors }
            }
            Ok(snapshot) => {
                info!("[SKIP] Guild {} ({}) found 0 donors.", guild_id, snapshot.name);
                GuildOutcome::NoDonors
            }
            Err(e) => {
                error!("Error fetching data for Guild {}: {}", guild_id, e);
                GuildOutcome::Failed(e.to_string())
            }
        };
        summary.outcomes.push((guild_id.clone(), outcome));
    }

    summary
}

/// Full job: load history, check all guilds, write history back once
pub async fn execute(config: &TrackerConfig, period: &RunPeriod) -> Result<RunSummary> {
    info!("--- Running Daily Donation Check ({}) ---", period.date_key());

    let mut history = HistoryDocument::load_or_default(&config.history_file).await;
    let client = ApiClient::from_config(config);
    info!(
        "Checking {} guild(s) against {}",
        config.guild_ids.len(),
        client.base_url()
    );

    let summary = run(&client, config, period, &mut history).await;

    history.save(&config.history_file).await?;
    info!("Successfully updated and saved {}", config.history_file);

    Ok(summary)
}
