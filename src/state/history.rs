use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::api::GuildMember;
use crate::donations::DonorSet;
use crate::error::{Result, TrackerError};

/// Donation history across all tracked guilds
///
/// Layout written by this tool:
/// `{ guildId: { "YYYY-MM": { "YYYY-MM-DD": {memberId: true} }, "members": [...] } }`
///
/// Guild entries are kept as raw JSON. Only the keys a run touches are
/// rewritten; anything else in the file (older layouts, numeric member IDs,
/// extra fields) is carried through untouched. Keys are ordered, so the same
/// content always serialises to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryDocument {
    guilds: Map<String, Value>,
}

impl HistoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. A missing file is an empty history.
    pub async fn load(path: &str) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| TrackerError::HistoryParse {
                path: path.to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing history file at {}. Starting fresh.", path);
                Ok(Self::new())
            }
            Err(e) => Err(TrackerError::HistoryLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Load, falling back to an empty history on any failure
    pub async fn load_or_default(path: &str) -> Self {
        Self::load(path).await.unwrap_or_else(|e| {
            warn!("Could not load history: {}. Starting fresh.", e);
            Self::new()
        })
    }

    /// Save to a JSON file atomically, pretty-printed with 2-space indent
    pub async fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| TrackerError::HistorySave {
                path: path.to_string(),
                source: e.into(),
            })?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| TrackerError::HistorySave {
                path: path.to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| TrackerError::HistorySave {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Store a day's donors and replace the guild's roster.
    /// An existing entry for the same date is overwritten; other months,
    /// dates and keys of the guild are left as they are.
    pub fn record(
        &mut self,
        guild_id: &str,
        month_key: &str,
        date_key: &str,
        donors: DonorSet,
        roster: Vec<GuildMember>,
    ) {
        let mut guild = take_object(&mut self.guilds, guild_id);
        let mut month = take_object(&mut guild, month_key);
        month.insert(date_key.to_string(), donors_value(&donors));
        guild.insert(month_key.to_string(), Value::Object(month));
        guild.insert("members".to_string(), roster_value(roster));
        self.guilds.insert(guild_id.to_string(), Value::Object(guild));
    }

    #[cfg(test)]
    pub fn guild(&self, guild_id: &str) -> Option<&Value> {
        self.guilds.get(guild_id)
    }

    /// Donors recorded for a guild on a date
    #[cfg(test)]
    pub fn day(&self, guild_id: &str, month_key: &str, date_key: &str) -> Option<&Value> {
        self.guilds.get(guild_id)?.get(month_key)?.get(date_key)
    }

    #[cfg(test)]
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

/// Remove the object under `key`; a missing or non-object value yields an empty one
fn take_object(parent: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match parent.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn donors_value(donors: &DonorSet) -> Value {
    Value::Object(
        donors
            .ids()
            .map(|id| (id.to_string(), Value::Bool(true)))
            .collect(),
    )
}

fn roster_value(roster: Vec<GuildMember>) -> Value {
    Value::Array(
        roster
            .into_iter()
            .map(|member| {
                let mut entry = Map::new();
                entry.insert("id".to_string(), Value::String(member.id));
                if let Some(name) = member.name {
                    entry.insert("name".to_string(), Value::String(name));
                }
                Value::Object(entry)
            })
            .collect(),
    )
}
