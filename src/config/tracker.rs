use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

pub const DEFAULT_API_DOMAIN: &str = "cmangax8.com";
pub const DEFAULT_HISTORY_FILE: &str = "donation_history.json";
pub const DEFAULT_GUILD_IDS: &[&str] = &["64", "40"];

/// Settings for one tracker run
///
/// Recognised keys in a config file are `apiDomain`, `guildIds` and
/// `historyFile`. Missing keys fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// Host of the game API, e.g. "cmangax8.com"
    pub api_domain: String,

    /// Guilds to check, processed in this order
    #[serde(deserialize_with = "deserialize_guild_ids")]
    pub guild_ids: Vec<String>,

    /// Where the donation history is read from and written to
    pub history_file: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_domain: DEFAULT_API_DOMAIN.to_string(),
            guild_ids: DEFAULT_GUILD_IDS.iter().map(|id| id.to_string()).collect(),
            history_file: DEFAULT_HISTORY_FILE.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TrackerError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| TrackerError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    /// Override fields from `API_DOMAIN`, `GUILD_IDS` and `HISTORY_FILE`
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(domain) = lookup("API_DOMAIN").filter(|v| !v.trim().is_empty()) {
            self.api_domain = domain.trim().to_string();
        }
        if let Some(ids) = lookup("GUILD_IDS").filter(|v| !v.trim().is_empty()) {
            self.guild_ids = parse_guild_list(&ids);
        }
        if let Some(path) = lookup("HISTORY_FILE").filter(|v| !v.trim().is_empty()) {
            self.history_file = path.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_domain.trim().is_empty() {
            return Err(TrackerError::ConfigValidation {
                message: "apiDomain must not be empty".to_string(),
            });
        }
        if self.guild_ids.is_empty() {
            return Err(TrackerError::ConfigValidation {
                message: "at least one guild ID is required".to_string(),
            });
        }
        if let Some(bad) = self
            .guild_ids
            .iter()
            .find(|id| id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(TrackerError::ConfigValidation {
                message: format!("guild ID '{}' is not numeric", bad),
            });
        }
        Ok(())
    }

    /// Base URL for API requests. A bare host gets `https://`; a value that
    /// already carries a scheme is used as-is.
    pub fn api_base_url(&self) -> String {
        let domain = self.api_domain.trim().trim_end_matches('/');
        if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        }
    }
}

/// Split a comma-separated guild list, dropping blanks
pub fn parse_guild_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GuildIdValue {
    Text(String),
    Number(u64),
}

fn deserialize_guild_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Vec::<GuildIdValue>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            GuildIdValue::Text(s) => s.trim().to_string(),
            GuildIdValue::Number(n) => n.to_string(),
        })
        .collect())
}
