use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // API errors
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Guild ID {guild_id} not found")]
    GuildNotFound { guild_id: String },

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    // History errors
    #[error("Failed to read history from '{path}': {source}")]
    HistoryLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse history file '{path}': {source}")]
    HistoryParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write history file '{path}': {source}")]
    HistorySave {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
