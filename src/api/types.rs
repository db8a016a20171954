//! Wire types for the game API
//!
//! Several fields arrive as JSON documents serialised into strings
//! (`info`, `data`, `donate`). They are decoded through [`Embedded`] so the
//! double encoding is handled in one place.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

use crate::donations::DonationLedger;

/// A value that the API sends as a JSON string containing JSON.
/// An already-decoded object is accepted too.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded<T>(pub T);

impl<T> Embedded<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<'de, T> Deserialize<'de> for Embedded<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        decode_embedded(value).map(Embedded).map_err(D::Error::custom)
    }
}

fn decode_embedded<T: DeserializeOwned>(value: serde_json::Value) -> serde_json::Result<T> {
    match value {
        serde_json::Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    }
}

/// Like `Option<Embedded<T>>`, but `null`, `""` and `false` all count as absent
fn optional_embedded<'de, D, T>(deserializer: D) -> Result<Option<Embedded<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => decode_embedded(v).map(|t| Some(Embedded(t))).map_err(D::Error::custom),
    }
}

/// Character IDs show up both as strings and as numbers
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected character id, got {}",
            other
        ))),
    }
}

/// One row of `/api/game_guild_member`
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    #[serde(deserialize_with = "id_string")]
    pub id_game_character: String,
    pub info: Embedded<MemberInfo>,
}

/// Decoded `info` of a member record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberInfo {
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of `/api/get_data_by_id?table=game_guild&data=data,donate`
#[derive(Debug, Clone, Deserialize)]
pub struct GuildInfoResponse {
    #[serde(default, deserialize_with = "optional_embedded")]
    pub data: Option<Embedded<GuildMeta>>,

    #[serde(default, deserialize_with = "optional_embedded")]
    pub donate: Option<Embedded<DonationLedger>>,
}

/// Decoded `data` of a guild
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildMeta {
    #[serde(default)]
    pub name: String,
}

/// Roster entry as stored in the history file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMember {
    pub id: String,
    pub name: Option<String>,
}

impl From<MemberRecord> for GuildMember {
    fn from(record: MemberRecord) -> Self {
        Self {
            id: record.id_game_character,
            name: record.info.into_inner().name,
        }
    }
}
