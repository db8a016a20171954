//! Client for the game server's guild endpoints

pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::donations::{extract_donors, DonorSet};
use crate::error::{Result, TrackerError};

pub use types::{GuildInfoResponse, GuildMember, MemberRecord};

/// Everything one guild contributes to a run
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSnapshot {
    pub name: String,
    pub donated_ids: DonorSet,
    pub members: Vec<GuildMember>,
}

/// Source of per-guild donation snapshots
#[async_trait]
pub trait GuildSource: Send + Sync {
    async fn fetch_donation_data(&self, guild_id: &str) -> Result<GuildSnapshot>;
}

/// HTTP client for the game API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.api_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn members_url(&self, guild_id: &str) -> String {
        format!(
            "{}/api/game_guild_member?waiting=0&guild={}",
            self.base_url, guild_id
        )
    }

    fn guild_info_url(&self, guild_id: &str) -> String {
        format!(
            "{}/api/get_data_by_id?table=game_guild&data=data,donate&id={}",
            self.base_url, guild_id
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, what: String) -> Result<T> {
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::Http {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TrackerError::Http {
            url: url.clone(),
            source: e,
        })?;

        // The game server sometimes answers with an error status but a usable body
        match serde_json::from_str(&body) {
            Ok(parsed) => {
                if !status.is_success() {
                    debug!("Using body of HTTP {} response from {}", status.as_u16(), url);
                }
                Ok(parsed)
            }
            Err(_) if !status.is_success() => Err(TrackerError::Status {
                url,
                status: status.as_u16(),
            }),
            Err(e) => Err(TrackerError::Decode { what, source: e }),
        }
    }
}

#[async_trait]
impl GuildSource for ApiClient {
    async fn fetch_donation_data(&self, guild_id: &str) -> Result<GuildSnapshot> {
        let (members, info) = tokio::try_join!(
            self.get_json::<Vec<MemberRecord>>(
                self.members_url(guild_id),
                format!("member list of guild {}", guild_id),
            ),
            self.get_json::<GuildInfoResponse>(
                self.guild_info_url(guild_id),
                format!("info of guild {}", guild_id),
            ),
        )?;

        let meta = info
            .data
            .ok_or_else(|| TrackerError::GuildNotFound {
                guild_id: guild_id.to_string(),
            })?
            .into_inner();
        let ledger = info.donate.map(|d| d.into_inner()).unwrap_or_default();

        debug!(
            "Guild {}: {} members, {} ledger entries",
            guild_id,
            members.len(),
            ledger.entry_count()
        );

        let members: Vec<GuildMember> = members.into_iter().map(GuildMember::from).collect();
        let donated_ids = extract_donors(members.iter().map(|m| m.id.as_str()), &ledger);

        Ok(GuildSnapshot {
            name: meta.name,
            donated_ids,
            members,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn guild_members(guild: &str) -> Option<Value> {
        match guild {
            "64" => Some(json!([
                {"id_game_character": "1001", "info": "{\"name\":\"Alice\"}"},
                {"id_game_character": "1002", "info": "{\"name\":\"Bob\"}"},
                {"id_game_character": 1003, "info": "{\"name\":\"Cara\"}"}
            ])),
            "7" => Some(json!([
                {"id_game_character": "2001", "info": "{\"name\":\"Dan\"}"}
            ])),
            "40" => Some(json!([])),
            "13" => Some(json!([
                {"id_game_character": "3001", "info": "not json"}
            ])),
            "77" => Some(json!([
                {"id_game_character": "4001", "info": "{\"name\":\"Eve\"}"}
            ])),
            _ => None,
        }
    }

    fn guild_info(guild: &str) -> Value {
        match guild {
            "64" => json!({
                "data": "{\"name\":\"Dragons\"}",
                "donate": "{\"1001\":200,\"1002\":\"2\",\"1003\":0,\"9999\":50}"
            }),
            "7" => json!({"data": "{\"name\":\"Quiet\"}", "donate": null}),
            "13" => json!({"data": "{\"name\":\"Broken\"}"}),
            "77" => json!({"data": "{\"name\":\"Flaky\"}", "donate": "{\"4001\":10}"}),
            _ => json!({"donate": ""}),
        }
    }

    async fn members_handler(Query(q): Query<HashMap<String, String>>) -> Response {
        let guild = q.get("guild").map(String::as_str).unwrap_or_default();
        match guild_members(guild) {
            // Error status with a valid body
            Some(body) if guild == "77" => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            Some(body) => Json(body).into_response(),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        }
    }

    async fn info_handler(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(q.get("table").map(String::as_str), Some("game_guild"));
        assert_eq!(q.get("data").map(String::as_str), Some("data,donate"));
        Json(guild_info(q.get("id").map(String::as_str).unwrap_or_default()))
    }

    /// Serve a fake game API on an ephemeral port and return its base URL
    pub(crate) async fn spawn_fake_api() -> String {
        let app = Router::new()
            .route("/api/game_guild_member", get(members_handler))
            .route("/api/get_data_by_id", get(info_handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_collects_positive_donors() {
        let client = ApiClient::new(spawn_fake_api().await);

        let snapshot = client.fetch_donation_data("64").await.unwrap();

        assert_eq!(snapshot.name, "Dragons");
        assert_eq!(
            snapshot.donated_ids.ids().collect::<Vec<_>>(),
            vec!["1001", "1002"]
        );
        assert_eq!(snapshot.members.len(), 3);
        assert_eq!(snapshot.members[2].id, "1003");
        assert_eq!(snapshot.members[2].name.as_deref(), Some("Cara"));
    }

    #[tokio::test]
    async fn test_missing_ledger_means_no_donors() {
        let client = ApiClient::new(spawn_fake_api().await);

        let snapshot = client.fetch_donation_data("7").await.unwrap();

        assert_eq!(snapshot.name, "Quiet");
        assert!(snapshot.donated_ids.is_empty());
        assert_eq!(snapshot.members.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_data_is_guild_not_found() {
        let client = ApiClient::new(spawn_fake_api().await);

        let err = client.fetch_donation_data("40").await.unwrap_err();
        assert!(matches!(err, TrackerError::GuildNotFound { ref guild_id } if guild_id == "40"));
    }

    #[tokio::test]
    async fn test_server_error_and_bad_payloads_fail() {
        let client = ApiClient::new(spawn_fake_api().await);

        let err = client.fetch_donation_data("500").await.unwrap_err();
        assert!(matches!(err, TrackerError::Status { status: 500, .. }));

        let err = client.fetch_donation_data("13").await.unwrap_err();
        assert!(matches!(err, TrackerError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_error_status_with_valid_body_is_used() {
        let client = ApiClient::new(spawn_fake_api().await);

        let snapshot = client.fetch_donation_data("77").await.unwrap();

        assert_eq!(snapshot.name, "Flaky");
        assert_eq!(snapshot.donated_ids.ids().collect::<Vec<_>>(), vec!["4001"]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{}", addr));
        let err = client.fetch_donation_data("64").await.unwrap_err();
        assert!(matches!(err, TrackerError::Http { .. }));
    }

    #[test]
    fn test_urls_follow_api_layout() {
        let client = ApiClient::new("https://cmangax8.com/");
        assert_eq!(
            client.members_url("64"),
            "https://cmangax8.com/api/game_guild_member?waiting=0&guild=64"
        );
        assert_eq!(
            client.guild_info_url("64"),
            "https://cmangax8.com/api/get_data_by_id?table=game_guild&data=data,donate&id=64"
        );
    }
}
