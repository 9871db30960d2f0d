//! # Matrix HTTP client
//!
//! Implementation of [`bot_core::MatrixClient`] over the Matrix client-server API (v3) using reqwest.
//!
//! Covers only the calls the bot loop needs: `/sync`, `/joined_rooms`, room join/leave, and sending
//! notices. Every request is authenticated with a bearer access token; non-2xx responses are mapped to
//! [`BotError::Client`] with the homeserver's `errcode` and `error` when the body carries them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bot_core::MatrixClient;
//! use matrix_client::HttpMatrixClient;
//!
//! async fn example() -> bot_core::Result<()> {
//!     let client = HttpMatrixClient::new("https://matrix.example.org", "syt_token".to_string())?;
//!     let rooms = client.joined_rooms().await?;
//!     println!("joined to {} rooms", rooms.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use bot_core::{BotError, MatrixClient, Presence, Result, SyncResponse};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const CLIENT_API: [&str; 3] = ["_matrix", "client", "v3"];

/// Added to the long-poll timeout so the HTTP request outlives the server-side wait.
const SYNC_GRACE: Duration = Duration::from_secs(30);

/// Masks an access token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the token.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

/// Matrix client-server API client.
#[derive(Debug, Clone)]
pub struct HttpMatrixClient {
    client: Client,
    homeserver: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MatrixErrorBody {
    errcode: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct JoinedRoomsResponse {
    #[serde(default)]
    joined_rooms: Vec<String>,
}

impl HttpMatrixClient {
    /// Creates a client for the given homeserver base URL (e.g. `https://matrix.example.org`).
    pub fn new(homeserver: &str, access_token: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| BotError::Client(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_client(client, homeserver, access_token)
    }

    /// Creates a client around an existing reqwest client (shared pools, custom TLS, proxies).
    pub fn with_client(client: Client, homeserver: &str, access_token: String) -> Result<Self> {
        let homeserver = Url::parse(homeserver).map_err(|e| {
            BotError::Config(format!("Invalid homeserver URL {}: {}", homeserver, e))
        })?;
        if homeserver.cannot_be_a_base() {
            return Err(BotError::Config(format!(
                "Homeserver URL cannot be used as a base: {}",
                homeserver
            )));
        }

        info!(
            homeserver = %homeserver,
            access_token = %mask_token(&access_token),
            "Matrix client created"
        );

        Ok(Self {
            client,
            homeserver,
            access_token,
        })
    }

    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Builds `{homeserver}/_matrix/client/v3/{segments...}`; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| BotError::Config(format!("Invalid homeserver URL: {}", self.homeserver)))?
            .pop_if_empty()
            .extend(CLIENT_API)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| BotError::Client(format!("Matrix {} request failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<MatrixErrorBody>(&body) {
            Ok(err) => format!("{}: {}", err.errcode, err.error),
            Err(_) => body.chars().take(300).collect(),
        };
        Err(BotError::Client(format!(
            "Matrix {} failed: HTTP {} {}",
            what, status, detail
        )))
    }
}

#[async_trait]
impl MatrixClient for HttpMatrixClient {
    async fn sync(
        &self,
        filter: Option<&str>,
        since: Option<&str>,
        full_state: bool,
        set_presence: Option<Presence>,
        timeout_ms: u64,
    ) -> Result<SyncResponse> {
        let url = self.endpoint(&["sync"])?;

        let mut query: Vec<(&str, String)> = vec![
            ("timeout", timeout_ms.to_string()),
            ("full_state", full_state.to_string()),
        ];
        if let Some(filter) = filter {
            query.push(("filter", filter.to_string()));
        }
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        if let Some(presence) = set_presence {
            query.push(("set_presence", presence.as_str().to_string()));
        }

        debug!(since = ?since, timeout_ms, "Matrix /sync request");

        let request = self
            .client
            .get(url)
            .query(&query)
            .timeout(Duration::from_millis(timeout_ms) + SYNC_GRACE);
        let response = self.send(request, "/sync").await?;

        let sync = response
            .json::<SyncResponse>()
            .await
            .map_err(|e| BotError::Client(format!("Matrix /sync response parse failed: {}", e)))?;

        debug!(
            next_batch = %sync.next_batch,
            invited = sync.rooms.invite.len(),
            joined = sync.rooms.join.len(),
            left = sync.rooms.leave.len(),
            "Matrix /sync response"
        );
        Ok(sync)
    }

    async fn joined_rooms(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["joined_rooms"])?;
        let response = self.send(self.client.get(url), "/joined_rooms").await?;
        let body = response.json::<JoinedRoomsResponse>().await.map_err(|e| {
            BotError::Client(format!("Matrix /joined_rooms response parse failed: {}", e))
        })?;
        Ok(body.joined_rooms)
    }

    async fn leave_room(&self, room_id: &str) -> Result<()> {
        let url = self.endpoint(&["rooms", room_id, "leave"])?;
        let request = self.client.post(url).json(&serde_json::json!({}));
        self.send(request, "leave").await?;
        info!(room_id = %room_id, "Left room");
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        let url = self.endpoint(&["join", room_id])?;
        let request = self.client.post(url).json(&serde_json::json!({}));
        self.send(request, "join").await?;
        info!(room_id = %room_id, "Joined room");
        Ok(())
    }

    async fn send_notice(&self, room_id: &str, text: &str) -> Result<()> {
        let txn_id = uuid::Uuid::new_v4().to_string();
        let url = self.endpoint(&["rooms", room_id, "send", "m.room.message", &txn_id])?;
        let body = serde_json::json!({
            "msgtype": "m.notice",
            "body": text,
        });
        self.send(self.client.put(url).json(&body), "send").await?;
        debug!(room_id = %room_id, txn_id = %txn_id, "Sent notice");
        Ok(())
    }
}
