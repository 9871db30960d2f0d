//! Homeserver client abstraction used by the bot loop.
//!
//! [`MatrixClient`] is transport-agnostic; `matrix-client` implements it over HTTP, tests use in-memory fakes.

use crate::error::Result;
use crate::sync::SyncResponse;
use crate::types::Presence;
use async_trait::async_trait;

/// Calls the bot loop needs from the homeserver. Transport-level retries, if any, live in the implementation.
#[async_trait]
pub trait MatrixClient: Send + Sync {
    /// Long-polls for events newer than `since`, waiting up to `timeout_ms` on the server.
    async fn sync(
        &self,
        filter: Option<&str>,
        since: Option<&str>,
        full_state: bool,
        set_presence: Option<Presence>,
        timeout_ms: u64,
    ) -> Result<SyncResponse>;
    /// Ids of rooms the bot is currently joined to.
    async fn joined_rooms(&self) -> Result<Vec<String>>;
    /// Leaves the given room.
    async fn leave_room(&self, room_id: &str) -> Result<()>;
    /// Joins the given room (accepting a pending invite).
    async fn join_room(&self, room_id: &str) -> Result<()>;
    /// Sends an `m.notice` text message to the room.
    async fn send_notice(&self, room_id: &str, text: &str) -> Result<()>;
}
