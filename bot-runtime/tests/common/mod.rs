//! Shared fixtures for bot-runtime integration tests.

#![allow(dead_code)]

pub mod fake_matrix_client;

use bot_core::{
    BotConfig, Event, EventList, InvitedRoom, JoinedRoom, LeftRoom, SyncResponse, Timeline,
    ROOM_MEMBER, ROOM_MESSAGE,
};
use bot_runtime::{BotContext, RuntimeOptions};
use std::sync::Arc;
use std::time::Duration;
use storage::{ConfigStore, SqliteConfigStore};

pub use fake_matrix_client::{FakeMatrixClient, SyncCall};

pub const BOT: &str = "@bot:example.org";
pub const OWNER: &str = "@owner:example.org";

/// Zero backoffs so retry paths do not slow tests down.
pub fn fast_options() -> RuntimeOptions {
    RuntimeOptions {
        poll_backoff_base: Duration::ZERO,
        poll_backoff_max: Duration::ZERO,
        unknown_state_backoff: Duration::ZERO,
        bot_user_id: Some(BOT.to_string()),
    }
}

/// Context over a fresh in-memory store seeded with `config`. The fake client's token cancels the loop
/// once its scripted responses run out.
pub async fn context(config: BotConfig, client: &Arc<FakeMatrixClient>) -> BotContext {
    let store = SqliteConfigStore::new("sqlite::memory:", config)
        .await
        .expect("Failed to create store");
    BotContext::new(Arc::new(store), client.clone())
        .with_options(fast_options())
        .with_cancellation(client.cancel.clone())
}

pub async fn load(ctx: &BotContext) -> BotConfig {
    ctx.store.load().await.expect("Failed to load config")
}

pub fn response(next_batch: &str) -> SyncResponse {
    SyncResponse {
        next_batch: next_batch.to_string(),
        ..Default::default()
    }
}

pub fn with_invite(mut response: SyncResponse, room_id: &str, inviter: &str) -> SyncResponse {
    response.rooms.invite.insert(
        room_id.to_string(),
        InvitedRoom {
            invite_state: EventList {
                events: vec![invite_event(inviter, BOT)],
            },
        },
    );
    response
}

pub fn with_joined(mut response: SyncResponse, room_id: &str, events: Vec<Event>) -> SyncResponse {
    response.rooms.join.insert(
        room_id.to_string(),
        JoinedRoom {
            timeline: Timeline {
                events,
                ..Default::default()
            },
        },
    );
    response
}

pub fn with_left(mut response: SyncResponse, room_id: &str) -> SyncResponse {
    response
        .rooms
        .leave
        .insert(room_id.to_string(), LeftRoom::default());
    response
}

pub fn message(sender: &str, body: &str) -> Event {
    Event {
        event_type: ROOM_MESSAGE.to_string(),
        sender: sender.to_string(),
        event_id: Some(format!("$evt-{}", body.len())),
        state_key: None,
        origin_server_ts: Some(1_700_000_000_000),
        content: serde_json::json!({"msgtype": "m.text", "body": body}),
    }
}

pub fn invite_event(sender: &str, target: &str) -> Event {
    Event {
        event_type: ROOM_MEMBER.to_string(),
        sender: sender.to_string(),
        event_id: None,
        state_key: Some(target.to_string()),
        origin_server_ts: None,
        content: serde_json::json!({"membership": "invite"}),
    }
}
