//! # bot-core
//!
//! Core types and traits for the Matrix bot: lifecycle [`BotState`], loop control [`LoopState`],
//! the persisted [`BotConfig`], the `/sync` response model, the [`MatrixClient`] facade, and tracing
//! initialization. Transport-agnostic; used by storage, matrix-client and bot-runtime.

pub mod client;
pub mod error;
pub mod logger;
pub mod sync;
pub mod types;

pub use client::MatrixClient;
pub use error::{BotError, Result};
pub use logger::init_tracing;
pub use sync::{
    Event, EventList, InvitedRoom, JoinedRoom, LeftRoom, Rooms, SyncResponse, Timeline,
    ROOM_MEMBER, ROOM_MESSAGE,
};
pub use types::{
    BotConfig, BotState, LoopState, PersistedState, Presence, DEFAULT_PREFIX, DEFAULT_TIMEOUT_MS,
};
