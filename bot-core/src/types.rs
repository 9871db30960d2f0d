//! Core types: bot lifecycle state, loop control signal, and the persisted bot configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BotError;

/// Lifecycle state of the bot, persisted in its configuration row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    /// Freshly created, not yet registered.
    New,
    /// Registered and waiting for an invite.
    Registered,
    /// Joined to at least one room.
    Joined,
    /// Terminal: the bot has been removed.
    Deleted,
}

impl BotState {
    pub const ALL: [BotState; 4] = [
        BotState::New,
        BotState::Registered,
        BotState::Joined,
        BotState::Deleted,
    ];

    /// Stored text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            BotState::New => "NEW",
            BotState::Registered => "REGISTERED",
            BotState::Joined => "JOINED",
            BotState::Deleted => "DELETED",
        }
    }

    /// Target of a NEXT_STATE outcome when it is fixed by the lifecycle.
    ///
    /// `Joined` returns `None`: its successor (REGISTERED or DELETED) is chosen by empty-room
    /// reconciliation. `Deleted` is terminal.
    pub fn advance(self) -> Option<BotState> {
        match self {
            BotState::New => Some(BotState::Registered),
            BotState::Registered => Some(BotState::Joined),
            BotState::Joined | BotState::Deleted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == BotState::Deleted
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotState {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BotState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BotError::Config(format!("Unknown bot state: {}", s)))
    }
}

/// State value as read back from storage. Anything that does not parse is kept verbatim so the
/// lifecycle can report it instead of failing the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedState {
    Known(BotState),
    Unknown(String),
}

impl PersistedState {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<BotState>() {
            Ok(state) => PersistedState::Known(state),
            Err(_) => PersistedState::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PersistedState::Known(state) => state.as_str(),
            PersistedState::Unknown(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<BotState> {
        match self {
            PersistedState::Known(state) => Some(*state),
            PersistedState::Unknown(_) => None,
        }
    }
}

impl From<BotState> for PersistedState {
    fn from(state: BotState) -> Self {
        PersistedState::Known(state)
    }
}

impl fmt::Display for PersistedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control signal returned by every handler. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Keep polling in the current state.
    Run,
    /// Return to the lifecycle and re-evaluate the persisted state.
    NextState,
    /// Terminate the bot loop.
    Exit,
}

impl LoopState {
    /// Strongest first: when several rooms report an outcome, the earliest entry here wins.
    pub const PRECEDENCE: [LoopState; 3] = [LoopState::Exit, LoopState::NextState, LoopState::Run];

    fn rank(self) -> usize {
        LoopState::PRECEDENCE
            .iter()
            .position(|state| *state == self)
            .unwrap_or(LoopState::PRECEDENCE.len())
    }

    /// Returns whichever of the two outcomes takes precedence.
    pub fn combine(self, other: LoopState) -> LoopState {
        if other.rank() < self.rank() {
            other
        } else {
            self
        }
    }

    /// Folds per-room outcomes into one; `Run` when there are none.
    pub fn aggregate<I>(outcomes: I) -> LoopState
    where
        I: IntoIterator<Item = LoopState>,
    {
        outcomes.into_iter().fold(LoopState::Run, LoopState::combine)
    }
}

/// Presence value sent with a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Offline,
    Unavailable,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Offline => "offline",
            Presence::Unavailable => "unavailable",
        }
    }
}

/// Default command prefix when none is configured.
pub const DEFAULT_PREFIX: &str = "!";

/// Default long-poll timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Persisted configuration of one bot instance (one row per bot id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub id: String,
    pub state: PersistedState,
    /// Sync cursor (`next_batch`) of the last persisted cycle.
    pub next_batch: Option<String>,
    pub filter_id: Option<String>,
    pub timeout_ms: u64,
    pub owner: Option<String>,
    pub prefix: Option<String>,
    pub skip_initial_sync: bool,
    /// When the last joined room is gone, move to DELETED instead of REGISTERED.
    pub exit_on_empty_rooms: bool,
}

impl BotConfig {
    /// A fresh NEW configuration with defaults.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: PersistedState::Known(BotState::New),
            next_batch: None,
            filter_id: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            owner: None,
            prefix: None,
            skip_initial_sync: true,
            exit_on_empty_rooms: false,
        }
    }

    /// Prefix used to recognise commands.
    pub fn effective_prefix(&self) -> &str {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => DEFAULT_PREFIX,
        }
    }

    pub fn set_state(&mut self, state: BotState) {
        self.state = PersistedState::Known(state);
    }
}
