//! # bot-runtime
//!
//! Long-running Matrix bot driver: a lifecycle state machine ([`BotLifecycleStateMachine`]) over an
//! incremental `/sync` loop ([`SyncLoopDriver`]), with room deltas routed by [`RoomEventRouter`] to a
//! pluggable [`BotBehavior`]. The sync cursor is persisted after every cycle through the
//! [`storage::ConfigStore`], so a restart resumes where the last committed cycle ended.

mod behavior;
mod command;
mod commands;
mod context;
mod router;
mod shutdown;
mod state_machine;
mod sync_loop;

pub use behavior::{BotBehavior, DefaultBehavior};
pub use command::{Command, CommandRegistry};
pub use commands::PrefixCommand;
pub use context::{BotContext, RuntimeOptions};
pub use router::{invite_events, RoomEventRouter, RouteHandler, RoutePath};
pub use shutdown::ShutdownHooks;
pub use state_machine::BotLifecycleStateMachine;
pub use sync_loop::{Backoff, CycleOutcome, SyncHandler, SyncLoopDriver};
pub use tokio_util::sync::CancellationToken;
