//! Per-state bot behavior plugged into the lifecycle.

use async_trait::async_trait;
use bot_core::{Event, LoopState, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::command::CommandRegistry;
use crate::commands::PrefixCommand;
use crate::context::BotContext;

/// What the bot does in each lifecycle state. The lifecycle owns polling, cursor persistence and
/// state transitions; a behavior only decides the outcome of each step.
#[async_trait]
pub trait BotBehavior: Send + Sync {
    /// NEW: registration side effects. `NextState` moves the bot to REGISTERED.
    async fn on_new(&self, ctx: &BotContext) -> Result<LoopState>;

    /// REGISTERED: ordered invite-state events per invited room. `NextState` moves the bot to JOINED.
    async fn on_invites(
        &self,
        ctx: &BotContext,
        invites: &BTreeMap<String, Vec<Event>>,
    ) -> Result<LoopState>;

    /// JOINED: ordered timeline events of one joined room.
    async fn on_joined_room(
        &self,
        ctx: &BotContext,
        room_id: &str,
        events: &[Event],
    ) -> Result<LoopState>;

    /// DELETED: called once before the lifecycle exits.
    async fn on_deleted(&self, _ctx: &BotContext) -> Result<()> {
        Ok(())
    }
}

/// Accepts the owner's invite and answers commands in joined rooms.
#[derive(Clone)]
pub struct DefaultBehavior {
    commands: CommandRegistry,
}

impl DefaultBehavior {
    pub fn new(commands: CommandRegistry) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }
}

impl Default for DefaultBehavior {
    fn default() -> Self {
        Self::new(CommandRegistry::new().register(Arc::new(PrefixCommand)))
    }
}

/// Sender of the membership invite addressed to the bot (any invite when the bot id is unknown).
fn inviter<'e>(events: &'e [Event], bot_user_id: Option<&str>) -> Option<&'e str> {
    events
        .iter()
        .find(|event| {
            event.membership() == Some("invite")
                && bot_user_id.map_or(true, |bot| event.state_key.as_deref() == Some(bot))
        })
        .map(|event| event.sender.as_str())
}

#[async_trait]
impl BotBehavior for DefaultBehavior {
    async fn on_new(&self, _ctx: &BotContext) -> Result<LoopState> {
        info!("step: account already provisioned, moving to REGISTERED");
        Ok(LoopState::NextState)
    }

    async fn on_invites(
        &self,
        ctx: &BotContext,
        invites: &BTreeMap<String, Vec<Event>>,
    ) -> Result<LoopState> {
        if invites.is_empty() {
            return Ok(LoopState::Run);
        }

        let config = ctx.config().await?;
        for (room_id, events) in invites {
            let inviter = inviter(events, ctx.options.bot_user_id.as_deref());
            let accepted = match config.owner.as_deref() {
                None => true,
                Some(owner) => inviter == Some(owner),
            };
            if !accepted {
                warn!(room_id = %room_id, inviter = ?inviter, "Ignoring invite not sent by the owner");
                continue;
            }

            ctx.client.join_room(room_id).await?;
            info!(room_id = %room_id, inviter = ?inviter, "step: invite accepted");
            return Ok(LoopState::NextState);
        }
        Ok(LoopState::Run)
    }

    async fn on_joined_room(
        &self,
        ctx: &BotContext,
        room_id: &str,
        events: &[Event],
    ) -> Result<LoopState> {
        for event in events {
            if ctx.is_own_event(&event.sender) {
                continue;
            }
            if let Err(e) = self.commands.dispatch(ctx, room_id, event).await {
                warn!(
                    room_id = %room_id,
                    event_id = ?event.event_id,
                    error = %e,
                    "Command failed"
                );
            }
        }
        debug!(room_id = %room_id, events = events.len(), "step: room timeline processed");
        Ok(LoopState::Run)
    }
}
