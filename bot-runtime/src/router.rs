//! # Room event router
//!
//! Splits a sync response into invited / joined / left room deltas and hands them to the bot behavior.
//!
//! - **REGISTERED:** invite-state events per invited room go to [`BotBehavior::on_invites`].
//! - **JOINED:** left rooms still in the joined listing are left; each joined room's timeline goes to
//!   [`BotBehavior::on_joined_room`]; per-room outcomes are folded with [`LoopState::aggregate`]. If no
//!   joined room remains afterwards, the bot moves to DELETED (exit on empty rooms) or REGISTERED.
//!   Failures to list or leave rooms are logged; the joined rooms of the batch are routed regardless.

use async_trait::async_trait;
use bot_core::{BotState, Event, LoopState, Result, Rooms, SyncResponse};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::behavior::BotBehavior;
use crate::context::BotContext;
use crate::sync_loop::{CycleOutcome, SyncHandler};

/// Invite-state events keyed by invited room id.
pub fn invite_events(rooms: &Rooms) -> BTreeMap<String, Vec<Event>> {
    rooms
        .invite
        .iter()
        .map(|(room_id, room)| (room_id.clone(), room.invite_state.events.clone()))
        .collect()
}

/// Which lifecycle state a sync response is routed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePath {
    Registered,
    Joined,
}

pub struct RoomEventRouter<B> {
    behavior: Arc<B>,
}

impl<B: BotBehavior> RoomEventRouter<B> {
    pub fn new(behavior: Arc<B>) -> Self {
        Self { behavior }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    /// A sync handler routing every response along `path`.
    pub fn handler(&self, path: RoutePath) -> RouteHandler<'_, B> {
        RouteHandler { router: self, path }
    }

    #[instrument(skip_all, fields(next_batch = %response.next_batch))]
    pub async fn route_registered(
        &self,
        ctx: &BotContext,
        response: &SyncResponse,
    ) -> Result<CycleOutcome> {
        let invites = invite_events(&response.rooms);
        debug!(invited = invites.len(), "step: routing invites");

        let outcome = self.behavior.on_invites(ctx, &invites).await?;
        if outcome == LoopState::NextState {
            if let Some(next) = BotState::Registered.advance() {
                return Ok(CycleOutcome::transition_to(next));
            }
        }
        Ok(outcome.into())
    }

    #[instrument(skip_all, fields(next_batch = %response.next_batch))]
    pub async fn route_joined(
        &self,
        ctx: &BotContext,
        response: &SyncResponse,
    ) -> Result<CycleOutcome> {
        if let Err(e) = self.leave_departed_rooms(ctx, &response.rooms).await {
            warn!(error = %e, "Failed to list joined rooms before leaving departed rooms");
        }

        let mut outcomes = Vec::with_capacity(response.rooms.join.len());
        for (room_id, room) in &response.rooms.join {
            let outcome = match self
                .behavior
                .on_joined_room(ctx, room_id, &room.timeline.events)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "Joined room handler failed");
                    LoopState::Run
                }
            };
            debug!(room_id = %room_id, outcome = ?outcome, "step: joined room processed");
            outcomes.push(outcome);
        }
        let aggregate = LoopState::aggregate(outcomes);

        let remaining = match ctx.client.joined_rooms().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(error = %e, "Failed to list joined rooms, keeping routed outcome");
                return Ok(aggregate.into());
            }
        };
        if remaining.is_empty() {
            let config = ctx.config().await?;
            let target = if config.exit_on_empty_rooms {
                BotState::Deleted
            } else {
                BotState::Registered
            };
            info!(target = %target, "step: no joined rooms left");
            return Ok(CycleOutcome::transition_to(target));
        }

        Ok(aggregate.into())
    }

    /// Leaves every room reported as left that the homeserver still lists as joined. Only the listing
    /// failure is returned; a failed leave is logged and the remaining rooms are still tried.
    async fn leave_departed_rooms(&self, ctx: &BotContext, rooms: &Rooms) -> Result<usize> {
        if rooms.leave.is_empty() {
            return Ok(0);
        }

        let joined: HashSet<String> = ctx.client.joined_rooms().await?.into_iter().collect();
        let mut left = 0;
        for room_id in rooms.leave.keys() {
            if joined.contains(room_id) {
                match ctx.client.leave_room(room_id).await {
                    Ok(()) => {
                        info!(room_id = %room_id, "step: left room");
                        left += 1;
                    }
                    Err(e) => warn!(room_id = %room_id, error = %e, "Failed to leave room"),
                }
            } else {
                debug!(room_id = %room_id, "Room already left");
            }
        }
        Ok(left)
    }
}

/// [`SyncHandler`] adapter over [`RoomEventRouter`].
pub struct RouteHandler<'r, B> {
    router: &'r RoomEventRouter<B>,
    path: RoutePath,
}

#[async_trait]
impl<'r, B: BotBehavior> SyncHandler for RouteHandler<'r, B> {
    async fn handle(&mut self, ctx: &BotContext, response: &SyncResponse) -> Result<CycleOutcome> {
        match self.path {
            RoutePath::Registered => self.router.route_registered(ctx, response).await,
            RoutePath::Joined => self.router.route_joined(ctx, response).await,
        }
    }
}
