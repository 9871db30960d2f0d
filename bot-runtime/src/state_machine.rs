//! # Bot lifecycle
//!
//! Top-level driver. Each outer iteration reads the persisted state and runs its handler; the
//! REGISTERED and JOINED handlers run a [`SyncLoopDriver`] until it hands control back.
//!
//! ```text
//! NEW        --NextState--> REGISTERED
//! REGISTERED --NextState--> JOINED        (invite accepted)
//! JOINED     --NextState--> REGISTERED    (no joined rooms left)
//! JOINED     --NextState--> DELETED       (no joined rooms left, exit on empty rooms)
//! DELETED    --> Exit
//! ```
//!
//! Shutdown hooks run exactly once when [`BotLifecycleStateMachine::run`] returns, whether the loop
//! ended normally, by cancellation, or with an error.

use bot_core::{BotState, LoopState, PersistedState, Result};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::behavior::BotBehavior;
use crate::context::BotContext;
use crate::router::{RoomEventRouter, RoutePath};
use crate::shutdown::ShutdownGuard;
use crate::sync_loop::SyncLoopDriver;

pub struct BotLifecycleStateMachine<B> {
    ctx: Arc<BotContext>,
    router: RoomEventRouter<B>,
}

impl<B: BotBehavior> BotLifecycleStateMachine<B> {
    pub fn new(ctx: Arc<BotContext>, behavior: Arc<B>) -> Self {
        Self {
            ctx,
            router: RoomEventRouter::new(behavior),
        }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Runs the lifecycle until a handler signals `Exit` or the context is cancelled.
    ///
    /// Errors escaping a handler end the loop and are returned after the shutdown hooks ran.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        let _guard = ShutdownGuard(&self.ctx.shutdown);

        let result = self.drive().await;
        match &result {
            Ok(()) => info!("Bot loop exited"),
            Err(e) => error!(error = %e, "Bot loop terminated with error"),
        }
        result
    }

    async fn drive(&self) -> Result<()> {
        let mut loop_state = LoopState::Run;
        while loop_state != LoopState::Exit {
            if self.ctx.is_cancelled() {
                info!("step: cancellation requested");
                break;
            }

            let config = self.ctx.config().await?;
            info!(state = %config.state, "step: evaluating bot state");

            loop_state = match config.state {
                PersistedState::Known(BotState::New) => self.new_state().await?,
                PersistedState::Known(BotState::Registered) => self.registered_state().await?,
                PersistedState::Known(BotState::Joined) => self.joined_state().await?,
                PersistedState::Known(BotState::Deleted) => self.deleted_state().await?,
                PersistedState::Unknown(raw) => self.unknown_state(&raw).await,
            };
        }
        Ok(())
    }

    async fn new_state(&self) -> Result<LoopState> {
        let outcome = self.router.behavior().on_new(&self.ctx).await?;
        if outcome == LoopState::NextState {
            if let Some(next) = BotState::New.advance() {
                self.ctx.set_state(next).await?;
                info!(state = %next, "step: state changed");
            }
        }
        Ok(outcome)
    }

    async fn registered_state(&self) -> Result<LoopState> {
        let mut handler = self.router.handler(RoutePath::Registered);
        SyncLoopDriver::new(&self.ctx).run(&mut handler).await
    }

    async fn joined_state(&self) -> Result<LoopState> {
        let mut handler = self.router.handler(RoutePath::Joined);
        SyncLoopDriver::new(&self.ctx).run(&mut handler).await
    }

    async fn deleted_state(&self) -> Result<LoopState> {
        self.router.behavior().on_deleted(&self.ctx).await?;
        info!("step: bot deleted");
        Ok(LoopState::Exit)
    }

    /// No transition is possible from an unrecognised state; wait before reading it again so an
    /// operator can repair the row without the loop spinning.
    async fn unknown_state(&self, raw: &str) -> LoopState {
        let delay = self.ctx.options.unknown_state_backoff;
        error!(
            state = %raw,
            retry_in_ms = delay.as_millis() as u64,
            "Unknown bot state"
        );
        tokio::select! {
            biased;
            _ = self.ctx.cancel.cancelled() => LoopState::Exit,
            _ = tokio::time::sleep(delay) => LoopState::Run,
        }
    }
}
