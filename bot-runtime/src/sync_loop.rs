//! # Sync loop
//!
//! Drives the poll → handle → persist cycle against `/sync` for one lifecycle state.
//!
//! - The first poll uses the persisted cursor with a zero timeout (catch-up).
//! - On a cold start with `skip_initial_sync`, that first cursor is committed without showing its
//!   payload to the handler, and polling resumes from it with the full timeout.
//! - Every response's cursor is committed after its handler ran, also when the handler failed. A state
//!   transition requested by the handler is committed in the same transaction.
//! - A cursor is never polled with before it is committed: failed commits are retried with the same
//!   backoff as polls.
//! - Handler and poll failures are logged and retried; poll retries back off exponentially.
//! - The loop returns on `NextState`/`Exit` from the handler, or `Exit` once cancelled.

use async_trait::async_trait;
use bot_core::{BotState, LoopState, Result, SyncResponse};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::context::BotContext;

/// Outcome of handling one sync response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub loop_state: LoopState,
    /// State to persist together with this response's cursor.
    pub transition: Option<BotState>,
}

impl CycleOutcome {
    pub fn run() -> Self {
        LoopState::Run.into()
    }

    /// Moves the bot to `state` and hands control back to the lifecycle.
    pub fn transition_to(state: BotState) -> Self {
        Self {
            loop_state: LoopState::NextState,
            transition: Some(state),
        }
    }
}

impl From<LoopState> for CycleOutcome {
    fn from(loop_state: LoopState) -> Self {
        Self {
            loop_state,
            transition: None,
        }
    }
}

/// Consumes sync responses for one lifecycle state.
#[async_trait]
pub trait SyncHandler: Send {
    async fn handle(&mut self, ctx: &BotContext, response: &SyncResponse) -> Result<CycleOutcome>;
}

/// Capped exponential delay for consecutive poll failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.base.min(self.max),
            Some(delay) => delay.saturating_mul(2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

pub struct SyncLoopDriver<'a> {
    ctx: &'a BotContext,
    backoff: Backoff,
}

impl<'a> SyncLoopDriver<'a> {
    pub fn new(ctx: &'a BotContext) -> Self {
        let backoff = Backoff::new(ctx.options.poll_backoff_base, ctx.options.poll_backoff_max);
        Self { ctx, backoff }
    }

    /// Runs poll cycles until the handler asks for another state, or the loop is cancelled.
    ///
    /// Only a failure to load the configuration is returned as an error; everything else is retried.
    #[instrument(skip_all)]
    pub async fn run(&mut self, handler: &mut dyn SyncHandler) -> Result<LoopState> {
        let config = self.ctx.config().await?;
        let filter = config.filter_id.clone();
        let timeout_ms = config.timeout_ms;

        info!(
            since = ?config.next_batch,
            filter = ?filter,
            timeout_ms,
            "step: sync loop started"
        );

        let Some(mut response) = self
            .poll(filter.as_deref(), config.next_batch.as_deref(), 0)
            .await
        else {
            return Ok(LoopState::Exit);
        };

        if config.next_batch.is_none() && config.skip_initial_sync {
            let initial = response.next_batch.clone();
            info!(next_batch = %initial, "step: skipping initial sync backlog");
            if !self.commit_until_saved(&initial, None).await {
                return Ok(LoopState::Exit);
            }

            response = match self.poll(filter.as_deref(), Some(&initial), timeout_ms).await {
                Some(response) => response,
                None => return Ok(LoopState::Exit),
            };
        }

        loop {
            let outcome = match handler.handle(self.ctx, &response).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, next_batch = %response.next_batch, "Sync handler failed");
                    CycleOutcome::run()
                }
            };

            let next_batch = response.next_batch.clone();
            if !self.commit_until_saved(&next_batch, outcome.transition).await {
                info!(next_batch = %next_batch, "step: sync loop cancelled before cursor was saved");
                return Ok(LoopState::Exit);
            }

            match outcome.loop_state {
                LoopState::NextState | LoopState::Exit => {
                    info!(
                        loop_state = ?outcome.loop_state,
                        transition = ?outcome.transition,
                        "step: sync loop returning to lifecycle"
                    );
                    return Ok(outcome.loop_state);
                }
                LoopState::Run => {}
            }

            if self.ctx.is_cancelled() {
                info!("step: sync loop cancelled");
                return Ok(LoopState::Exit);
            }

            response = match self.poll(filter.as_deref(), Some(&next_batch), timeout_ms).await {
                Some(response) => response,
                None => return Ok(LoopState::Exit),
            };
        }
    }

    /// Polls until a response arrives. `None` means the loop was cancelled meanwhile.
    async fn poll(
        &mut self,
        filter: Option<&str>,
        since: Option<&str>,
        timeout_ms: u64,
    ) -> Option<SyncResponse> {
        let ctx = self.ctx;
        loop {
            let result = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return None,
                result = ctx.client.sync(filter, since, false, None, timeout_ms) => result,
            };

            match result {
                Ok(response) => {
                    self.backoff.reset();
                    debug!(next_batch = %response.next_batch, "Sync poll completed");
                    return Some(response);
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        error = %e,
                        since = ?since,
                        retry_in_ms = delay.as_millis() as u64,
                        "Sync poll failed"
                    );
                    tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Commits until the store accepts the cursor. `false` means the loop was cancelled meanwhile and the
    /// cursor is not saved.
    async fn commit_until_saved(&mut self, next_batch: &str, transition: Option<BotState>) -> bool {
        let ctx = self.ctx;
        loop {
            match self.commit(next_batch.to_string(), transition).await {
                Ok(()) => {
                    self.backoff.reset();
                    return true;
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    error!(
                        error = %e,
                        next_batch = %next_batch,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to persist sync cursor"
                    );
                    tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => return false,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn commit(&self, next_batch: String, transition: Option<BotState>) -> Result<()> {
        self.ctx
            .store
            .mutate(Box::new(move |config| {
                config.next_batch = Some(next_batch);
                if let Some(state) = transition {
                    config.set_state(state);
                }
            }))
            .await?;
        Ok(())
    }
}
