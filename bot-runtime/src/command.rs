//! # Commands
//!
//! A command is a named action triggered by a room message starting with the configured prefix, e.g.
//! `!prefix ~`. [`CommandRegistry`] parses the message body and invokes the matching [`Command`].

use async_trait::async_trait;
use bot_core::{Event, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::context::BotContext;

/// A pluggable bot command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Name used after the prefix to invoke the command.
    fn name(&self) -> &str;
    /// One-line description.
    fn help(&self) -> &str;
    /// Argument synopsis, e.g. `prefix [<prefix>]`.
    fn usage(&self) -> &str;
    /// Runs the command. Returns whether the command handled the event.
    async fn invoke(
        &self,
        ctx: &BotContext,
        room_id: &str,
        event: &Event,
        arguments: Option<&str>,
    ) -> Result<bool>;
}

/// Commands by name, in registration order.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. When two commands share a name, the first registered wins.
    pub fn register(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.iter().find(|command| command.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|command| command.name()).collect()
    }

    /// Splits `body` into command name and arguments when it starts with `prefix`.
    ///
    /// Arguments are trimmed; blank arguments are `None`.
    pub fn parse<'b>(prefix: &str, body: &'b str) -> Option<(&'b str, Option<&'b str>)> {
        let rest = body.trim_start().strip_prefix(prefix)?.trim();
        if rest.is_empty() {
            return None;
        }
        match rest.split_once(char::is_whitespace) {
            Some((name, arguments)) => {
                let arguments = arguments.trim();
                Some((name, (!arguments.is_empty()).then_some(arguments)))
            }
            None => Some((rest, None)),
        }
    }

    /// Invokes the command named by `event`, if any. Returns whether a command handled it.
    #[instrument(skip(self, ctx, event), fields(sender = %event.sender))]
    pub async fn dispatch(&self, ctx: &BotContext, room_id: &str, event: &Event) -> Result<bool> {
        let Some(body) = event.body() else {
            return Ok(false);
        };

        let config = ctx.config().await?;
        let Some((name, arguments)) = Self::parse(config.effective_prefix(), body) else {
            return Ok(false);
        };

        let Some(command) = self.get(name) else {
            debug!(command = %name, "Unknown command");
            return Ok(false);
        };

        info!(command = %name, "step: invoking command");
        let handled = command.invoke(ctx, room_id, event, arguments).await?;
        debug!(command = %name, handled, "step: command done");
        Ok(handled)
    }
}
