use async_trait::async_trait;
use bot_core::{Event, Result};
use tracing::{debug, info};

use crate::command::Command;
use crate::context::BotContext;

/// `prefix [<prefix>]`: shows the current command prefix, or sets a new one. Owner only, when an
/// owner is configured.
pub struct PrefixCommand;

#[async_trait]
impl Command for PrefixCommand {
    fn name(&self) -> &str {
        "prefix"
    }

    fn help(&self) -> &str {
        "set new prefix or show current (invoked only by owner)."
    }

    fn usage(&self) -> &str {
        "prefix [<prefix>]"
    }

    async fn invoke(
        &self,
        ctx: &BotContext,
        room_id: &str,
        event: &Event,
        arguments: Option<&str>,
    ) -> Result<bool> {
        let config = ctx.config().await?;
        if let Some(owner) = config.owner.as_deref() {
            if owner != event.sender {
                debug!(sender = %event.sender, "prefix: sender is not the owner");
                return Ok(false);
            }
        }

        match arguments.map(str::trim).filter(|arguments| !arguments.is_empty()) {
            None => {
                ctx.client
                    .send_notice(room_id, config.effective_prefix())
                    .await?;
            }
            Some(prefix) => {
                let prefix = prefix.to_string();
                info!(prefix = %prefix, "Command prefix changed");
                ctx.store
                    .mutate(Box::new(move |config| config.prefix = Some(prefix)))
                    .await?;
            }
        }
        Ok(true)
    }
}
