//! mbot: run a Matrix bot, inspect its persisted state. Config from env and optional CLI args.

use anyhow::Result;
use bot_cli::{load_status, run_bot, AppConfig, Cli, Commands, StoreSettings};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            token,
            exit_on_empty_rooms,
        } => {
            let mut config = AppConfig::load(token)?;
            config.exit_on_empty_rooms |= exit_on_empty_rooms;
            run_bot(config).await
        }
        Commands::Status => {
            let settings = StoreSettings::load();
            let config = load_status(&settings).await?;

            println!("bot id:            {}", config.id);
            println!("state:             {}", config.state);
            println!("next_batch:        {}", config.next_batch.as_deref().unwrap_or("-"));
            println!("filter id:         {}", config.filter_id.as_deref().unwrap_or("-"));
            println!("timeout (ms):      {}", config.timeout_ms);
            println!("owner:             {}", config.owner.as_deref().unwrap_or("-"));
            println!("prefix:            {}", config.effective_prefix());
            println!("skip initial sync: {}", config.skip_initial_sync);
            println!("exit on empty:     {}", config.exit_on_empty_rooms);
            Ok(())
        }
    }
}
