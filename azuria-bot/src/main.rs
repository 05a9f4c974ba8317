use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use azuria_core::logging::{self, LogSettings};
use azuria_core::settings;
use azuria_core::{AzuriaClient, Error, Settings};

mod units;

#[derive(Parser, Debug, Clone)]
#[command(name = "azuria")]
#[command(author, version, about = "Azuria - Discord bot framework demo bot")]
struct Args {
    /// Directory holding `commands/` and `events/`. Overrides BASE_DIR.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Log filter directive, combined with RUST_LOG.
    #[arg(long, default_value = "azuria=info")]
    log: String,

    /// Also write JSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Wait for every command registration before handling events.
    #[arg(long, default_value = "false")]
    await_registrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    settings::load_env_file(None);
    let _log_guard = logging::init(&LogSettings {
        directive: args.log.clone(),
        file: args.log_file.clone(),
    })?;

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };
    if let Some(dir) = args.base_dir {
        settings = settings.with_base_dir(dir);
    }
    if args.await_registrations {
        settings.await_registrations = true;
    }
    info!("Azuria starting from {}", settings.base_dir.display());

    let client = AzuriaClient::discord(settings, units::commands(), units::events())?;

    tokio::select! {
        result = client.run() => {
            if let Err(e) = result {
                error!("Client stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    client.shutdown().await?;
    info!("Goodbye!");
    Ok(())
}
