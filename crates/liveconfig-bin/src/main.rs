//! liveconfig binary entry point.
//!
//! Usage:
//!   liveconfig configure   # device side: one configuration session
//!   liveconfig forward     # editor side: relay changes read from stdin
//!   liveconfig settings    # print the cached settings

mod commands;

use clap::{Parser, Subcommand};
use liveconfig_core::{Config, Identity, Paths};
use std::path::PathBuf;
use tracing::{info, warn};

/// liveconfig: live configuration over a relay.
#[derive(Parser, Debug)]
#[command(name = "liveconfig")]
#[command(about = "Live device configuration through a WebSocket relay")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Relay base URL.
    #[arg(long, global = true)]
    relay_url: Option<String>,

    /// Editor page URL.
    #[arg(long, global = true)]
    editor_url: Option<String>,

    /// Settings cache file (defaults to ~/.liveconfig/clay-settings.json).
    #[arg(long, global = true)]
    settings_file: Option<PathBuf>,

    /// Account token used to address relay channels.
    #[arg(long, global = true, env = "LIVECONFIG_ACCOUNT_TOKEN", hide_env_values = true)]
    account_token: Option<String>,

    /// Device token used to address relay channels.
    #[arg(long, global = true, env = "LIVECONFIG_DEVICE_TOKEN", hide_env_values = true)]
    device_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one configuration session. Prints the editor URL, then reads the
    /// editor's result from one stdin line (empty line cancels).
    Configure,
    /// Forward `{"id":..,"value":..}` lines from stdin to the relay.
    Forward,
    /// Print the cached settings as JSON.
    Settings,
}

impl Args {
    fn identity(&self) -> anyhow::Result<Identity> {
        let account = self.account_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No account token. Use --account-token or LIVECONFIG_ACCOUNT_TOKEN.")
        })?;
        let device = self.device_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No device token. Use --device-token or LIVECONFIG_DEVICE_TOKEN.")
        })?;
        Ok(Identity::new(account, device)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // No home directory is fine as long as flags supply the rest
    let paths = Paths::new().ok();
    let mut config = Config::load(paths.as_ref())?;

    // CLI args win over file and environment
    if let Some(ref relay_url) = args.relay_url {
        config.relay_url = relay_url.clone();
    }
    if let Some(ref editor_url) = args.editor_url {
        config.editor_url = Some(editor_url.clone());
    }
    if let Some(ref log_level) = args.log_level {
        config.log_level = log_level.clone();
    }

    liveconfig_core::init_logging(&config.log_level);

    if let Some(ref paths) = paths {
        if let Err(e) = paths.ensure_dirs() {
            warn!(error = %e, "Could not create liveconfig directories");
        }
    }

    let settings_file = args
        .settings_file
        .clone()
        .or_else(|| paths.as_ref().map(Paths::settings_file))
        .ok_or_else(|| {
            anyhow::anyhow!("No home directory for the settings cache. Use --settings-file.")
        })?;

    info!(
        command = ?args.command,
        relay_url = %config.relay_url,
        settings_file = %settings_file.display(),
        "liveconfig starting"
    );

    match args.command {
        Command::Configure => {
            let identity = args.identity()?;
            commands::configure(&config, identity, &settings_file).await
        }
        Command::Forward => {
            let identity = args.identity()?;
            commands::forward(&config, identity).await
        }
        Command::Settings => commands::settings(&settings_file),
    }
}
