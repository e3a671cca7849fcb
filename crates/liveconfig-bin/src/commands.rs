//! Subcommand implementations.

use config_session::{
    change_feed, ChangeNotifier, ClayEditor, DeviceTransport, FieldSchema, FieldUpdateForwarder,
    HttpDeviceTransport, SessionOrchestrator, SharedCache, StdoutDeviceTransport,
};
use liveconfig_core::{Config, Identity};
use liveconfig_relay::{decode_frame, RelayConfig};
use parking_lot::Mutex;
use settings_cache::{FileSettingsStore, SettingsCache};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

fn open_cache(settings_file: &Path) -> SharedCache {
    let store = FileSettingsStore::new(settings_file);
    Arc::new(Mutex::new(SettingsCache::open(Box::new(store))))
}

fn device_transport(config: &Config) -> anyhow::Result<Arc<dyn DeviceTransport>> {
    match &config.device_endpoint {
        Some(endpoint) => {
            let endpoint = url::Url::parse(endpoint)?;
            info!(endpoint = %endpoint, "Pushing settings over HTTP");
            let timeout = Duration::from_secs(config.device_timeout_secs);
            Ok(Arc::new(HttpDeviceTransport::new(endpoint, timeout)?))
        }
        None => {
            info!("Pushing settings to stdout");
            Ok(Arc::new(StdoutDeviceTransport::stdout()))
        }
    }
}

fn relay_config(config: &Config) -> anyhow::Result<RelayConfig> {
    // Validate early so a bad URL fails before any session starts
    let url = config.relay_url()?;
    Ok(RelayConfig::with_url(url.as_str()))
}

/// Device side: launch, wait for the editor to close, push the result.
pub async fn configure(config: &Config, identity: Identity, settings_file: &Path) -> anyhow::Result<()> {
    let editor = ClayEditor::new(
        config.editor_url()?,
        config.return_to.clone(),
        FieldSchema::with_color_fields(config.color_fields.iter().cloned()),
    );

    let mut orchestrator = SessionOrchestrator::new(
        identity,
        relay_config(config)?,
        open_cache(settings_file),
        device_transport(config)?,
        Arc::new(editor),
    );

    let launched = orchestrator.configure_requested()?;
    // stdout carries device pushes; the URL goes to the user on stderr
    eprintln!("Open the editor at:\n{}", launched.editor_url);

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    tokio::select! {
        read = stdin.read_line(&mut line) => {
            read?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting...");
            orchestrator.shutdown();
            return Ok(());
        }
    }

    let outcome = orchestrator.editor_closed(Some(line.trim())).await;
    info!(outcome = ?outcome, "Session finished");

    orchestrator.shutdown();
    Ok(())
}

/// Editor side: forward every stdin line as one field change.
pub async fn forward(config: &Config, identity: Identity) -> anyhow::Result<()> {
    let schema = FieldSchema::with_color_fields(config.color_fields.iter().cloned());
    let relay = relay_config(config)?;

    let (notifier, changes) = change_feed();
    let reader = tokio::spawn(read_changes(notifier));

    let mut forwarder = FieldUpdateForwarder::new(schema);

    tokio::select! {
        result = forwarder.run(&relay, &identity, changes) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting...");
        }
    }

    reader.abort();
    Ok(())
}

async fn read_changes(notifier: ChangeNotifier) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Could not read stdin");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match decode_frame(&line) {
            Ok(update) => {
                if !notifier.notify(update.id, update.value) {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Skipping input line"),
        }
    }

    debug!("Change input finished");
}

/// Print the cached snapshot.
pub fn settings(settings_file: &Path) -> anyhow::Result<()> {
    let cache = open_cache(settings_file);
    let document = serde_json::to_string_pretty(cache.lock().snapshot())?;
    println!("{}", document);
    Ok(())
}
