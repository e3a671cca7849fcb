//! Editor-side forwarder: field changes onto the relay.

use crate::editor::ChangeSubscription;
use crate::schema::FieldSchema;
use crate::SessionResult;
use liveconfig_core::Identity;
use liveconfig_relay::{ChannelRole, RelayChannel, RelayConfig, RelayError, RelayResult};
use settings_cache::FieldUpdate;
use tracing::{debug, info, warn};

/// Sends every editor change as one relay frame.
///
/// No debouncing and no coalescing: N edits produce N frames, in edit
/// order. Color fields are quantized before sending.
pub struct FieldUpdateForwarder {
    schema: FieldSchema,
    sent: u64,
}

impl FieldUpdateForwarder {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema, sent: 0 }
    }

    /// Frames sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Open the forward channel and relay changes until the feed ends or
    /// the channel closes.
    ///
    /// Changes made while the channel is still opening are held and sent,
    /// in order, once it is open.
    pub async fn run(
        &mut self,
        config: &RelayConfig,
        identity: &Identity,
        mut changes: ChangeSubscription,
    ) -> SessionResult<()> {
        let open = RelayChannel::open(config, ChannelRole::Forward, identity);
        tokio::pin!(open);

        let mut pending = Vec::new();
        let mut feed_open = true;
        let channel = loop {
            tokio::select! {
                result = &mut open => break result?,
                change = changes.next(), if feed_open => match change {
                    Some(update) => pending.push(update),
                    None => feed_open = false,
                },
            }
        };

        if !pending.is_empty() {
            debug!(count = pending.len(), "Sending changes made while connecting");
        }

        let mut stopped = false;
        for update in pending {
            if !self.forward_or_stop(&channel, update) {
                stopped = true;
                break;
            }
        }

        if feed_open && !stopped {
            while let Some(update) = changes.next().await {
                if !self.forward_or_stop(&channel, update) {
                    break;
                }
            }
        }

        info!(sent = self.sent, "Forwarder finished");
        channel.close().await;
        Ok(())
    }

    /// Transform and send one change.
    pub fn forward(&mut self, channel: &RelayChannel, update: FieldUpdate) -> RelayResult<()> {
        let update = self.schema.transform(update);
        debug!(field_id = %update.id, "Forwarding field change");
        channel.send(&update)?;
        self.sent += 1;
        Ok(())
    }

    fn forward_or_stop(&mut self, channel: &RelayChannel, update: FieldUpdate) -> bool {
        match self.forward(channel, update) {
            Ok(()) => true,
            Err(RelayError::ChannelClosed) => {
                info!("Forward channel closed, no further changes will be sent");
                false
            }
            Err(e) => {
                warn!(error = %e, "Could not send field change");
                true
            }
        }
    }
}
