//! High-level wallet guard built on a provider slot and a message pipe
//!
//! `WalletGuard` wires the correlation channel, the attachment manager,
//! and configuration together so a host only has to supply the pipe to
//! its confirmation authority and the slot its provider appears in.

use crate::attach::{AttachmentHandle, AttachmentManager, AttachmentState, ProviderSlot};
use crate::channel::CorrelationChannel;
use crate::config::GuardConfig;
use crate::error::Result;
use crate::network::NetworkInfo;
use crate::pipe::MessagePipe;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Confirmation gate for a page's wallet provider
pub struct WalletGuard {
    config: GuardConfig,
    slot: Arc<ProviderSlot>,
    channel: CorrelationChannel,
    manager: Arc<AttachmentManager>,
}

impl WalletGuard {
    /// Create a guard for `slot`, confirming over `pipe`
    pub fn new(
        config: GuardConfig,
        pipe: impl MessagePipe + 'static,
        slot: Arc<ProviderSlot>,
    ) -> Result<Self> {
        Self::build(config, pipe, slot, None)
    }

    /// Like `new`, with a fixed source for chain ids
    pub fn with_network(
        config: GuardConfig,
        pipe: impl MessagePipe + 'static,
        slot: Arc<ProviderSlot>,
        network: Arc<dyn NetworkInfo>,
    ) -> Result<Self> {
        Self::build(config, pipe, slot, Some(network))
    }

    fn build(
        config: GuardConfig,
        pipe: impl MessagePipe + 'static,
        slot: Arc<ProviderSlot>,
        network: Option<Arc<dyn NetworkInfo>>,
    ) -> Result<Self> {
        config.validate()?;

        let channel = CorrelationChannel::new(pipe).with_timeout(config.confirmation_timeout());
        let mut manager = AttachmentManager::new(slot.clone(), channel.clone(), &config);
        if let Some(network) = network {
            manager = manager.with_network(network);
        }

        tracing::debug!(
            origin = %config.origin,
            poll_interval_ms = config.poll_interval_ms,
            "Wallet guard created"
        );

        Ok(Self {
            config,
            slot,
            channel,
            manager: Arc::new(manager),
        })
    }

    /// Attach once now and keep re-attaching in the background
    pub fn start(&self) -> AttachmentHandle {
        self.manager.start()
    }

    /// Single attachment attempt
    pub fn ensure_attached(&self) {
        self.manager.ensure_attached()
    }

    /// Feed one message from the confirmation authority
    pub fn dispatch(&self, message: &Value) -> bool {
        self.channel.dispatch(message)
    }

    /// Consume the confirmation authority's message stream
    ///
    /// When the stream ends the channel closes and every later sensitive
    /// call fails instead of waiting.
    pub fn listen<S>(&self, incoming: S) -> JoinHandle<()>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        self.channel.listen(incoming)
    }

    /// Attachment lifecycle state
    pub fn state(&self) -> AttachmentState {
        self.manager.state()
    }

    /// Number of wrappers installed so far
    pub fn installs(&self) -> usize {
        self.manager.installs()
    }

    /// Confirmations still waiting for a verdict
    pub fn pending_confirmations(&self) -> usize {
        self.channel.pending_count()
    }

    /// Get the provider slot
    pub fn slot(&self) -> &Arc<ProviderSlot> {
        &self.slot
    }

    /// Get the correlation channel
    pub fn channel(&self) -> &CorrelationChannel {
        &self.channel
    }

    /// Get the configuration
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;
    use crate::pipe::MpscPipe;
    use crate::provider::memory::MemoryHostProvider;

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (pipe, _rx) = MpscPipe::new(1);
        let config = GuardConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        let result = WalletGuard::new(config, pipe, Arc::new(ProviderSlot::new()));
        assert!(matches!(result, Err(GuardError::Config(_))));
    }

    #[tokio::test]
    async fn test_ensure_attached_through_facade() {
        let (pipe, _rx) = MpscPipe::new(1);
        let slot = Arc::new(ProviderSlot::new());
        let guard = WalletGuard::new(GuardConfig::new("https://dapp.example"), pipe, slot.clone())
            .unwrap();
        assert_eq!(guard.state(), AttachmentState::Uninstalled);

        slot.inject(Arc::new(MemoryHostProvider::default()));
        guard.ensure_attached();
        guard.ensure_attached();

        assert_eq!(guard.state(), AttachmentState::Installed);
        assert_eq!(guard.installs(), 1);
        assert_eq!(guard.pending_confirmations(), 0);
        assert_eq!(guard.config().origin, "https://dapp.example");
    }
}
