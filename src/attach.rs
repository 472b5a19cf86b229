//! Provider attachment
//!
//! The host injects its provider at an unknown time after the guard
//! starts, and may later replace it. `ProviderSlot` models that injection
//! point; `AttachmentManager` polls it and swaps in a `GuardedProvider`
//! exactly once per injected provider.
//!
//! Lifecycle: `Uninstalled → Polling → Installed`. Once installed the
//! poll interval is cancelled; the background task then sleeps until the
//! slot's generation changes (a fresh provider was injected) and resumes
//! polling.

use crate::channel::CorrelationChannel;
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::interceptor::GuardedProvider;
use crate::network::NetworkInfo;
use crate::provider::HostProvider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Where the host environment places its provider
pub struct ProviderSlot {
    current: RwLock<Option<Arc<dyn HostProvider>>>,

    /// Bumped whenever the environment injects or removes a provider
    generation: watch::Sender<u64>,
}

impl Default for ProviderSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            current: RwLock::new(None),
            generation,
        }
    }

    /// Place a fresh provider in the slot, replacing any previous one
    pub fn inject(&self, provider: Arc<dyn HostProvider>) {
        tracing::debug!(provider = provider.name(), "Provider injected");
        *self.write() = Some(provider);
        self.generation.send_modify(|g| *g += 1);
    }

    /// Take the provider out of the slot
    pub fn remove(&self) -> Option<Arc<dyn HostProvider>> {
        let removed = self.write().take();
        if removed.is_some() {
            self.generation.send_modify(|g| *g += 1);
        }
        removed
    }

    /// The provider pages currently see
    pub fn get(&self) -> Option<Arc<dyn HostProvider>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of injections and removals so far
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Watch for injections and removals
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<dyn HostProvider>>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether the confirmation gate is in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    /// Nothing attempted yet
    Uninstalled,
    /// Waiting for a usable provider
    Polling,
    /// The slot holds a guarded provider
    Installed,
}

/// Installs the confirmation gate on whatever provider the slot holds
pub struct AttachmentManager {
    slot: Arc<ProviderSlot>,
    channel: CorrelationChannel,
    origin: String,
    network: Option<Arc<dyn NetworkInfo>>,
    poll_interval: Duration,
    state: Mutex<AttachmentState>,
    installs: AtomicUsize,
}

impl AttachmentManager {
    /// Create a manager for `slot`
    pub fn new(slot: Arc<ProviderSlot>, channel: CorrelationChannel, config: &GuardConfig) -> Self {
        Self {
            slot,
            channel,
            origin: config.origin.clone(),
            network: None,
            poll_interval: config.poll_interval(),
            state: Mutex::new(AttachmentState::Uninstalled),
            installs: AtomicUsize::new(0),
        }
    }

    /// Chain-id source for installed wrappers (defaults to the provider itself)
    pub fn with_network(mut self, network: Arc<dyn NetworkInfo>) -> Self {
        self.network = Some(network);
        self
    }

    /// Install the gate if a provider is present and not yet wrapped
    ///
    /// Idempotent; never fails. A missing provider is expected while
    /// the host is still loading, and a provider in an unexpected shape
    /// is logged and retried on the next call.
    pub fn ensure_attached(&self) {
        // Check and install under one write lock
        let mut current = self.slot.write();

        let provider = match current.as_ref() {
            Some(provider) => provider.clone(),
            None => {
                tracing::trace!("Provider not present yet");
                self.set_state(AttachmentState::Polling);
                return;
            }
        };

        if provider.is_guarded() {
            self.set_state(AttachmentState::Installed);
            return;
        }

        if let Err(e) = check_shape(provider.as_ref()) {
            tracing::warn!(provider = provider.name(), error = %e, "Provider attachment failed, will retry");
            self.set_state(AttachmentState::Polling);
            return;
        }

        let mut guarded =
            GuardedProvider::new(provider.clone(), self.channel.clone(), self.origin.clone());
        if let Some(network) = &self.network {
            guarded = guarded.with_network(network.clone());
        }
        *current = Some(Arc::new(guarded));

        self.installs.fetch_add(1, Ordering::SeqCst);
        self.set_state(AttachmentState::Installed);
        tracing::info!(
            provider = provider.name(),
            origin = %self.origin,
            "Confirmation gate installed"
        );
    }

    /// Current lifecycle state
    pub fn state(&self) -> AttachmentState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of wrappers installed so far
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// Spawn the background attachment task
    ///
    /// Attempts once immediately, then every poll interval until
    /// installed. The task stops when the returned handle is stopped or
    /// dropped.
    pub fn start(self: &Arc<Self>) -> AttachmentHandle {
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut generations = self.slot.subscribe();
        let manager = self.clone();

        let task = tokio::spawn(async move {
            loop {
                if !manager.poll_until_installed(&mut shutdown).await {
                    break;
                }

                tokio::select! {
                    changed = generations.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        tracing::debug!("Provider slot changed, re-attaching");
                    }
                    _ = shutdown.changed() => break,
                }
            }
            tracing::debug!("Attachment task stopped");
        });

        AttachmentHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Poll until installed; `false` if shut down first
    async fn poll_until_installed(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.ensure_attached();
                    if self.state() == AttachmentState::Installed {
                        return true;
                    }
                }
                _ = shutdown.changed() => return false,
            }
        }
    }

    fn set_state(&self, state: AttachmentState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn check_shape(provider: &dyn HostProvider) -> Result<()> {
    if !provider.call_shapes().request {
        return Err(GuardError::Attachment(format!(
            "provider '{}' does not expose request()",
            provider.name()
        )));
    }
    Ok(())
}

/// Handle to the background attachment task
///
/// Dropping the handle also stops the task.
pub struct AttachmentHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AttachmentHandle {
    /// Stop polling and wait for the task to exit
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Attachment task ended abnormally");
        }
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
