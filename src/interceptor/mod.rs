//! Confirmation-gating provider wrapper
//!
//! `GuardedProvider` decorates a `HostProvider`. Each of the three call
//! shapes gets its own adapter (`request`, `callback`, `legacy`); all of
//! them extract `(method, params)`, consult the classifier, and either
//! forward the original call untouched or wait on the correlation
//! channel for a verdict first.

mod callback;
mod legacy;
mod request;

use crate::channel::CorrelationChannel;
use crate::classifier::{self, Candidate};
use crate::error::{GuardError, Result};
use crate::network::{NetworkInfo, ProviderNetwork};
use crate::provider::{CallShapes, HostProvider, ResponseCallback, SendArgs, SendOutcome};
use crate::types::{JsonRpcPayload, ProviderResult, RequestArguments};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Shared decision logic for all call shapes
#[derive(Clone)]
pub(crate) struct Gate {
    channel: CorrelationChannel,
    network: Arc<dyn NetworkInfo>,
    origin: String,
    /// Runtime that waits out callback-shape confirmations
    runtime: Option<Handle>,
}

impl Gate {
    /// Sensitive candidate for a call, if any
    fn candidate(&self, method: &str, params: Option<&Value>) -> Option<Candidate> {
        let candidate = classifier::inspect(method, params);
        if candidate.is_none() {
            tracing::trace!(method = method, "Forwarding non-sensitive call");
        }
        candidate
    }

    /// Ask the confirmation authority about a sensitive call
    ///
    /// `Ok(())` means the original call may proceed.
    async fn confirm(&self, method: &str, candidate: Candidate) -> Result<()> {
        let request = candidate.resolve(self.network.as_ref()).await?;
        let kind = request.kind();
        let rejection = request.rejection_message();

        let verdict = self.channel.request(&self.origin, request).await?;
        if verdict.approved {
            tracing::info!(id = %verdict.id, method = method, kind = kind, "Sensitive call approved");
            Ok(())
        } else {
            tracing::info!(id = %verdict.id, method = method, kind = kind, "Sensitive call rejected");
            Err(GuardError::UserRejected {
                message: rejection.to_string(),
            })
        }
    }

    /// Classify and, when sensitive, confirm
    async fn admit(&self, method: &str, params: Option<&Value>) -> Result<()> {
        match self.candidate(method, params) {
            Some(candidate) => self.confirm(method, candidate).await,
            None => Ok(()),
        }
    }

    fn runtime(&self) -> Option<Handle> {
        self.runtime.clone().or_else(|| Handle::try_current().ok())
    }
}

/// A `HostProvider` that requires confirmation for sensitive calls
///
/// Non-sensitive calls reach the wrapped provider exactly as the page
/// issued them, through the same entry point.
#[derive(Clone)]
pub struct GuardedProvider {
    inner: Arc<dyn HostProvider>,
    gate: Arc<Gate>,
}

impl GuardedProvider {
    /// Wrap `inner`, confirming through `channel` on behalf of `origin`
    ///
    /// Chain ids are looked up by asking `inner` for `eth_chainId`.
    pub fn new(
        inner: Arc<dyn HostProvider>,
        channel: CorrelationChannel,
        origin: impl Into<String>,
    ) -> Self {
        let network: Arc<dyn NetworkInfo> = Arc::new(ProviderNetwork::new(inner.clone()));
        Self {
            gate: Arc::new(Gate {
                channel,
                network,
                origin: origin.into(),
                runtime: Handle::try_current().ok(),
            }),
            inner,
        }
    }

    /// Use a different source for chain ids
    pub fn with_network(mut self, network: Arc<dyn NetworkInfo>) -> Self {
        let mut gate = (*self.gate).clone();
        gate.network = network;
        self.gate = Arc::new(gate);
        self
    }

    /// The wrapped provider
    pub fn inner(&self) -> &Arc<dyn HostProvider> {
        &self.inner
    }

    /// Origin reported to the confirmation authority
    pub fn origin(&self) -> &str {
        &self.gate.origin
    }
}

#[async_trait]
impl HostProvider for GuardedProvider {
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value> {
        request::intercept(self.inner.as_ref(), &self.gate, args).await
    }

    fn send_async(&self, payload: JsonRpcPayload, callback: ResponseCallback) {
        let inner = self.inner.clone();
        callback::intercept(&self.gate, payload, callback, move |payload, callback| {
            inner.send_async(payload, callback)
        });
    }

    fn send(&self, args: SendArgs) -> SendOutcome {
        legacy::intercept(self, args)
    }

    fn call_shapes(&self) -> CallShapes {
        self.inner.call_shapes()
    }

    fn is_guarded(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
