//! Host provider trait — the injected wallet object a page talks to
//!
//! A host provider exposes the same logical RPC operation through three
//! calling conventions:
//!
//! - `request` — single call returning a future
//! - `send_async` — JSON-RPC payload plus completion callback
//! - `send` — legacy overloads that behave like either of the above
//!
//! `GuardedProvider` wraps any `HostProvider` and keeps every one of
//! these conventions intact for traffic it does not gate.

use crate::types::{JsonRpcPayload, JsonRpcResponse, ProviderError, ProviderResult, RequestArguments};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

pub mod memory;

/// Completion callback of the callback shape
///
/// Invoked exactly once with either an error (and an error-shaped
/// response) or a success response.
pub type ResponseCallback =
    Box<dyn FnOnce(Option<ProviderError>, Option<JsonRpcResponse>) + Send + 'static>;

/// Argument forms accepted by the legacy `send` entry point
pub enum SendArgs {
    /// `send(method, params)`
    Method {
        /// RPC method name
        method: String,
        /// Raw params
        params: Option<Value>,
    },

    /// `send(payload)`, answered synchronously
    Payload(JsonRpcPayload),

    /// `send(payload, callback)`
    PayloadWithCallback(JsonRpcPayload, ResponseCallback),
}

impl std::fmt::Debug for SendArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendArgs::Method { method, params } => f
                .debug_struct("Method")
                .field("method", method)
                .field("params", params)
                .finish(),
            SendArgs::Payload(payload) => f.debug_tuple("Payload").field(payload).finish(),
            SendArgs::PayloadWithCallback(payload, _) => f
                .debug_tuple("PayloadWithCallback")
                .field(payload)
                .finish_non_exhaustive(),
        }
    }
}

/// What the legacy `send` entry point hands back
pub enum SendOutcome {
    /// Result arrives later (the `Method` form)
    Pending(BoxFuture<'static, ProviderResult<Value>>),

    /// Synchronous answer (the `Payload` form)
    Response(JsonRpcResponse),

    /// Result goes to the supplied callback
    Dispatched,
}

impl std::fmt::Debug for SendOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendOutcome::Pending(_) => f.write_str("Pending(..)"),
            SendOutcome::Response(response) => {
                f.debug_tuple("Response").field(response).finish()
            }
            SendOutcome::Dispatched => f.write_str("Dispatched"),
        }
    }
}

/// Which entry points a host provider actually exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShapes {
    /// `request()` is available
    pub request: bool,
    /// `send_async()` is available
    pub send_async: bool,
    /// `send()` is available
    pub send: bool,
}

impl CallShapes {
    /// Every entry point present
    pub fn all() -> Self {
        Self {
            request: true,
            send_async: true,
            send: true,
        }
    }
}

/// Core trait for injected wallet providers
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// Promise shape: perform one RPC call
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value>;

    /// Callback shape: perform one RPC call and report through `callback`
    fn send_async(&self, payload: JsonRpcPayload, callback: ResponseCallback);

    /// Legacy multi-overload entry point
    fn send(&self, args: SendArgs) -> SendOutcome;

    /// Entry points this provider exposes
    fn call_shapes(&self) -> CallShapes {
        CallShapes::all()
    }

    /// Whether this provider is already a confirmation-gating wrapper
    fn is_guarded(&self) -> bool {
        false
    }

    /// Provider name used in logs
    fn name(&self) -> &str {
        "host"
    }
}
