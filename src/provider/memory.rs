//! In-memory host provider
//!
//! Answers calls from a handler closure and records every call it sees,
//! with the shape it arrived through. Useful for tests and for hosting
//! the guard in-process without a real wallet.

use super::{CallShapes, HostProvider, ResponseCallback, SendArgs, SendOutcome};
use crate::types::{JsonRpcPayload, JsonRpcResponse, ProviderResult, RequestArguments};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};

type Handler = Arc<dyn Fn(&str, Option<&Value>) -> ProviderResult<Value> + Send + Sync>;

/// Entry point a recorded call arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `request()`
    Request,
    /// `send_async()`
    SendAsync,
    /// `send(method, params)`
    SendMethod,
    /// `send(payload)`
    SendPayload,
    /// `send(payload, callback)`
    SendPayloadWithCallback,
}

/// A call as the provider received it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Entry point used
    pub shape: CallShape,
    /// JSON-RPC id, for payload shapes
    pub id: Option<Value>,
    /// RPC method name
    pub method: String,
    /// Raw params
    pub params: Option<Value>,
}

/// In-memory `HostProvider`
///
/// By default answers `eth_chainId` with the configured chain and echoes
/// `{"method", "params"}` for every other call.
pub struct MemoryHostProvider {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
    shapes: CallShapes,
}

impl Default for MemoryHostProvider {
    fn default() -> Self {
        Self::with_chain_id(1)
    }
}

impl MemoryHostProvider {
    /// Echoing provider on the given chain
    pub fn with_chain_id(chain_id: u64) -> Self {
        Self::with_handler(move |method, params| match method {
            "eth_chainId" => Ok(json!(format!("0x{:x}", chain_id))),
            _ => Ok(json!({ "method": method, "params": params })),
        })
    }

    /// Provider answering every call with `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&str, Option<&Value>) -> ProviderResult<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            calls: Mutex::new(Vec::new()),
            shapes: CallShapes::all(),
        }
    }

    /// Override which entry points the provider claims to expose
    pub fn with_call_shapes(mut self, shapes: CallShapes) -> Self {
        self.shapes = shapes;
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls received for one method
    pub fn calls_for(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    fn record(&self, shape: CallShape, id: Option<&Value>, method: &str, params: Option<&Value>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                shape,
                id: id.cloned(),
                method: method.to_string(),
                params: params.cloned(),
            });
    }

    fn respond(&self, payload: &JsonRpcPayload) -> JsonRpcResponse {
        match (self.handler)(&payload.method, payload.params.as_ref()) {
            Ok(result) => JsonRpcResponse::success(payload.id.clone(), result),
            Err(error) => JsonRpcResponse::failure(payload.id.clone(), error),
        }
    }
}

fn complete(response: JsonRpcResponse, callback: ResponseCallback) {
    match response.error.clone() {
        Some(error) => callback(Some(error), Some(response)),
        None => callback(None, Some(response)),
    }
}

#[async_trait]
impl HostProvider for MemoryHostProvider {
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value> {
        self.record(CallShape::Request, None, &args.method, args.params.as_ref());
        (self.handler)(&args.method, args.params.as_ref())
    }

    fn send_async(&self, payload: JsonRpcPayload, callback: ResponseCallback) {
        self.record(
            CallShape::SendAsync,
            Some(&payload.id),
            &payload.method,
            payload.params.as_ref(),
        );
        complete(self.respond(&payload), callback);
    }

    fn send(&self, args: SendArgs) -> SendOutcome {
        match args {
            SendArgs::Method { method, params } => {
                self.record(CallShape::SendMethod, None, &method, params.as_ref());
                let result = (self.handler)(&method, params.as_ref());
                SendOutcome::Pending(Box::pin(futures::future::ready(result)))
            }
            SendArgs::Payload(payload) => {
                self.record(
                    CallShape::SendPayload,
                    Some(&payload.id),
                    &payload.method,
                    payload.params.as_ref(),
                );
                SendOutcome::Response(self.respond(&payload))
            }
            SendArgs::PayloadWithCallback(payload, callback) => {
                self.record(
                    CallShape::SendPayloadWithCallback,
                    Some(&payload.id),
                    &payload.method,
                    payload.params.as_ref(),
                );
                complete(self.respond(&payload), callback);
                SendOutcome::Dispatched
            }
        }
    }

    fn call_shapes(&self) -> CallShapes {
        self.shapes
    }

    fn name(&self) -> &str {
        "memory"
    }
}
