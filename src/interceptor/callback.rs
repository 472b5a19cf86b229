//! Callback-shape adapter

use super::Gate;
use crate::provider::ResponseCallback;
use crate::types::{JsonRpcPayload, JsonRpcResponse, ProviderError};
use std::sync::Arc;

/// Gate a callback-style call
///
/// Non-sensitive calls go to `forward` immediately, on the caller's
/// stack, so their timing matches the unwrapped provider. Sensitive
/// calls wait for a verdict on a spawned task; a rejection is reported
/// through `callback` together with an error-shaped response.
pub(super) fn intercept<F>(
    gate: &Arc<Gate>,
    payload: JsonRpcPayload,
    callback: ResponseCallback,
    forward: F,
) where
    F: FnOnce(JsonRpcPayload, ResponseCallback) + Send + 'static,
{
    let Some(candidate) = gate.candidate(&payload.method, payload.params.as_ref()) else {
        forward(payload, callback);
        return;
    };

    let Some(runtime) = gate.runtime() else {
        tracing::warn!(method = %payload.method, "No async runtime to await confirmation");
        fail(
            payload,
            callback,
            ProviderError::internal("confirmation unavailable: no async runtime"),
        );
        return;
    };

    let gate = gate.clone();
    runtime.spawn(async move {
        match gate.confirm(&payload.method, candidate).await {
            Ok(()) => forward(payload, callback),
            Err(err) => fail(payload, callback, ProviderError::from(err)),
        }
    });
}

fn fail(payload: JsonRpcPayload, callback: ResponseCallback, error: ProviderError) {
    let response = JsonRpcResponse::failure(payload.id, error.clone());
    callback(Some(error), Some(response));
}
