//! Legacy `send` adapter
//!
//! - `send(method, params)` is redirected to the guarded promise shape.
//! - `send(payload)` is answered synchronously by the host and cannot
//!   wait for a confirmation, so it is forwarded untouched.
//! - `send(payload, callback)` is gated like the callback shape and
//!   forwarded through the host's own `send`.

use super::{callback, GuardedProvider};
use crate::provider::{HostProvider, SendArgs, SendOutcome};
use crate::types::RequestArguments;

pub(super) fn intercept(guarded: &GuardedProvider, args: SendArgs) -> SendOutcome {
    match args {
        SendArgs::Method { method, params } => {
            let guarded = guarded.clone();
            SendOutcome::Pending(Box::pin(async move {
                guarded
                    .request(RequestArguments::new(method, params))
                    .await
            }))
        }
        SendArgs::Payload(payload) => guarded.inner.send(SendArgs::Payload(payload)),
        SendArgs::PayloadWithCallback(payload, cb) => {
            let inner = guarded.inner.clone();
            callback::intercept(&guarded.gate, payload, cb, move |payload, cb| {
                inner.send(SendArgs::PayloadWithCallback(payload, cb));
            });
            SendOutcome::Dispatched
        }
    }
}
