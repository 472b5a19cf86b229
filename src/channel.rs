//! Correlation channel
//!
//! Pairs each outbound confirmation request with the single response
//! carrying the same identifier. Responses for identifiers this channel
//! does not know about are ignored, since the same pipe may carry
//! unrelated traffic.

use crate::error::{GuardError, Result};
use crate::pipe::MessagePipe;
use crate::types::{ConfirmationRequest, ConfirmationResponse, SensitiveRequest, Verdict};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Outstanding requests (id → resolver) plus the closed marker
#[derive(Default)]
struct Waiters {
    senders: HashMap<String, oneshot::Sender<bool>>,
    closed: bool,
}

type PendingMap = Arc<Mutex<Waiters>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, Waiters> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes its pending entry when the waiting call finishes or is dropped
struct PendingEntry {
    id: String,
    pending: PendingMap,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        lock(&self.pending).senders.remove(&self.id);
    }
}

/// Request/response correlation over a `MessagePipe`
#[derive(Clone)]
pub struct CorrelationChannel {
    pipe: Arc<dyn MessagePipe>,

    pending: PendingMap,

    timeout: Option<Duration>,
}

impl CorrelationChannel {
    /// Create a channel over a pipe
    pub fn new(pipe: impl MessagePipe + 'static) -> Self {
        Self::from_arc(Arc::new(pipe))
    }

    /// Create a channel over a shared pipe
    pub fn from_arc(pipe: Arc<dyn MessagePipe>) -> Self {
        Self {
            pipe,
            pending: PendingMap::default(),
            timeout: None,
        }
    }

    /// Limit how long `request` waits for a verdict
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a confirmation request and wait for its verdict
    ///
    /// Waits indefinitely unless a timeout is configured. Dropping the
    /// returned future abandons the request and frees its identifier slot.
    pub async fn request(&self, origin: &str, payload: SensitiveRequest) -> Result<Verdict> {
        let id = format!("cfm-{}", uuid::Uuid::new_v4());
        let kind = payload.kind();
        let (tx, rx) = oneshot::channel();

        // Register before posting so a fast response cannot be missed
        {
            let mut waiters = lock(&self.pending);
            if waiters.closed {
                tracing::debug!(id = %id, kind = kind, "Confirmation refused, channel closed");
                return Err(GuardError::ChannelClosed(id));
            }
            waiters.senders.insert(id.clone(), tx);
        }
        let _entry = PendingEntry {
            id: id.clone(),
            pending: self.pending.clone(),
        };

        let message = serde_json::to_value(ConfirmationRequest {
            id: id.clone(),
            origin: origin.to_string(),
            payload,
        })?;
        self.pipe.post(message).await?;

        tracing::debug!(id = %id, kind = kind, origin = origin, "Confirmation requested");

        let received = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, rx).await.map_err(|_| {
                tracing::warn!(id = %id, "Confirmation timed out");
                GuardError::Timeout(id.clone())
            })?,
            None => rx.await,
        };

        let approved = received.map_err(|_| GuardError::ChannelClosed(id.clone()))?;
        Ok(Verdict { id, approved })
    }

    /// Feed one inbound message to the channel
    ///
    /// Returns `true` if it resolved a pending request.
    pub fn dispatch(&self, message: &Value) -> bool {
        resolve(&self.pending, message)
    }

    /// Dispatch every message from `incoming` until it ends, then close
    pub fn listen<S>(&self, incoming: S) -> JoinHandle<()>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        let pending = self.pending.clone();
        tokio::spawn(async move {
            futures::pin_mut!(incoming);
            while let Some(message) = incoming.next().await {
                resolve(&pending, &message);
            }
            tracing::debug!("Confirmation pipe ended");
            close_all(&pending);
        })
    }

    /// Fail every pending request with `ChannelClosed`
    ///
    /// Later requests fail immediately the same way.
    pub fn close(&self) {
        close_all(&self.pending);
    }

    /// Number of requests still waiting for a verdict
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).senders.len()
    }

    /// Whether `close` ran or the listened stream ended
    pub fn is_closed(&self) -> bool {
        lock(&self.pending).closed
    }
}

fn resolve(pending: &PendingMap, message: &Value) -> bool {
    let Ok(response) = ConfirmationResponse::deserialize(message) else {
        return false;
    };

    let Some(tx) = lock(pending).senders.remove(&response.id) else {
        tracing::debug!(id = %response.id, "Ignoring response for unknown request");
        return false;
    };

    tracing::info!(
        id = %response.id,
        approved = response.response,
        "Confirmation verdict received"
    );
    // Receiver is gone if the caller abandoned the request
    let _ = tx.send(response.response);
    true
}

fn close_all(pending: &PendingMap) {
    let drained: Vec<_> = {
        let mut waiters = lock(pending);
        waiters.closed = true;
        waiters.senders.drain().collect()
    };
    if !drained.is_empty() {
        tracing::warn!(count = drained.len(), "Closing channel with pending confirmations");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::MpscPipe;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn message_request() -> SensitiveRequest {
        SensitiveRequest::UntypedSignature {
            message: "0xdeadbeef".to_string(),
        }
    }

    fn channel() -> (CorrelationChannel, mpsc::Receiver<Value>) {
        let (pipe, rx) = MpscPipe::new(16);
        (CorrelationChannel::new(pipe), rx)
    }

    #[tokio::test]
    async fn test_request_resolves_on_matching_id() {
        let (channel, mut outbound) = channel();

        let responder = channel.clone();
        tokio::spawn(async move {
            let msg = outbound.recv().await.unwrap();
            assert_eq!(msg["origin"], "https://dapp.example");
            assert_eq!(msg["payload"]["kind"], "untypedSignature");
            responder.dispatch(&json!({"id": msg["id"], "response": true}));
        });

        let verdict = channel
            .request("https://dapp.example", message_request())
            .await
            .unwrap();
        assert!(verdict.approved);
        assert!(verdict.id.starts_with("cfm-"));
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_id_is_ignored() {
        let (channel, mut outbound) = channel();

        let responder = channel.clone();
        tokio::spawn(async move {
            let msg = outbound.recv().await.unwrap();
            assert!(!responder.dispatch(&json!({"id": "cfm-other", "response": true})));
            assert!(!responder.dispatch(&json!({"unrelated": "traffic"})));
            assert!(responder.dispatch(&json!({"id": msg["id"], "response": false})));
        });

        let verdict = channel.request("o", message_request()).await.unwrap();
        assert!(!verdict.approved);
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_independently() {
        let (channel, mut outbound) = channel();

        let responder = channel.clone();
        tokio::spawn(async move {
            let first = outbound.recv().await.unwrap();
            let second = outbound.recv().await.unwrap();
            // Answer in reverse order with opposite verdicts
            responder.dispatch(&json!({"id": second["id"], "response": false}));
            responder.dispatch(&json!({"id": first["id"], "response": true}));
        });

        let a = channel.request("o", SensitiveRequest::UntypedSignature {
            message: "a".to_string(),
        });
        let b = channel.request("o", SensitiveRequest::UntypedSignature {
            message: "b".to_string(),
        });
        let (a, b) = tokio::join!(a, b);
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.id, b.id);
        assert_ne!(a.approved, b.approved);
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_response_resolves_only_once() {
        let (channel, mut outbound) = channel();

        let responder = channel.clone();
        let handle = tokio::spawn(async move {
            let msg = outbound.recv().await.unwrap();
            let reply = json!({"id": msg["id"], "response": true});
            (responder.dispatch(&reply), responder.dispatch(&reply))
        });

        channel.request("o", message_request()).await.unwrap();
        assert_eq!(handle.await.unwrap(), (true, false));
    }

    #[tokio::test]
    async fn test_abandoned_request_is_removed() {
        let (channel, mut outbound) = channel();

        {
            let fut = channel.request("o", message_request());
            tokio::pin!(fut);
            tokio::select! {
                _ = &mut fut => panic!("no verdict was sent"),
                msg = outbound.recv() => assert!(msg.is_some()),
            }
            assert_eq!(channel.pending_count(), 1);
        }

        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let (channel, mut outbound) = channel();

        let closer = channel.clone();
        tokio::spawn(async move {
            outbound.recv().await.unwrap();
            closer.close();
        });

        let err = channel.request("o", message_request()).await.unwrap_err();
        assert!(matches!(err, GuardError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn test_pipe_failure_clears_entry() {
        let (channel, outbound) = channel();
        drop(outbound);

        let err = channel.request("o", message_request()).await.unwrap_err();
        assert!(matches!(err, GuardError::Channel(_)));
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_timeout() {
        let (pipe, _outbound) = MpscPipe::new(4);
        let channel = CorrelationChannel::new(pipe).with_timeout(Some(Duration::from_secs(5)));

        let err = channel.request("o", message_request()).await.unwrap_err();
        assert!(matches!(err, GuardError::Timeout(_)));
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_listen_dispatches_and_closes() {
        let (channel, mut outbound) = channel();
        let (inbound_tx, inbound_rx) = mpsc::channel::<Value>(4);
        let listener = channel.listen(tokio_stream::wrappers::ReceiverStream::new(inbound_rx));

        tokio::spawn(async move {
            let msg = outbound.recv().await.unwrap();
            inbound_tx
                .send(json!({"id": msg["id"], "response": true}))
                .await
                .unwrap();
        });

        let verdict = channel.request("o", message_request()).await.unwrap();
        assert!(verdict.approved);
        listener.await.unwrap();
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_request_after_close_fails_fast() {
        let (channel, mut outbound) = channel();
        channel.close();

        let err = channel.request("o", message_request()).await.unwrap_err();
        assert!(matches!(err, GuardError::ChannelClosed(ref id) if id.starts_with("cfm-")));
        assert_eq!(channel.pending_count(), 0);
        // Nothing reaches the authority once closed
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_request_after_listen_ends_fails_fast() {
        let (channel, _outbound) = channel();
        channel
            .listen(futures::stream::empty::<Value>())
            .await
            .unwrap();

        let request = channel.request("o", message_request());
        let err = tokio::time::timeout(Duration::from_secs(1), request)
            .await
            .expect("closed channel must not wait")
            .unwrap_err();
        assert!(matches!(err, GuardError::ChannelClosed(_)));
    }
}
