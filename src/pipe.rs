//! Message pipe abstraction
//!
//! The correlation channel only needs to post JSON messages; how they
//! travel (window messaging, extension ports, sockets) is up to the
//! `MessagePipe` implementation. Inbound traffic is fed to
//! `CorrelationChannel::dispatch` or `CorrelationChannel::listen`.

use crate::error::{GuardError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Outbound half of a bidirectional message pipe
#[async_trait]
pub trait MessagePipe: Send + Sync {
    /// Post one message to the other side
    async fn post(&self, message: Value) -> Result<()>;
}

/// `MessagePipe` backed by a tokio mpsc channel
///
/// The receiver half is handed to whatever plays the confirmation
/// authority (an extension bridge, or a test harness).
#[derive(Debug, Clone)]
pub struct MpscPipe {
    tx: mpsc::Sender<Value>,
}

impl MpscPipe {
    /// Create a pipe and the receiver for its outbound messages
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessagePipe for MpscPipe {
    async fn post(&self, message: Value) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| GuardError::Channel("pipe receiver dropped".to_string()))
    }
}
