//! # a3s-wallet-guard
//!
//! Confirmation gate for calls a page makes against an injected wallet provider.
//!
//! ## Overview
//!
//! `a3s-wallet-guard` wraps a host wallet provider so that any call that moves
//! funds or produces a signature waits for an out-of-band verdict from a
//! confirmation authority. Approved calls are forwarded untouched; rejected
//! calls fail with an EIP-1193 `4001` user-rejected error in whichever calling
//! convention the page used. Everything else passes straight through.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_wallet_guard::{GuardConfig, MpscPipe, ProviderSlot, WalletGuard};
//! use a3s_wallet_guard::provider::memory::MemoryHostProvider;
//! use std::sync::Arc;
//!
//! # async fn example() -> a3s_wallet_guard::Result<()> {
//! let slot = Arc::new(ProviderSlot::new());
//! let (pipe, _to_authority) = MpscPipe::new(16);
//!
//! let guard = WalletGuard::new(GuardConfig::new("https://dapp.example"), pipe, slot.clone())?;
//! let _attachment = guard.start();
//!
//! // Later, the host injects its provider; the guard wraps it on the next poll
//! slot.inject(Arc::new(MemoryHostProvider::default()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **CorrelationChannel** — pairs confirmation requests with verdicts by id
//! - **classifier** — turns raw calls into `SensitiveRequest`s
//! - **GuardedProvider** — `HostProvider` decorator with one adapter per call shape
//! - **AttachmentManager** — polls a `ProviderSlot` and installs the wrapper once
//! - **WalletGuard** — wires the above together

pub mod attach;
pub mod channel;
pub mod classifier;
pub mod config;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod network;
pub mod pipe;
pub mod provider;
pub mod types;

// Re-export core types
pub use attach::{AttachmentHandle, AttachmentManager, AttachmentState, ProviderSlot};
pub use channel::CorrelationChannel;
pub use classifier::{classify, inspect, Candidate, Classification, SensitiveMethod};
pub use config::GuardConfig;
pub use error::{GuardError, Result};
pub use guard::WalletGuard;
pub use interceptor::GuardedProvider;
pub use network::{FixedNetwork, NetworkInfo, ProviderNetwork};
pub use pipe::{MessagePipe, MpscPipe};
pub use provider::{CallShapes, HostProvider, ResponseCallback, SendArgs, SendOutcome};
pub use types::{
    ConfirmationRequest, ConfirmationResponse, JsonRpcPayload, JsonRpcResponse, ProviderError,
    ProviderErrorKind, ProviderResult, RequestArguments, SensitiveRequest, Verdict,
};

// Re-export the in-memory provider for convenience
pub use provider::memory::MemoryHostProvider;
