//! Core types for the wallet guard
//!
//! All wire types use camelCase JSON serialization so they match what
//! pages and confirmation surfaces exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// EIP-1193 code for a request the user rejected
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code for an internal error
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// A call that moves value or produces a signature
///
/// Built fresh for every intercepted call and dropped once its
/// confirmation round trip finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SensitiveRequest {
    /// `eth_sendTransaction`
    Transaction {
        /// The transaction object exactly as the page passed it
        payload: Value,
        /// Active chain at the time of the call
        #[serde(rename = "chainId")]
        chain_id: u64,
    },

    /// `eth_signTypedData_v3` / `eth_signTypedData_v4`
    TypedSignature {
        /// Signer address
        address: String,
        /// Parsed typed-data document
        #[serde(rename = "typedData")]
        typed_data: Value,
        /// Active chain at the time of the call
        #[serde(rename = "chainId")]
        chain_id: u64,
    },

    /// `personal_sign` / `eth_sign`
    UntypedSignature {
        /// Message to be signed
        message: String,
    },
}

impl SensitiveRequest {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SensitiveRequest::Transaction { .. } => "transaction",
            SensitiveRequest::TypedSignature { .. } => "typedSignature",
            SensitiveRequest::UntypedSignature { .. } => "untypedSignature",
        }
    }

    /// Chain id, for the kinds annotated with one
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            SensitiveRequest::Transaction { chain_id, .. }
            | SensitiveRequest::TypedSignature { chain_id, .. } => Some(*chain_id),
            SensitiveRequest::UntypedSignature { .. } => None,
        }
    }

    /// Message carried by the error returned to the page on rejection
    pub fn rejection_message(&self) -> &'static str {
        match self {
            SensitiveRequest::Transaction { .. } => "User denied transaction signature.",
            _ => "User denied message signature.",
        }
    }
}

/// Outbound message asking the confirmation authority for a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    /// Correlation identifier (cfm-<uuid>)
    pub id: String,
    /// Origin of the page that made the call
    pub origin: String,
    /// The request to confirm
    pub payload: SensitiveRequest,
}

/// Inbound message carrying the authority's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResponse {
    /// Identifier of the request being answered
    pub id: String,
    /// `true` to approve
    pub response: bool,
}

/// The authority's decision for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Identifier the verdict answers
    pub id: String,
    /// Whether the user approved
    pub approved: bool,
}

/// Arguments of a promise-shape `request()` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    /// RPC method name
    pub method: String,

    /// Raw params, forwarded untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestArguments {
    /// Create request arguments
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 request object, as used by the callback and legacy shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcPayload {
    /// Request id chosen by the page
    #[serde(default)]
    pub id: Value,

    /// Protocol version, normally "2.0"
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,

    /// RPC method name
    pub method: String,

    /// Raw params, forwarded untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl JsonRpcPayload {
    /// Create a JSON-RPC 2.0 payload
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: id.into(),
            jsonrpc: default_jsonrpc(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Id of the request this answers
    pub id: Value,

    /// Protocol version
    pub jsonrpc: String,

    /// Successful result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

impl JsonRpcResponse {
    /// Build a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            jsonrpc: default_jsonrpc(),
            result: Some(result),
            error: None,
        }
    }

    /// Build an error-shaped response
    pub fn failure(id: Value, error: ProviderError) -> Self {
        Self {
            id,
            jsonrpc: default_jsonrpc(),
            result: None,
            error: Some(error),
        }
    }
}

/// Machine-checkable category of a `ProviderError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The user declined the request
    UserRejected,
    /// Internal failure
    Internal,
    /// Any other provider error
    Other,
}

/// Error surfaced to the page through a call shape's error channel
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProviderError {
    /// EIP-1193 / JSON-RPC error code
    pub code: i64,

    /// Human-readable message
    pub message: String,

    /// Optional extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderError {
    /// Create an error with an arbitrary code
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// A user-rejection error (code 4001)
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(USER_REJECTED_CODE, message)
    }

    /// An internal error (code -32603)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR_CODE, message)
    }

    /// Category derived from the code
    pub fn kind(&self) -> ProviderErrorKind {
        match self.code {
            USER_REJECTED_CODE => ProviderErrorKind::UserRejected,
            INTERNAL_ERROR_CODE => ProviderErrorKind::Internal,
            _ => ProviderErrorKind::Other,
        }
    }

    /// Shorthand for `kind() == UserRejected`
    pub fn is_user_rejected(&self) -> bool {
        self.kind() == ProviderErrorKind::UserRejected
    }
}

/// Result type of host provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// View raw params as a positional list
///
/// Anything other than a JSON array counts as no positional params.
pub fn positional(params: Option<&Value>) -> &[Value] {
    match params {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}
