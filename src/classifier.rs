//! Request classifier
//!
//! Decides whether a raw provider call moves value or produces a
//! signature, and if so normalizes it into a `SensitiveRequest`.
//! Calls that match a sensitive method name but lack the arguments that
//! method requires are treated as not sensitive and forwarded, so a
//! malformed call is never blocked spuriously.

use crate::error::Result;
use crate::network::NetworkInfo;
use crate::types::{positional, SensitiveRequest};
use serde_json::Value;

/// Length of an address in hex digits, without the `0x` prefix
const ADDRESS_HEX_LEN: usize = 40;

/// RPC methods that require confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensitiveMethod {
    /// `eth_sendTransaction`
    SendTransaction,
    /// `eth_signTypedData_v3`
    SignTypedDataV3,
    /// `eth_signTypedData_v4`
    SignTypedDataV4,
    /// `personal_sign` — params are `(message, address)`
    PersonalSign,
    /// `eth_sign` — params are `(address, message)`
    EthSign,
}

impl SensitiveMethod {
    /// Look up a method by its RPC name
    pub fn from_name(method: &str) -> Option<Self> {
        match method {
            "eth_sendTransaction" => Some(Self::SendTransaction),
            "eth_signTypedData_v3" => Some(Self::SignTypedDataV3),
            "eth_signTypedData_v4" => Some(Self::SignTypedDataV4),
            "personal_sign" => Some(Self::PersonalSign),
            "eth_sign" => Some(Self::EthSign),
            _ => None,
        }
    }

    /// RPC name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendTransaction => "eth_sendTransaction",
            Self::SignTypedDataV3 => "eth_signTypedData_v3",
            Self::SignTypedDataV4 => "eth_signTypedData_v4",
            Self::PersonalSign => "personal_sign",
            Self::EthSign => "eth_sign",
        }
    }
}

impl std::fmt::Display for SensitiveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensitive call whose chain id has not been looked up yet
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Transaction object as passed by the page
    Transaction { payload: Value },
    /// Signer address and parsed typed data
    TypedSignature { address: String, typed_data: Value },
    /// Message to sign
    UntypedSignature { message: String },
}

impl Candidate {
    /// Finish the request, querying `network` when a chain id is needed
    pub async fn resolve(self, network: &dyn NetworkInfo) -> Result<SensitiveRequest> {
        Ok(match self {
            Candidate::Transaction { payload } => SensitiveRequest::Transaction {
                payload,
                chain_id: network.chain_id().await?,
            },
            Candidate::TypedSignature {
                address,
                typed_data,
            } => SensitiveRequest::TypedSignature {
                address,
                typed_data,
                chain_id: network.chain_id().await?,
            },
            Candidate::UntypedSignature { message } => {
                SensitiveRequest::UntypedSignature { message }
            }
        })
    }
}

/// Outcome of classifying one call
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Forward untouched
    NotSensitive,
    /// Needs confirmation
    Sensitive(SensitiveRequest),
}

/// Pure part of classification: match the method and validate its arguments
pub fn inspect(method: &str, params: Option<&Value>) -> Option<Candidate> {
    let method = SensitiveMethod::from_name(method)?;
    let params = positional(params);

    match method {
        SensitiveMethod::SendTransaction => match params.first() {
            Some(tx @ Value::Object(_)) => Some(Candidate::Transaction {
                payload: tx.clone(),
            }),
            _ => None,
        },
        SensitiveMethod::SignTypedDataV3 | SensitiveMethod::SignTypedDataV4 => {
            let address = params.first()?.as_str().filter(|a| !a.is_empty())?;
            let typed_data = match params.get(1)? {
                Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
                data @ Value::Object(_) => data.clone(),
                _ => return None,
            };
            if !typed_data.is_object() {
                return None;
            }
            Some(Candidate::TypedSignature {
                address: address.to_string(),
                typed_data,
            })
        }
        SensitiveMethod::PersonalSign | SensitiveMethod::EthSign => {
            let first = params.first()?.as_str()?;
            let second = params.get(1)?.as_str()?;
            // personal_sign and eth_sign disagree on argument order
            let message = if is_address_like(first) { second } else { first };
            Some(Candidate::UntypedSignature {
                message: message.to_string(),
            })
        }
    }
}

/// Classify a call, looking up the chain id for kinds annotated with one
pub async fn classify(
    method: &str,
    params: Option<&Value>,
    network: &dyn NetworkInfo,
) -> Result<Classification> {
    match inspect(method, params) {
        Some(candidate) => Ok(Classification::Sensitive(candidate.resolve(network).await?)),
        None => Ok(Classification::NotSensitive),
    }
}

/// Whether `value` has the length of a hex address (prefix optional)
pub fn is_address_like(value: &str) -> bool {
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex.len() == ADDRESS_HEX_LEN
}
