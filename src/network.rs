//! Active-network lookup used to annotate sensitive requests

use crate::error::{GuardError, Result};
use crate::provider::HostProvider;
use crate::types::RequestArguments;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Source of the active chain id
#[async_trait]
pub trait NetworkInfo: Send + Sync {
    /// Chain id of the currently selected network
    async fn chain_id(&self) -> Result<u64>;
}

/// Asks a host provider for `eth_chainId`
///
/// Must be given the unwrapped provider so the lookup itself is never
/// gated.
pub struct ProviderNetwork {
    provider: Arc<dyn HostProvider>,
}

impl ProviderNetwork {
    /// Query chain ids through `provider`
    pub fn new(provider: Arc<dyn HostProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl NetworkInfo for ProviderNetwork {
    async fn chain_id(&self) -> Result<u64> {
        let value = self
            .provider
            .request(RequestArguments::new("eth_chainId", None))
            .await
            .map_err(|e| GuardError::Network(format!("eth_chainId failed: {}", e)))?;
        parse_chain_id(&value)
    }
}

/// Fixed chain id, for hosts that know the network up front
#[derive(Debug, Clone, Copy)]
pub struct FixedNetwork(pub u64);

#[async_trait]
impl NetworkInfo for FixedNetwork {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Parse a chain id given as `0x`-hex, decimal text or a JSON number
pub fn parse_chain_id(value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    };
    parsed.ok_or_else(|| GuardError::Network(format!("unrecognized chain id: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::MemoryHostProvider;
    use crate::types::ProviderError;
    use serde_json::json;

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id(&json!("0x1")).unwrap(), 1);
        assert_eq!(parse_chain_id(&json!("0x89")).unwrap(), 137);
        assert_eq!(parse_chain_id(&json!("5")).unwrap(), 5);
        assert_eq!(parse_chain_id(&json!(42161)).unwrap(), 42161);
        assert!(parse_chain_id(&json!("0xzz")).is_err());
        assert!(parse_chain_id(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn test_provider_network() {
        let provider = Arc::new(MemoryHostProvider::with_chain_id(137));
        let network = ProviderNetwork::new(provider);
        assert_eq!(network.chain_id().await.unwrap(), 137);
    }

    #[test]
    fn test_fixed_network() {
        let chain = tokio_test::block_on(FixedNetwork(8453).chain_id());
        assert_eq!(tokio_test::assert_ok!(chain), 8453);
    }

    #[tokio::test]
    async fn test_provider_network_failure() {
        let provider = Arc::new(MemoryHostProvider::with_handler(|_, _| {
            Err(ProviderError::new(4900, "disconnected"))
        }));
        let err = ProviderNetwork::new(provider).chain_id().await.unwrap_err();
        assert!(matches!(err, GuardError::Network(_)));
    }
}
