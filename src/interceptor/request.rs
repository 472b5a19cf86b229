//! Promise-shape adapter

use super::Gate;
use crate::provider::HostProvider;
use crate::types::{ProviderError, ProviderResult, RequestArguments};
use serde_json::Value;

/// Gate a `request()` call; rejection fails the returned future
pub(super) async fn intercept(
    inner: &dyn HostProvider,
    gate: &Gate,
    args: RequestArguments,
) -> ProviderResult<Value> {
    gate.admit(&args.method, args.params.as_ref())
        .await
        .map_err(ProviderError::from)?;
    inner.request(args).await
}
