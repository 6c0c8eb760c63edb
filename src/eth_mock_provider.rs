// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock JSON-RPC client that returns canned responses keyed by method name
//! and serialized params, so tests can drive the real `Provider` code paths.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::providers::{JsonRpcClient, MockError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct EthMockProvider {
    responses: Arc<Mutex<HashMap<(String, String), Value>>>,
}

impl EthMockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the response for a (method, params) pair. Params must
    /// serialize exactly as the provider will serialize them at call time.
    pub fn add_response<P, T, K>(&self, method: &str, params: P, data: K) -> Result<(), MockError>
    where
        P: Serialize + Send + Sync,
        T: Serialize + Send + Sync,
        K: Borrow<T>,
    {
        let params = serde_json::to_value(params)?.to_string();
        let value = serde_json::to_value(data.borrow())?;
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_owned(), params), value);
        Ok(())
    }
}

#[async_trait]
impl JsonRpcClient for EthMockProvider {
    type Error = MockError;

    async fn request<T: Debug + Serialize + Send + Sync, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, MockError> {
        let params = serde_json::to_value(params)?.to_string();
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&(method.to_owned(), params))
            .cloned()
            .ok_or(MockError::EmptyResponses)?;
        Ok(serde_json::from_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U64;

    #[tokio::test]
    async fn test_response_keyed_by_method_and_params() {
        let provider = EthMockProvider::new();
        provider
            .add_response::<_, U64, _>("eth_blockNumber", (), U64::from(7))
            .unwrap();
        let response: U64 = provider.request("eth_blockNumber", ()).await.unwrap();
        assert_eq!(response, U64::from(7));

        // Different params miss
        let miss: Result<U64, _> = provider.request("eth_blockNumber", ["latest"]).await;
        assert!(miss.is_err());
        // Different method misses
        let miss: Result<U64, _> = provider.request("eth_chainId", ()).await;
        assert!(miss.is_err());
    }

    #[tokio::test]
    async fn test_later_response_replaces_earlier() {
        let provider = EthMockProvider::new();
        provider
            .add_response::<_, U64, _>("eth_blockNumber", (), U64::from(7))
            .unwrap();
        provider
            .add_response::<_, U64, _>("eth_blockNumber", (), U64::from(8))
            .unwrap();
        let response: U64 = provider.request("eth_blockNumber", ()).await.unwrap();
        assert_eq!(response, U64::from(8));
    }
}
