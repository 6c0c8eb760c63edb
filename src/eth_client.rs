// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::types::{Address as EthAddress, Filter, H256};
use tap::TapFallible;

use crate::error::{ValidationError, ValidationResult};
use crate::events::EventDescriptor;
use crate::metrics::ValidatorMetrics;
use crate::types::EthLog;
use crate::validator::LogSource;

#[cfg(test)]
use crate::eth_mock_provider::EthMockProvider;

/// Widest block range a single `eth_getLogs` query covers by default.
/// Providers reject unbounded ranges; wider requests are split.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 1000;

pub struct EthClient<P> {
    provider: Provider<P>,
    /// Expected chain ID for validation
    expected_chain_id: Option<u64>,
    max_block_range: u64,
    metrics: Arc<ValidatorMetrics>,
}

impl EthClient<Http> {
    pub async fn new(
        provider_url: &str,
        expected_chain_id: Option<u64>,
        metrics: Arc<ValidatorMetrics>,
    ) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(provider_url)?;
        let self_ = Self {
            provider,
            expected_chain_id,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            metrics,
        };
        self_.describe().await?;
        Ok(self_)
    }
}

#[cfg(test)]
impl EthClient<EthMockProvider> {
    pub fn new_mocked(provider: EthMockProvider, expected_chain_id: Option<u64>) -> Self {
        Self {
            provider: Provider::new(provider),
            expected_chain_id,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            metrics: ValidatorMetrics::new_for_testing(),
        }
    }
}

impl<P> EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    pub fn with_max_block_range(mut self, range: u64) -> Self {
        assert!(range > 0, "max block range must be positive");
        self.max_block_range = range;
        self
    }

    pub async fn get_chain_id(&self) -> anyhow::Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        Ok(chain_id.as_u64())
    }

    // Validate chain identifier and log connection info
    async fn describe(&self) -> anyhow::Result<()> {
        let chain_id = self.get_chain_id().await?;
        let block_number = self.provider.get_block_number().await?;
        if let Some(expected) = self.expected_chain_id {
            if chain_id != expected {
                return Err(anyhow::anyhow!(
                    "Chain ID mismatch: expected {}, got {}. This could indicate connecting to the wrong network!",
                    expected,
                    chain_id
                ));
            }
            tracing::info!(
                "[EthClient] Connected to chain {} (verified), current block: {}",
                chain_id,
                block_number
            );
        } else {
            tracing::warn!(
                "[EthClient] Connected to chain {} (NOT VERIFIED - no expected chain ID set), current block: {}",
                chain_id,
                block_number
            );
        }
        Ok(())
    }

    /// Fetch every log emitted by `address` with `signature` as topic0 in the
    /// inclusive block range, ascending by (block number, log index).
    ///
    /// Ranges wider than `max_block_range` are issued as multiple sub-range
    /// queries; pagination is this adapter's responsibility, callers never
    /// chunk. No retry here either - a failed query surfaces as
    /// `LogFetchFailed` and retryability is the caller's decision.
    pub async fn get_events_in_range(
        &self,
        address: EthAddress,
        signature: H256,
        start_block: u64,
        end_block: u64,
    ) -> ValidationResult<Vec<EthLog>> {
        let mut events = Vec::new();
        let mut cursor = start_block;
        while cursor <= end_block {
            let chunk_end = std::cmp::min(
                cursor.saturating_add(self.max_block_range - 1),
                end_block,
            );
            let filter = event_filter(address, signature, cursor, chunk_end);
            let timer = self
                .metrics
                .eth_rpc_queries_latency
                .with_label_values(&["eth_getLogs"])
                .start_timer();
            let logs = self
                .provider
                .get_logs(&filter)
                .await
                .map_err(|e| ValidationError::LogFetchFailed(e.to_string()))
                .tap_err(|e| {
                    tracing::error!(
                        "[EthClient] get_events_in_range failed. Filter: {:?}. Error {:?}",
                        filter,
                        e
                    )
                })?;
            timer.observe_duration();
            self.metrics
                .eth_rpc_queries
                .with_label_values(&["eth_getLogs"])
                .inc();

            for log in logs {
                // Safeguard checks that the provider honored the filter
                if log.address != address {
                    return Err(ValidationError::LogFetchFailed(format!(
                        "Provider returns logs from different contract address (expected: {:?}): {:?}",
                        address, log
                    )));
                }
                if log.topics.first() != Some(&signature) {
                    return Err(ValidationError::LogFetchFailed(format!(
                        "Provider returns logs with different event signature (expected: {:?}): {:?}",
                        signature, log
                    )));
                }
                let block_number = log
                    .block_number
                    .ok_or_else(|| {
                        ValidationError::LogFetchFailed(
                            "Provider returns log without block_number".into(),
                        )
                    })?
                    .as_u64();
                let tx_hash = log.transaction_hash.ok_or_else(|| {
                    ValidationError::LogFetchFailed(
                        "Provider returns log without transaction_hash".into(),
                    )
                })?;
                events.push(EthLog {
                    block_number,
                    tx_hash,
                    log,
                });
            }

            if chunk_end == u64::MAX {
                break;
            }
            cursor = chunk_end + 1;
        }
        self.metrics.logs_fetched.inc_by(events.len() as u64);
        events.sort_by_key(|e| (e.block_number, e.log.log_index.unwrap_or_default()));
        Ok(events)
    }
}

#[async_trait]
impl<P> LogSource for EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    async fn fetch_logs(
        &self,
        contract: EthAddress,
        event: &EventDescriptor,
        from_block: u64,
        to_block: u64,
        chain_id: Option<u64>,
    ) -> ValidationResult<Vec<EthLog>> {
        if let (Some(expected), Some(requested)) = (self.expected_chain_id, chain_id) {
            if expected != requested {
                return Err(ValidationError::LogFetchFailed(format!(
                    "Chain selector mismatch: client is configured for chain {expected}, fetch requested chain {requested}"
                )));
            }
        }
        self.get_events_in_range(contract, event.signature(), from_block, to_block)
            .await
    }
}

pub(crate) fn event_filter(
    address: EthAddress,
    signature: H256,
    from_block: u64,
    to_block: u64,
) -> Filter {
    Filter::new()
        .from_block(from_block)
        .to_block(to_block)
        .address(address)
        .topic0(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        make_raw_log, mock_get_logs, transfer_event_descriptor, uint_topic,
    };
    use ethers::types::Log;

    #[tokio::test]
    async fn test_get_events_in_range_sorts_ascending() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        let filter = event_filter(address, signature, 100, 200);
        // Provider answers out of order; client restores ascending order
        let logs = vec![
            make_raw_log(address, signature, vec![uint_topic(2)], 150, 1),
            make_raw_log(address, signature, vec![uint_topic(1)], 120, 0),
            make_raw_log(address, signature, vec![uint_topic(3)], 150, 0),
        ];
        mock_get_logs(&mock_provider, &filter, logs);

        let client = EthClient::new_mocked(mock_provider, None);
        let events = client
            .get_events_in_range(address, signature, 100, 200)
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].block_number, 120);
        assert_eq!(events[1].block_number, 150);
        assert_eq!(events[1].log.log_index, Some(0.into()));
        assert_eq!(events[2].log.log_index, Some(1.into()));
    }

    #[tokio::test]
    async fn test_get_events_in_range_empty_result() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        let filter = event_filter(address, signature, 100, 200);
        mock_get_logs(&mock_provider, &filter, vec![]);

        let client = EthClient::new_mocked(mock_provider, None);
        let events = client
            .get_events_in_range(address, signature, 100, 200)
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_get_events_in_range_chunks_wide_ranges() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        // Range 100..=199 with a 50-block cap: two sub-queries
        mock_get_logs(
            &mock_provider,
            &event_filter(address, signature, 100, 149),
            vec![make_raw_log(address, signature, vec![uint_topic(1)], 110, 0)],
        );
        mock_get_logs(
            &mock_provider,
            &event_filter(address, signature, 150, 199),
            vec![make_raw_log(address, signature, vec![uint_topic(2)], 160, 0)],
        );

        let client = EthClient::new_mocked(mock_provider, None).with_max_block_range(50);
        let events = client
            .get_events_in_range(address, signature, 100, 199)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].block_number, 110);
        assert_eq!(events[1].block_number, 160);
    }

    #[tokio::test]
    async fn test_foreign_contract_address_is_rejected() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        let filter = event_filter(address, signature, 100, 200);
        let foreign = make_raw_log(EthAddress::random(), signature, vec![], 120, 0);
        mock_get_logs(&mock_provider, &filter, vec![foreign]);

        let client = EthClient::new_mocked(mock_provider, None);
        let error = client
            .get_events_in_range(address, signature, 100, 200)
            .await
            .unwrap_err();
        assert!(matches!(error, ValidationError::LogFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        let filter = event_filter(address, signature, 100, 200);
        let foreign = make_raw_log(address, H256::random(), vec![], 120, 0);
        mock_get_logs(&mock_provider, &filter, vec![foreign]);

        let client = EthClient::new_mocked(mock_provider, None);
        let error = client
            .get_events_in_range(address, signature, 100, 200)
            .await
            .unwrap_err();
        assert!(matches!(error, ValidationError::LogFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_log_without_block_number_is_rejected() {
        let mock_provider = EthMockProvider::new();
        let address = EthAddress::random();
        let signature = H256::random();
        let filter = event_filter(address, signature, 100, 200);
        let log = Log {
            address,
            topics: vec![signature],
            ..Default::default()
        };
        mock_get_logs(&mock_provider, &filter, vec![log]);

        let client = EthClient::new_mocked(mock_provider, None);
        let error = client
            .get_events_in_range(address, signature, 100, 200)
            .await
            .unwrap_err();
        assert!(matches!(error, ValidationError::LogFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_unmocked_query_surfaces_as_log_fetch_failed() {
        let client = EthClient::new_mocked(EthMockProvider::new(), None);
        let error = client
            .get_events_in_range(EthAddress::random(), H256::random(), 1, 2)
            .await
            .unwrap_err();
        assert!(matches!(error, ValidationError::LogFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_logs_rejects_chain_selector_mismatch() {
        // No RPC is mocked; the mismatch must be caught before any query
        let client = EthClient::new_mocked(EthMockProvider::new(), Some(1));
        let error = client
            .fetch_logs(
                EthAddress::random(),
                &transfer_event_descriptor(),
                100,
                200,
                Some(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ValidationError::LogFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_get_chain_id() {
        let mock_provider = EthMockProvider::new();
        crate::test_utils::mock_chain_id(&mock_provider, 31337);
        let client = EthClient::new_mocked(mock_provider, None);
        assert_eq!(client.get_chain_id().await.unwrap(), 31337);
    }
}
