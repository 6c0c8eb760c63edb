// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use ethers::abi::ParamType;
use ethers::types::{Address as EthAddress, Filter, Log, TxHash, H256, U256, U64};

use crate::error::{ValidationError, ValidationResult};
use crate::eth_mock_provider::EthMockProvider;
use crate::events::{EventDescriptor, EventParam};
use crate::types::{ActionClaimant, ActionStep, EthLog};
use crate::validator::{ActionStepSource, LogSource};

/// ERC-20 style Transfer shape, as the well-known table describes it.
pub fn transfer_event_descriptor() -> EventDescriptor {
    EventDescriptor::new(
        "Transfer",
        vec![
            EventParam::new("from", ParamType::Address, true),
            EventParam::new("to", ParamType::Address, true),
            EventParam::new("tokenId", ParamType::Uint(256), true),
        ],
    )
}

/// Custom incentive event used across validator tests: topic[1] carries the
/// uint the criteria inspect.
pub fn action_event_descriptor() -> EventDescriptor {
    EventDescriptor::new(
        "ActionPerformed",
        vec![
            EventParam::new("points", ParamType::Uint(256), true),
            EventParam::new("account", ParamType::Address, true),
        ],
    )
}

pub fn uint_topic(value: u64) -> H256 {
    H256::from_low_u64_be(value)
}

/// A raw provider log with the fields fetching requires populated.
pub fn make_raw_log(
    contract: EthAddress,
    signature: H256,
    indexed: Vec<H256>,
    block_number: u64,
    log_index: u64,
) -> Log {
    let mut topics = vec![signature];
    topics.extend(indexed);
    Log {
        address: contract,
        topics,
        block_number: Some(U64::from(block_number)),
        transaction_hash: Some(TxHash::random()),
        log_index: Some(U256::from(log_index)),
        ..Default::default()
    }
}

pub fn make_eth_log(
    contract: EthAddress,
    signature: H256,
    indexed: Vec<H256>,
    block_number: u64,
    log_index: u64,
) -> EthLog {
    let log = make_raw_log(contract, signature, indexed, block_number, log_index);
    EthLog {
        block_number,
        tx_hash: log.transaction_hash.unwrap(),
        log,
    }
}

pub fn mock_chain_id(provider: &EthMockProvider, chain_id: u64) {
    provider
        .add_response::<_, U64, _>("eth_chainId", (), U64::from(chain_id))
        .unwrap();
}

/// Mocks `eth_getLogs` for exactly this filter; the filter must be built the
/// same way the client builds it.
pub fn mock_get_logs(provider: &EthMockProvider, filter: &Filter, logs: Vec<Log>) {
    provider
        .add_response::<_, Vec<Log>, _>("eth_getLogs", [filter.clone()], logs)
        .unwrap();
}

enum ContractBehavior {
    Logs(Vec<EthLog>),
    Fail(ValidationError),
}

/// In-memory [`LogSource`]: per-contract canned logs or errors; contracts
/// without an entry have no logs.
#[derive(Default)]
pub struct StaticLogSource {
    behaviors: HashMap<EthAddress, ContractBehavior>,
}

impl StaticLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(mut self, contract: EthAddress, logs: Vec<EthLog>) -> Self {
        self.behaviors
            .insert(contract, ContractBehavior::Logs(logs));
        self
    }

    pub fn with_error(mut self, contract: EthAddress, error: ValidationError) -> Self {
        self.behaviors
            .insert(contract, ContractBehavior::Fail(error));
        self
    }
}

#[async_trait]
impl LogSource for StaticLogSource {
    async fn fetch_logs(
        &self,
        contract: EthAddress,
        _event: &EventDescriptor,
        _from_block: u64,
        _to_block: u64,
        _chain_id: Option<u64>,
    ) -> ValidationResult<Vec<EthLog>> {
        match self.behaviors.get(&contract) {
            Some(ContractBehavior::Logs(logs)) => Ok(logs.clone()),
            Some(ContractBehavior::Fail(error)) => Err(error.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// In-memory [`ActionStepSource`] over a fixed step list.
pub struct StaticStepSource {
    steps: Vec<ActionStep>,
    claimant: ActionClaimant,
}

impl StaticStepSource {
    pub fn new(steps: Vec<ActionStep>) -> Self {
        Self {
            steps,
            claimant: ActionClaimant {
                signature: H256::zero(),
                field_index: 0,
                target_contract: EthAddress::zero(),
            },
        }
    }
}

#[async_trait]
impl ActionStepSource for StaticStepSource {
    async fn action_steps_count(&self) -> ValidationResult<usize> {
        Ok(self.steps.len())
    }

    async fn action_step(&self, index: usize) -> ValidationResult<ActionStep> {
        self.steps.get(index).cloned().ok_or_else(|| {
            ValidationError::StepFetchFailed(format!("no action step at index {index}"))
        })
    }

    async fn action_steps(&self) -> ValidationResult<Vec<ActionStep>> {
        Ok(self.steps.clone())
    }

    async fn action_claimant(&self) -> ValidationResult<ActionClaimant> {
        Ok(self.claimant.clone())
    }
}
