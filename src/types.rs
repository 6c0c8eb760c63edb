// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use ethers::types::{Address as EthAddress, Log, TxHash, H256};
use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;
use crate::events::EventDescriptor;

/// One on-chain event-occurrence requirement: which event, from which
/// contract, must satisfy which rule. Immutable once read from chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    /// topic0 hash of the required event
    pub signature: H256,
    /// Contract the event must be emitted by
    pub target_contract: EthAddress,
    /// Rule every matching log must satisfy
    pub action_parameter: Criteria,
}

impl ActionStep {
    pub fn new(signature: H256, target_contract: EthAddress, action_parameter: Criteria) -> Self {
        Self {
            signature,
            target_contract,
            action_parameter,
        }
    }
}

/// Opaque descriptor of how a claimant is identified from qualifying logs.
/// Read through the chain reader and passed downstream untouched; no
/// extraction logic lives in this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClaimant {
    pub signature: H256,
    pub field_index: u8,
    pub target_contract: EthAddress,
}

/// An event log fetched from chain, with the block context the raw
/// `Log` type leaves optional already required and unwrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthLog {
    pub block_number: u64,
    pub tx_hash: TxHash,
    pub log: Log,
}

/// Caller-supplied parameters for one validation pass: the block range and
/// chain to fetch from, plus an optional event-shape override map.
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    /// Inclusive start block
    pub from_block: u64,
    /// Inclusive end block
    pub to_block: u64,
    /// Chain selector; checked against the log source's configured chain
    pub chain_id: Option<u64>,
    /// When present, replaces the registry for signature resolution
    pub known_events: Option<HashMap<H256, EventDescriptor>>,
}

impl FetchParams {
    pub fn new(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            chain_id: None,
            known_events: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_known_events(mut self, known_events: HashMap<H256, EventDescriptor>) -> Self {
        self.known_events = Some(known_events);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::PrimitiveType;
    use ethers::types::U256;

    #[test]
    fn test_action_step_serde_round_trip() {
        let step = ActionStep::new(
            H256::random(),
            EthAddress::random(),
            Criteria::greater_than(1, U256::from(100)),
        );
        let encoded = serde_json::to_string(&step).unwrap();
        let decoded: ActionStep = serde_json::from_str(&encoded).unwrap();
        assert_eq!(step, decoded);
    }

    #[test]
    fn test_action_claimant_serde_round_trip() {
        let claimant = ActionClaimant {
            signature: H256::random(),
            field_index: 2,
            target_contract: EthAddress::random(),
        };
        let encoded = serde_json::to_string(&claimant).unwrap();
        let decoded: ActionClaimant = serde_json::from_str(&encoded).unwrap();
        assert_eq!(claimant, decoded);
    }

    #[test]
    fn test_fetch_params_builders() {
        let params = FetchParams::new(100, 200).with_chain_id(11155111);
        assert_eq!(params.from_block, 100);
        assert_eq!(params.to_block, 200);
        assert_eq!(params.chain_id, Some(11155111));
        assert!(params.known_events.is_none());

        let criteria_equal = Criteria::equal(PrimitiveType::Address, 1, vec![0u8; 32]);
        assert_eq!(criteria_equal.field_index, 1);
    }
}
