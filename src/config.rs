// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use ethers::providers::Http;
use ethers::types::Address as EthAddress;
use serde::{Deserialize, Serialize};

use crate::eth_client::EthClient;
use crate::events::EventRegistry;
use crate::metrics::ValidatorMetrics;
use crate::validator::EventActionValidator;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EthConfig {
    // Rpc url for Eth fullnode, used for log queries.
    pub eth_rpc_url: String,
    // The expected chain id on the Eth side; queries against a node on a
    // different chain are refused.
    #[serde(default)]
    pub eth_chain_id: Option<u64>,
    // Widest block range a single eth_getLogs query may cover.
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
}

fn default_max_block_range() -> u64 {
    crate::eth_client::DEFAULT_MAX_BLOCK_RANGE
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventActionConfig {
    // The contract the declared action steps are read from.
    pub action_contract_address: String,
    // Eth configuration
    pub eth: EthConfig,
}

impl EventActionConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config from {:?}", path.as_ref()))?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-check the raw config, returning the parsed action contract
    /// address.
    pub fn validate(&self) -> anyhow::Result<EthAddress> {
        let address = self
            .action_contract_address
            .parse::<EthAddress>()
            .map_err(|e| {
                anyhow!(
                    "Invalid action contract address {}: {e}",
                    self.action_contract_address
                )
            })?;
        if self.eth.max_block_range == 0 {
            return Err(anyhow!("max-block-range must be positive"));
        }
        Ok(address)
    }

    /// Build a validator over a live provider, with the built-in well-known
    /// event table.
    pub async fn build_validator(
        &self,
        metrics: Arc<ValidatorMetrics>,
    ) -> anyhow::Result<EventActionValidator<EthClient<Http>>> {
        self.validate()?;
        let client = EthClient::new(&self.eth.eth_rpc_url, self.eth.eth_chain_id, metrics)
            .await?
            .with_max_block_range(self.eth.max_block_range);
        Ok(EventActionValidator::new(
            EventRegistry::well_known(),
            client,
        ))
    }
}
