// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Action step validation.
//!
//! A claim declares an ordered list of [`ActionStep`]s; each step is valid
//! when every log it implies satisfies its criterion, and the claim is valid
//! only when every step is. Log fetching is the only I/O and hides behind
//! [`LogSource`]; reading the declared steps hides behind
//! [`ActionStepSource`]. Both are injected so the engine stays free of
//! hidden state and testable without a chain.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address as EthAddress, H256};
use futures::future::join_all;

use crate::criteria::evaluate_criteria;
use crate::error::{ValidationError, ValidationResult};
use crate::events::{EventDescriptor, EventRegistry};
use crate::metrics::ValidatorMetrics;
use crate::types::{ActionClaimant, ActionStep, EthLog, FetchParams};

/// Source of event logs for a {contract, event, block range} query.
///
/// Implementations must return *all* matching logs in ascending
/// block/log-index order and own their transport policy (pagination,
/// timeouts); the engine neither retries nor chunks.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_logs(
        &self,
        contract: EthAddress,
        event: &EventDescriptor,
        from_block: u64,
        to_block: u64,
        chain_id: Option<u64>,
    ) -> ValidationResult<Vec<EthLog>>;
}

/// Read access to the action steps a claim declares on chain.
#[async_trait]
pub trait ActionStepSource: Send + Sync {
    async fn action_steps_count(&self) -> ValidationResult<usize>;
    async fn action_step(&self, index: usize) -> ValidationResult<ActionStep>;
    async fn action_steps(&self) -> ValidationResult<Vec<ActionStep>>;
    async fn action_claimant(&self) -> ValidationResult<ActionClaimant>;
}

/// Verdict for one step out of a full (non-short-circuiting) report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub signature: H256,
    pub passed: bool,
}

pub struct EventActionValidator<S> {
    registry: EventRegistry,
    log_source: S,
    metrics: Option<Arc<ValidatorMetrics>>,
}

impl<S> EventActionValidator<S>
where
    S: LogSource,
{
    pub fn new(registry: EventRegistry, log_source: S) -> Self {
        Self {
            registry,
            log_source,
            metrics: None,
        }
    }

    /// Attach metrics for monitoring
    pub fn with_metrics(mut self, metrics: Arc<ValidatorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Validate a single action step.
    ///
    /// Resolves the step's event shape, fetches the logs it implies and
    /// evaluates each in fetch order. The first failing log decides the step
    /// (remaining logs are not evaluated); a step with zero matching logs is
    /// vacuously valid. Resolution, fetch and evaluation errors propagate
    /// unmodified - "cannot determine validity" is not "invalid".
    pub async fn validate_action_step(
        &self,
        step: &ActionStep,
        params: &FetchParams,
    ) -> ValidationResult<bool> {
        let result = self.validate_step_inner(step, params).await;
        self.record_step_outcome(&result);
        result
    }

    async fn validate_step_inner(
        &self,
        step: &ActionStep,
        params: &FetchParams,
    ) -> ValidationResult<bool> {
        let event = self
            .registry
            .resolve(step.signature, params.known_events.as_ref())?;
        let logs = self
            .log_source
            .fetch_logs(
                step.target_contract,
                &event,
                params.from_block,
                params.to_block,
                params.chain_id,
            )
            .await?;
        tracing::debug!(
            "[Validator] Evaluating {} logs of {} from {:?} against criteria",
            logs.len(),
            event.name,
            step.target_contract
        );
        for log in &logs {
            if !evaluate_criteria(&step.action_parameter, log)? {
                tracing::info!(
                    "[Validator] Step failed: log in block {} tx {:?} does not satisfy criteria",
                    log.block_number,
                    log.tx_hash
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Validate an ordered step set; the claim is valid only if every step is.
    ///
    /// Fetches for all steps are issued concurrently (steps share no mutable
    /// state), but results are reduced strictly in declared order with the
    /// same first-failure-wins semantics as a sequential pass: an earlier
    /// step's `false` wins over a later step's error, exactly as if the later
    /// fetch had never been issued. Concurrency changes latency, never the
    /// outcome.
    pub async fn validate_action_steps(
        &self,
        steps: &[ActionStep],
        params: &FetchParams,
    ) -> ValidationResult<bool> {
        let results = join_all(
            steps
                .iter()
                .map(|step| self.validate_action_step(step, params)),
        )
        .await;
        for (index, result) in results.into_iter().enumerate() {
            if !result? {
                tracing::info!("[Validator] Action step {} failed validation", index);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Evaluate every step and report each verdict, for callers diagnosing a
    /// rejected claim. Unlike [`validate_action_steps`] this does not stop at
    /// the first failing step; errors still propagate, first in step order.
    ///
    /// [`validate_action_steps`]: Self::validate_action_steps
    pub async fn report_action_steps(
        &self,
        steps: &[ActionStep],
        params: &FetchParams,
    ) -> ValidationResult<Vec<StepReport>> {
        let results = join_all(
            steps
                .iter()
                .map(|step| self.validate_action_step(step, params)),
        )
        .await;
        let mut reports = Vec::with_capacity(steps.len());
        for (index, result) in results.into_iter().enumerate() {
            reports.push(StepReport {
                index,
                signature: steps[index].signature,
                passed: result?,
            });
        }
        Ok(reports)
    }

    /// Read the declared steps through the chain reader and validate them.
    /// Steps are read fresh on every call; repeated calls may observe
    /// different logs as chain state advances.
    pub async fn validate_action<A>(
        &self,
        source: &A,
        params: &FetchParams,
    ) -> ValidationResult<bool>
    where
        A: ActionStepSource,
    {
        let steps = source.action_steps().await?;
        self.validate_action_steps(&steps, params).await
    }

    fn record_step_outcome(&self, result: &ValidationResult<bool>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        match result {
            Ok(passed) => {
                metrics.action_steps_validated.inc();
                if !passed {
                    metrics.action_steps_failed.inc();
                }
            }
            Err(e) => metrics
                .validation_errors
                .with_label_values(&[e.error_type()])
                .inc(),
        }
    }
}
