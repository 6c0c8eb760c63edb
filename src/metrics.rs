// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, HistogramVec, IntCounter, IntCounterVec, Registry,
};

const LATENCY_SEC_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10., 20., 40., 80., 160.,
];

#[derive(Clone, Debug)]
pub struct ValidatorMetrics {
    pub(crate) eth_rpc_queries: IntCounterVec,
    pub(crate) eth_rpc_queries_latency: HistogramVec,
    pub(crate) logs_fetched: IntCounter,
    pub(crate) action_steps_validated: IntCounter,
    pub(crate) action_steps_failed: IntCounter,
    pub(crate) validation_errors: IntCounterVec,
}

impl ValidatorMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            eth_rpc_queries: register_int_counter_vec_with_registry!(
                "event_action_eth_rpc_queries",
                "Total number of eth rpc queries issued while fetching logs",
                &["method"],
                registry,
            )
            .unwrap(),
            eth_rpc_queries_latency: register_histogram_vec_with_registry!(
                "event_action_eth_rpc_queries_latency",
                "Latency of eth rpc queries issued while fetching logs",
                &["method"],
                LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            logs_fetched: register_int_counter_with_registry!(
                "event_action_logs_fetched",
                "Total number of logs fetched for criteria evaluation",
                registry,
            )
            .unwrap(),
            action_steps_validated: register_int_counter_with_registry!(
                "event_action_steps_validated",
                "Total number of action steps that reached a definitive verdict",
                registry,
            )
            .unwrap(),
            action_steps_failed: register_int_counter_with_registry!(
                "event_action_steps_failed",
                "Total number of action steps whose verdict was invalid",
                registry,
            )
            .unwrap(),
            validation_errors: register_int_counter_vec_with_registry!(
                "event_action_validation_errors",
                "Validation attempts that ended indeterminate, by error type",
                &["error_type"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Arc<Self> {
        Arc::new(Self::new(&Registry::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_count() {
        let metrics = ValidatorMetrics::new_for_testing();
        metrics.logs_fetched.inc_by(3);
        assert_eq!(metrics.logs_fetched.get(), 3);

        metrics
            .validation_errors
            .with_label_values(&["unknown_event"])
            .inc();
        assert_eq!(
            metrics
                .validation_errors
                .with_label_values(&["unknown_event"])
                .get(),
            1
        );

        metrics
            .eth_rpc_queries
            .with_label_values(&["eth_getLogs"])
            .inc();
        assert_eq!(
            metrics
                .eth_rpc_queries
                .with_label_values(&["eth_getLogs"])
                .get(),
            1
        );
    }
}
