//! Prometheus metrics

use crate::error::{CostakingError, Result};
use prometheus::{Gauge, IntCounter, IntGauge, Registry};

/// Module metrics, registered on a caller-owned registry
#[derive(Clone)]
pub struct CostakingMetrics {
    pub periods_sealed: IntCounter,
    pub gauge_payouts: IntCounter,
    pub fee_intercepts: IntCounter,
    pub current_period: IntGauge,
    pub total_score: Gauge,
}

impl CostakingMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let periods_sealed =
            IntCounter::new("costaking_periods_sealed_total", "Reward periods sealed")
                .map_err(metrics_error)?;
        let gauge_payouts = IntCounter::new(
            "costaking_gauge_payouts_total",
            "Non-zero payouts to co-staker reward gauges",
        )
        .map_err(metrics_error)?;
        let fee_intercepts = IntCounter::new(
            "costaking_fee_intercepts_total",
            "Blocks whose collected fees were split",
        )
        .map_err(metrics_error)?;
        let current_period =
            IntGauge::new("costaking_current_period", "Open reward period").map_err(metrics_error)?;
        let total_score =
            Gauge::new("costaking_total_score", "Sum of co-staker scores").map_err(metrics_error)?;

        registry
            .register(Box::new(periods_sealed.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(gauge_payouts.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(fee_intercepts.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(current_period.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(total_score.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            periods_sealed,
            gauge_payouts,
            fee_intercepts,
            current_period,
            total_score,
        })
    }

    pub fn observe_period_sealed(&self, next_period: u64, total_score: u128) {
        self.periods_sealed.inc();
        self.current_period.set(next_period as i64);
        self.total_score.set(total_score as f64);
    }

    pub fn observe_total_score(&self, total_score: u128) {
        self.total_score.set(total_score as f64);
    }
}

fn metrics_error(err: prometheus::Error) -> CostakingError {
    CostakingError::Config(format!("metrics: {}", err))
}
