//! Ordered fallback over [`EstimationStrategy`] implementations.

use lusaka_waste_population_models::{PopulationEstimate, StrategyAttempt};

use crate::strategy::{
    AreaFallbackStrategy, BuildingFootprintStrategy, EstimationStrategy,
    GriddedPopulationStrategy, StoredEstimateStrategy, UserClassificationStrategy,
};
use crate::{EstimationContext, EstimatorConfig};

/// Runs strategies in order and stops at the first success.
pub struct FallbackChain {
    strategies: Vec<Box<dyn EstimationStrategy>>,
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl FallbackChain {
    /// Gridded population, building footprints, user classification,
    /// stored estimate, area fallback.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(GriddedPopulationStrategy),
            Box::new(BuildingFootprintStrategy),
            Box::new(UserClassificationStrategy),
            Box::new(StoredEstimateStrategy),
            Box::new(AreaFallbackStrategy),
        ])
    }

    /// A chain over custom strategies.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn EstimationStrategy>>) -> Self {
        Self { strategies }
    }

    /// Runs the chain.
    ///
    /// Returns the winning estimate, if any, and one [`StrategyAttempt`]
    /// per strategy tried.
    #[must_use]
    pub fn run(
        &self,
        ctx: &EstimationContext<'_>,
        config: &EstimatorConfig,
    ) -> (Option<PopulationEstimate>, Vec<StrategyAttempt>) {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let method = strategy.method();
            match strategy.attempt(ctx, config) {
                Ok(estimate) => {
                    log::debug!(
                        "Zone {}: {method} estimate {} ({})",
                        ctx.zone.id,
                        estimate.value,
                        estimate.source
                    );
                    attempts.push(StrategyAttempt {
                        method,
                        succeeded: true,
                        detail: format!("{} residents", estimate.value),
                    });
                    return (Some(estimate), attempts);
                }
                Err(e) => {
                    log::warn!("Zone {}: {method} unavailable, falling back: {e}", ctx.zone.id);
                    attempts.push(StrategyAttempt {
                        method,
                        succeeded: false,
                        detail: e.to_string(),
                    });
                }
            }
        }

        (None, attempts)
    }
}
