//! Merge strategies over per-provider outcomes.
//!
//! [`merge`] is total over any list of `(provider, result)` pairs and
//! deterministic for identical input in identical order.

use std::collections::{BTreeSet, HashMap};

use crate::models::{AggregateResult, AggregateStatus, Operation, ProviderResult};

use super::metric::Metric;

/// How successful provider results are combined into one value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MergeStrategy {
    /// Take the record of the highest-priority successful provider.
    #[default]
    FirstSuccess,
    /// Average numeric fields across successful providers.
    ///
    /// Providers missing from `weights` count with weight 1.0. Providers
    /// with a non-positive weight are left out of the blend.
    WeightedAverage { weights: HashMap<String, f64> },
}

impl MergeStrategy {
    fn weight_for(&self, provider: &str) -> f64 {
        match self {
            Self::FirstSuccess => 1.0,
            Self::WeightedAverage { weights } => weights.get(provider).copied().unwrap_or(1.0),
        }
    }
}

/// Merge strategy per operation.
#[derive(Clone, Debug, Default)]
pub struct MergeConfig {
    pub default: MergeStrategy,
    pub overrides: HashMap<Operation, MergeStrategy>,
}

impl MergeConfig {
    pub fn strategy_for(&self, operation: Operation) -> &MergeStrategy {
        self.overrides.get(&operation).unwrap_or(&self.default)
    }

    pub fn with_override(mut self, operation: Operation, strategy: MergeStrategy) -> Self {
        self.overrides.insert(operation, strategy);
        self
    }
}

/// Fold per-provider outcomes, given in priority order, into one aggregate.
pub fn merge<M: Metric>(
    strategy: &MergeStrategy,
    outcomes: Vec<(String, ProviderResult<M>)>,
) -> AggregateResult<M> {
    let mut successes: Vec<(String, M)> = Vec::new();
    let mut errors = Vec::new();

    for (provider, outcome) in outcomes {
        match outcome {
            Ok(value) => successes.push((provider, value)),
            Err(error) => errors.push(error.to_report()),
        }
    }

    let status = AggregateStatus::from_counts(successes.len(), errors.len());
    if successes.is_empty() {
        return AggregateResult::failed(errors);
    }

    let (value, source_providers) = match strategy {
        MergeStrategy::FirstSuccess => first_success(successes),
        MergeStrategy::WeightedAverage { .. } => {
            let weights: Vec<f64> = successes
                .iter()
                .map(|(provider, _)| strategy.weight_for(provider))
                .collect();

            if weights.iter().any(|w| usable_weight(*w)) {
                blend_weighted(&successes, &weights)
            } else {
                first_success(successes)
            }
        }
    };

    AggregateResult {
        value,
        status,
        errors,
        source_providers,
    }
}

fn usable_weight(weight: f64) -> bool {
    weight > 0.0 && weight.is_finite()
}

fn blend_weighted<M: Metric>(
    successes: &[(String, M)],
    weights: &[f64],
) -> (M, BTreeSet<String>) {
    let mut samples = Vec::with_capacity(successes.len());
    let mut sources = BTreeSet::new();

    for ((provider, value), weight) in successes.iter().zip(weights) {
        if usable_weight(*weight) {
            samples.push((*weight, value));
            sources.insert(provider.clone());
        }
    }

    (M::blend(&samples), sources)
}

fn first_success<M>(successes: Vec<(String, M)>) -> (M, BTreeSet<String>)
where
    M: Default,
{
    match successes.into_iter().next() {
        Some((provider, value)) => (value, BTreeSet::from([provider])),
        None => (M::default(), BTreeSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::MarketData;

    fn market(price: f64) -> MarketData {
        MarketData {
            price,
            ..Default::default()
        }
    }

    fn http_error(provider: &str) -> ProviderError {
        ProviderError::Http {
            provider: provider.to_string(),
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    }

    #[test]
    fn test_first_success_takes_highest_priority_success() {
        let result = merge(
            &MergeStrategy::FirstSuccess,
            vec![
                ("A".to_string(), Err(http_error("A"))),
                ("B".to_string(), Ok(market(50_000.0))),
                ("C".to_string(), Ok(market(51_000.0))),
            ],
        );

        assert_eq!(result.status, AggregateStatus::Partial);
        assert_eq!(result.value.price, 50_000.0);
        assert_eq!(result.errors, vec!["A: HTTP 500 - Internal Server Error"]);
        assert_eq!(result.source_providers, BTreeSet::from(["B".to_string()]));
    }

    #[test]
    fn test_all_failures_yield_zero_valued_error() {
        let result: AggregateResult<MarketData> = merge(
            &MergeStrategy::FirstSuccess,
            vec![
                ("A".to_string(), Err(http_error("A"))),
                ("B".to_string(), Err(http_error("B"))),
            ],
        );

        assert_eq!(result.status, AggregateStatus::Error);
        assert_eq!(result.value, MarketData::default());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[1].starts_with("B: "));
    }

    #[test]
    fn test_empty_outcomes_are_an_error() {
        let result: AggregateResult<MarketData> = merge(&MergeStrategy::FirstSuccess, vec![]);
        assert_eq!(result.status, AggregateStatus::Error);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_weighted_average_blends_successes() {
        let strategy = MergeStrategy::WeightedAverage {
            weights: HashMap::from([("A".to_string(), 3.0)]),
        };
        let result = merge(
            &strategy,
            vec![
                ("A".to_string(), Ok(market(100.0))),
                ("B".to_string(), Ok(market(110.0))),
            ],
        );

        assert_eq!(result.status, AggregateStatus::Success);
        assert_eq!(result.value.price, 102.5);
        assert_eq!(result.source_providers.len(), 2);
    }

    #[test]
    fn test_weighted_average_drops_non_positive_weights() {
        let strategy = MergeStrategy::WeightedAverage {
            weights: HashMap::from([("B".to_string(), 0.0)]),
        };
        let result = merge(
            &strategy,
            vec![
                ("A".to_string(), Ok(market(100.0))),
                ("B".to_string(), Ok(market(900.0))),
            ],
        );
        assert_eq!(result.value.price, 100.0);
        assert_eq!(result.source_providers, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let outcomes = || {
            vec![
                ("A".to_string(), Ok(market(1.0))),
                ("B".to_string(), Err(http_error("B"))),
            ]
        };
        let strategy = MergeStrategy::WeightedAverage {
            weights: HashMap::new(),
        };
        assert_eq!(merge(&strategy, outcomes()), merge(&strategy, outcomes()));
    }

    #[test]
    fn test_strategy_overrides_per_operation() {
        let weighted = MergeStrategy::WeightedAverage {
            weights: HashMap::new(),
        };
        let config = MergeConfig::default().with_override(Operation::Social, weighted.clone());
        assert_eq!(config.strategy_for(Operation::Social), &weighted);
        assert_eq!(
            config.strategy_for(Operation::Market),
            &MergeStrategy::FirstSuccess
        );
    }
}
