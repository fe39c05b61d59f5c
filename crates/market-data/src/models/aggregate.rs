use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

use super::metrics::{MarketData, OnChainMetrics, SocialMetrics, TechnicalIndicators};

/// Outcome of a single adapter call.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// How completely the configured providers answered a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    /// Every provider asked succeeded.
    Success,
    /// At least one provider succeeded and at least one failed.
    Partial,
    /// No provider succeeded.
    Error,
}

impl AggregateStatus {
    /// Derive status from per-provider outcome counts.
    pub fn from_counts(successes: usize, failures: usize) -> Self {
        match (successes, failures) {
            (s, 0) if s > 0 => Self::Success,
            (s, _) if s > 0 => Self::Partial,
            _ => Self::Error,
        }
    }

    /// Fold the statuses of several independent aggregates.
    ///
    /// All success yields `Success`, all error yields `Error`, anything else
    /// is `Partial`. An empty input is `Error`.
    pub fn combine<I: IntoIterator<Item = AggregateStatus>>(statuses: I) -> Self {
        let mut any_success = false;
        let mut any_degraded = false;
        let mut any_usable = false;
        let mut seen = false;
        for status in statuses {
            seen = true;
            match status {
                Self::Success => {
                    any_success = true;
                    any_usable = true;
                }
                Self::Partial => {
                    any_degraded = true;
                    any_usable = true;
                }
                Self::Error => any_degraded = true,
            }
        }
        if !seen || !any_usable {
            Self::Error
        } else if any_success && !any_degraded {
            Self::Success
        } else {
            Self::Partial
        }
    }
}

/// Merged result of a fan-out over every capable provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult<T> {
    pub value: T,
    pub status: AggregateStatus,
    /// One `"<provider>: <message>"` entry per failed provider, in priority order.
    pub errors: Vec<String>,
    /// Providers whose data contributed to `value`.
    pub source_providers: BTreeSet<String>,
}

impl<T: Default> AggregateResult<T> {
    /// A zero-valued `Error` result carrying the given messages.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            value: T::default(),
            status: AggregateStatus::Error,
            errors,
            source_providers: BTreeSet::new(),
        }
    }
}

/// Full metric bundle for one symbol, consumed by the prompt layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub symbol: String,
    pub market: MarketData,
    pub on_chain: OnChainMetrics,
    pub technical: TechnicalIndicators,
    pub social: SocialMetrics,
    pub timestamp: DateTime<Utc>,
    pub status: AggregateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// Market snapshots for several symbols fetched together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenComparison {
    pub timestamp: DateTime<Utc>,
    /// Keyed by normalized symbol.
    pub tokens: BTreeMap<String, AggregateResult<MarketData>>,
}
