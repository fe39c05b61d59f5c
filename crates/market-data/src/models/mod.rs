//! Market data models
//!
//! This module contains the core data types shared by providers and the aggregator:
//! - `operation` - The logical requests a provider can serve (Operation)
//! - `metrics` - Normalized records (MarketData, OnChainMetrics, TechnicalIndicators, SocialMetrics, TokenInfo)
//! - `aggregate` - Fan-out outcomes (ProviderResult, AggregateResult, AggregateStatus, TokenData, TokenComparison)

mod aggregate;
mod metrics;
mod operation;

pub use aggregate::{
    AggregateResult, AggregateStatus, ProviderResult, TokenComparison, TokenData,
};
pub use metrics::{MarketData, OnChainMetrics, SocialMetrics, TechnicalIndicators, TokenInfo};
pub use operation::Operation;
