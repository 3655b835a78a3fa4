use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Currency, ProfitEvent};

/// Opaque cluster tag within one bucket.
///
/// Labels identify groups, they do not rank them: label 0 says nothing about
/// whether its returns are high or low. No ordering is provided on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterLabel(u16);

impl ClusterLabel {
    /// `index` is below a validated `k`, so it never exceeds `u16::MAX`.
    pub(crate) fn new(index: usize) -> Self {
        Self(u16::try_from(index).unwrap_or(u16::MAX))
    }

    /// Raw category index, for colour maps and lookups.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredEvent {
    pub event: ProfitEvent,
    pub label: ClusterLabel,
}

/// Per-cluster size and centroid in (purchase price, profit) space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub label: ClusterLabel,
    pub size: usize,
    pub centroid_price: f64,
    pub centroid_profit: f64,
}

/// Profit events whose purchase price lies in `(min_price, max_price]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnBucket {
    pub currency: Currency,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub events: Vec<ClusteredEvent>,
    pub clusters: Vec<ClusterSummary>,
    pub mean_profit: f64,
    pub median_profit: f64,
    /// Total within-cluster squared distance of the kept clustering.
    pub inertia: f64,
}

impl ReturnBucket {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
