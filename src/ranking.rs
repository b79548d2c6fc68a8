//! Top-K customer selection per RFM metric

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rfm::{CustomerRfm, RfmTable};

/// Default number of customers kept per metric
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfmMetric {
    Recency,
    Frequency,
    Monetary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl RfmMetric {
    pub const ALL: [RfmMetric; 3] = [Self::Recency, Self::Frequency, Self::Monetary];

    /// Direction in which "best" customers come first: most recent, most
    /// frequent, highest spend.
    pub fn best_first(self) -> SortOrder {
        match self {
            Self::Recency => SortOrder::Ascending,
            Self::Frequency | Self::Monetary => SortOrder::Descending,
        }
    }

    fn compare(self, a: &CustomerRfm, b: &CustomerRfm) -> Ordering {
        match self {
            Self::Recency => a.recency.cmp(&b.recency),
            Self::Frequency => a.frequency.cmp(&b.frequency),
            Self::Monetary => a.monetary.total_cmp(&b.monetary),
        }
    }
}

impl fmt::Display for RfmMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Recency => "recency",
            Self::Frequency => "frequency",
            Self::Monetary => "monetary",
        };
        f.write_str(label)
    }
}

/// The first `k` customers of `customers` sorted by `metric`.
///
/// The sort is stable, so equal values keep their table order. Fewer than
/// `k` rows returns all of them.
pub fn top_k(
    customers: &[CustomerRfm],
    metric: RfmMetric,
    k: usize,
    order: SortOrder,
) -> Vec<CustomerRfm> {
    let mut sorted: Vec<&CustomerRfm> = customers.iter().collect();
    sorted.sort_by(|a, b| match order {
        SortOrder::Ascending => metric.compare(a, b),
        SortOrder::Descending => metric.compare(b, a),
    });
    sorted.into_iter().take(k).cloned().collect()
}

/// Best customers for each of the three metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCustomers {
    pub by_recency: Vec<CustomerRfm>,
    pub by_frequency: Vec<CustomerRfm>,
    pub by_monetary: Vec<CustomerRfm>,
}

impl TopCustomers {
    pub fn for_metric(&self, metric: RfmMetric) -> &[CustomerRfm] {
        match metric {
            RfmMetric::Recency => &self.by_recency,
            RfmMetric::Frequency => &self.by_frequency,
            RfmMetric::Monetary => &self.by_monetary,
        }
    }
}

pub fn top_customers(table: &RfmTable, k: usize) -> TopCustomers {
    let pick = |metric: RfmMetric| top_k(&table.customers, metric, k, metric.best_first());

    TopCustomers {
        by_recency: pick(RfmMetric::Recency),
        by_frequency: pick(RfmMetric::Frequency),
        by_monetary: pick(RfmMetric::Monetary),
    }
}
