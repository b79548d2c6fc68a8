//! Order-line records and the in-memory dataset they live in

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Status value marking an order as successfully completed
pub const DELIVERED_STATUS: &str = "delivered";

/// One line item of one order, as loaded from the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: String,
    pub customer_unique_id: String,
    /// `None` when the product has no category in the source
    pub product_category_name: Option<String>,
    /// `None` when the order was never reviewed
    pub review_score: Option<f64>,
    pub order_status: String,
    pub price: f64,
    pub freight_value: f64,
    pub order_purchase_timestamp: NaiveDateTime,
}

impl OrderLine {
    pub fn is_delivered(&self) -> bool {
        self.order_status == DELIVERED_STATUS
    }

    /// Price plus freight for this line
    pub fn total_price(&self) -> f64 {
        self.price + self.freight_value
    }
}

/// Read-only snapshot of every order line loaded for a session.
///
/// Nothing in the analytics pipeline mutates it; each pass borrows the
/// lines and builds its own derived tables.
#[derive(Debug, Clone, Default)]
pub struct OrderDataset {
    lines: Vec<OrderLine>,
}

impl OrderDataset {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Earliest and latest purchase dates in the dataset, `None` when empty
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.lines.first()?.order_purchase_timestamp;
        let (min, max) = self
            .lines
            .iter()
            .map(|line| line.order_purchase_timestamp)
            .fold((first, first), |(min, max), ts| (min.min(ts), max.max(ts)));
        Some((min.date(), max.date()))
    }
}
