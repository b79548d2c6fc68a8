//! Customer-level Recency, Frequency, Monetary derivation

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{
    float_column, int_column, order_frame, string_column, timestamp_from_micros,
    CUSTOMER_UNIQUE_ID, FREIGHT_VALUE, ORDER_ID, ORDER_PURCHASE_TIMESTAMP, ORDER_STATUS, PRICE,
};
use crate::error::AnalyticsError;
use crate::records::{OrderLine, DELIVERED_STATUS};

const TOTAL_PRICE: &str = "total_price";
const LAST_ORDER_AT: &str = "last_order_at";
const FREQUENCY: &str = "frequency";
const MONETARY: &str = "monetary";

/// RFM values for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRfm {
    pub customer_unique_id: String,
    /// Short label for charts, only meaningful within one table
    pub customer_encoded_id: String,
    /// Whole days between the last order and the reference date
    pub recency: i64,
    /// Distinct delivered orders
    pub frequency: usize,
    /// Price plus freight over the customer's delivered line items
    pub monetary: f64,
    pub last_order_at: NaiveDateTime,
}

/// Headline means over a whole RFM table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfmSummary {
    pub customers: usize,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

/// RFM rows plus the date recency was measured from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmTable {
    /// One day after the latest delivered order in the input
    pub reference_date: NaiveDateTime,
    /// Rows ordered by `customer_unique_id`, which is also encoded-id order
    pub customers: Vec<CustomerRfm>,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Means over every customer; `None` for a table with no rows
    pub fn summary(&self) -> Option<RfmSummary> {
        if self.customers.is_empty() {
            return None;
        }

        let n = self.customers.len() as f64;
        let (recency, frequency, monetary) =
            self.customers
                .iter()
                .fold((0.0, 0.0, 0.0), |(r, f, m), customer| {
                    (
                        r + customer.recency as f64,
                        f + customer.frequency as f64,
                        m + customer.monetary,
                    )
                });

        Some(RfmSummary {
            customers: self.customers.len(),
            mean_recency: recency / n,
            mean_frequency: frequency / n,
            mean_monetary: monetary / n,
        })
    }
}

/// Build the RFM table from lines already restricted to the analysis window.
///
/// Only delivered lines count. Identical delivered lines (same customer,
/// price, freight, timestamp and order) are counted once; distinct line items
/// of the same order each add to monetary.
///
/// # Errors
/// * `AnalyticsError::EmptyRfmInput` when no delivered line is present, since
///   the reference date is undefined for an empty table
pub fn build_rfm<'a, I>(lines: I) -> crate::Result<RfmTable>
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    let grouped = order_frame(lines)?
        .lazy()
        .filter(col(ORDER_STATUS).eq(lit(DELIVERED_STATUS)))
        .select([
            col(CUSTOMER_UNIQUE_ID),
            col(PRICE),
            col(FREIGHT_VALUE),
            col(ORDER_PURCHASE_TIMESTAMP),
            col(ORDER_ID),
        ])
        .unique_stable(None, UniqueKeepStrategy::First)
        .with_column((col(PRICE) + col(FREIGHT_VALUE)).alias(TOTAL_PRICE))
        .group_by([col(CUSTOMER_UNIQUE_ID)])
        .agg([
            col(ORDER_PURCHASE_TIMESTAMP).max().alias(LAST_ORDER_AT),
            col(ORDER_ID).n_unique().alias(FREQUENCY),
            col(TOTAL_PRICE).sum().alias(MONETARY),
        ])
        .collect()?;

    if grouped.height() == 0 {
        return Err(AnalyticsError::EmptyRfmInput);
    }

    let ids = string_column(&grouped, CUSTOMER_UNIQUE_ID)?;
    let last_orders = int_column(&grouped, LAST_ORDER_AT)?;
    let frequencies = int_column(&grouped, FREQUENCY)?;
    let monetaries = float_column(&grouped, MONETARY)?;

    let mut rows = Vec::with_capacity(grouped.height());
    for (((id, last), frequency), monetary) in
        ids.into_iter().zip(last_orders).zip(frequencies).zip(monetaries)
    {
        let id = id
            .ok_or_else(|| AnalyticsError::InvalidAggregate(CUSTOMER_UNIQUE_ID.to_string()))?;
        let last_order_at = last
            .and_then(timestamp_from_micros)
            .ok_or_else(|| AnalyticsError::InvalidAggregate(LAST_ORDER_AT.to_string()))?;
        rows.push((
            id,
            last_order_at,
            frequency.unwrap_or_default() as usize,
            monetary.unwrap_or_default(),
        ));
    }

    // group_by output order is unspecified; encoded ids follow ascending id
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let latest = rows
        .iter()
        .map(|row| row.1)
        .max()
        .ok_or(AnalyticsError::EmptyRfmInput)?;
    let reference_date = latest + Duration::days(1);

    let customers: Vec<CustomerRfm> = rows
        .into_iter()
        .enumerate()
        .map(
            |(index, (customer_unique_id, last_order_at, frequency, monetary))| CustomerRfm {
                customer_unique_id,
                customer_encoded_id: index.to_string(),
                recency: (reference_date - last_order_at).num_days(),
                frequency,
                monetary,
                last_order_at,
            },
        )
        .collect();

    debug!(
        customers = customers.len(),
        reference_date = %reference_date,
        "built RFM table"
    );

    Ok(RfmTable {
        reference_date,
        customers,
    })
}
