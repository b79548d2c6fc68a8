//! CSV loading into an in-memory order dataset using Polars

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::AnalyticsError;
use crate::records::{OrderDataset, OrderLine};

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_UNIQUE_ID: &str = "customer_unique_id";
pub const PRODUCT_CATEGORY_NAME: &str = "product_category_name";
pub const REVIEW_SCORE: &str = "review_score";
pub const ORDER_STATUS: &str = "order_status";
pub const PRICE: &str = "price";
pub const FREIGHT_VALUE: &str = "freight_value";
pub const ORDER_PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Load an order-line CSV and convert it to an [`OrderDataset`]
///
/// # Arguments
/// * `file_path` - Path to a CSV file with a header row; columns beyond the
///   eight order-line fields are ignored
///
/// # Returns
/// * The dataset in file order, or the first problem found
pub fn load_orders(file_path: impl AsRef<Path>) -> crate::Result<OrderDataset> {
    let path = file_path.as_ref();

    // Every column is read as text: ids are opaque, so `007` must not become `7`.
    // Numeric fields are cast when the lines are extracted.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(path = %path.display(), rows = df.height(), "read order CSV");
    orders_from_frame(&df)
}

/// Convert a loaded frame to order lines.
///
/// Row numbers in errors are 1-based data rows (the header is not counted).
pub fn orders_from_frame(df: &DataFrame) -> crate::Result<OrderDataset> {
    if df.height() == 0 {
        return Err(AnalyticsError::EmptyDataset);
    }

    let order_ids = string_column(df, ORDER_ID)?;
    let customers = string_column(df, CUSTOMER_UNIQUE_ID)?;
    let categories = string_column(df, PRODUCT_CATEGORY_NAME)?;
    let scores = float_column(df, REVIEW_SCORE)?;
    let statuses = string_column(df, ORDER_STATUS)?;
    let prices = float_column(df, PRICE)?;
    let freights = float_column(df, FREIGHT_VALUE)?;
    let timestamps = string_column(df, ORDER_PURCHASE_TIMESTAMP)?;

    let mut lines = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = i + 1;

        let timestamp = timestamps[i]
            .as_deref()
            .ok_or_else(|| AnalyticsError::invalid_record(row, "missing purchase timestamp"))?;

        lines.push(OrderLine {
            order_id: required_text(&order_ids[i], row, ORDER_ID)?,
            customer_unique_id: required_text(&customers[i], row, CUSTOMER_UNIQUE_ID)?,
            product_category_name: categories[i]
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
            review_score: scores[i].filter(|score| !score.is_nan()),
            order_status: required_text(&statuses[i], row, ORDER_STATUS)?,
            price: required_amount(prices[i], row, PRICE)?,
            freight_value: required_amount(freights[i], row, FREIGHT_VALUE)?,
            order_purchase_timestamp: parse_timestamp(timestamp).ok_or_else(|| {
                AnalyticsError::invalid_record(row, format!("unparsable timestamp `{timestamp}`"))
            })?,
        });
    }

    debug!(lines = lines.len(), "converted frame to order lines");
    Ok(OrderDataset::new(lines))
}

/// Parse a purchase timestamp; a bare date means midnight
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Build a frame with one row per line, for the grouped aggregations.
///
/// Purchase timestamps are stored as microseconds since the epoch.
pub fn order_frame<'a, I>(lines: I) -> crate::Result<DataFrame>
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    let lines: Vec<&OrderLine> = lines.into_iter().collect();

    let df = df!(
        ORDER_ID => lines.iter().map(|l| l.order_id.as_str()).collect::<Vec<_>>(),
        CUSTOMER_UNIQUE_ID => lines.iter().map(|l| l.customer_unique_id.as_str()).collect::<Vec<_>>(),
        PRODUCT_CATEGORY_NAME => lines
            .iter()
            .map(|l| l.product_category_name.as_deref())
            .collect::<Vec<Option<&str>>>(),
        REVIEW_SCORE => lines.iter().map(|l| l.review_score).collect::<Vec<Option<f64>>>(),
        ORDER_STATUS => lines.iter().map(|l| l.order_status.as_str()).collect::<Vec<_>>(),
        PRICE => lines.iter().map(|l| l.price).collect::<Vec<f64>>(),
        FREIGHT_VALUE => lines.iter().map(|l| l.freight_value).collect::<Vec<f64>>(),
        ORDER_PURCHASE_TIMESTAMP => lines
            .iter()
            .map(|l| l.order_purchase_timestamp.and_utc().timestamp_micros())
            .collect::<Vec<i64>>()
    )?;

    Ok(df)
}

/// Inverse of the timestamp encoding used by [`order_frame`]
pub(crate) fn timestamp_from_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|ts| ts.naive_utc())
}

fn column<'a>(df: &'a DataFrame, name: &str) -> crate::Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| AnalyticsError::MissingColumn(name.to_string()))
}

pub(crate) fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = column(df, name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect())
}

pub(crate) fn float_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub(crate) fn int_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let series = column(df, name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

fn required_text(value: &Option<String>, row: usize, field: &str) -> crate::Result<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(AnalyticsError::invalid_record(row, format!("missing {field}"))),
    }
}

fn required_amount(value: Option<f64>, row: usize, field: &str) -> crate::Result<f64> {
    match value {
        Some(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        Some(amount) => Err(AnalyticsError::invalid_record(
            row,
            format!("{field} must be a non-negative number, got {amount}"),
        )),
        None => Err(AnalyticsError::invalid_record(row, format!("missing {field}"))),
    }
}
