//! One analysis pass over a date window, and its text / JSON renderings

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::CategorySummary;
use crate::config::AnalysisConfig;
use crate::error::AnalyticsError;
use crate::ranking::{top_customers, RfmMetric, TopCustomers};
use crate::records::OrderLine;
use crate::rfm::{build_rfm, CustomerRfm, RfmSummary, RfmTable};
use crate::window::{filter_window, DateWindow};

/// Customer half of the dashboard, present when the window has delivered lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSection {
    pub reference_date: NaiveDateTime,
    pub summary: RfmSummary,
    pub top_customers: TopCustomers,
    pub customers: Vec<CustomerRfm>,
}

impl CustomerSection {
    fn from_table(table: RfmTable, top_k: usize) -> Option<Self> {
        let summary = table.summary()?;
        let top_customers = top_customers(&table, top_k);
        Some(Self {
            reference_date: table.reference_date,
            summary,
            top_customers,
            customers: table.customers,
        })
    }
}

/// Everything the dashboard shows for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub window: DateWindow,
    /// Order lines inside the window, delivered or not
    pub matched_lines: usize,
    pub categories: Vec<CategorySummary>,
    /// `None` when the window holds no delivered line
    pub rfm: Option<CustomerSection>,
}

/// Run the whole pipeline for `window` over `lines`.
///
/// Both branches read the same filtered set. A window without delivered
/// lines still reports its categories; only the customer section is left out.
pub fn build_report(
    lines: &[OrderLine],
    window: &DateWindow,
    config: &AnalysisConfig,
) -> crate::Result<DashboardReport> {
    let windowed = filter_window(lines, window);
    if windowed.is_empty() {
        warn!(start = %window.start, end = %window.end, "date window matched no order lines");
    }

    let categories = config.categories.select(windowed.iter().copied())?;
    let rfm = match build_rfm(windowed.iter().copied()) {
        Ok(table) => CustomerSection::from_table(table, config.customers.top_k),
        Err(AnalyticsError::EmptyRfmInput) => {
            warn!(start = %window.start, end = %window.end, "no delivered orders in window, skipping RFM");
            None
        }
        Err(err) => return Err(err),
    };

    info!(
        matched_lines = windowed.len(),
        categories = categories.len(),
        customers = rfm.as_ref().map_or(0, |section| section.customers.len()),
        "computed dashboard report"
    );

    Ok(DashboardReport {
        window: *window,
        matched_lines: windowed.len(),
        categories,
        rfm,
    })
}

/// Plain-text tables for the console
pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "=== Window {} to {} ({} order lines) ===",
        report.window.start, report.window.end, report.matched_lines
    );

    let _ = writeln!(
        out,
        "\n=== Top {} Product Categories ===",
        report.categories.len()
    );
    let _ = writeln!(out, "  Rank | Category                         | Orders | Avg Review");
    let _ = writeln!(out, "  -----|----------------------------------|--------|-----------");
    for (rank, summary) in report.categories.iter().enumerate() {
        let name = summary
            .product_category_name
            .as_deref()
            .unwrap_or("(unknown)");
        let score = summary
            .avg_review_score
            .map(|score| format!("{score:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(
            out,
            "  {:4} | {:32} | {:6} | {:>10}",
            rank + 1,
            name,
            summary.order_count,
            score
        );
    }

    let _ = writeln!(out, "\n=== Customer RFM ===");
    let Some(section) = &report.rfm else {
        let _ = writeln!(out, "No delivered orders in this window.");
        return out;
    };
    let summary = &section.summary;
    let _ = writeln!(out, "Customers: {}", summary.customers);
    let _ = writeln!(out, "Reference date: {}", section.reference_date);
    let _ = writeln!(out, "Average recency (days): {:.1}", summary.mean_recency);
    let _ = writeln!(out, "Average frequency: {:.2}", summary.mean_frequency);
    let _ = writeln!(out, "Average monetary: {:.2}", summary.mean_monetary);

    for metric in RfmMetric::ALL {
        let rows = section.top_customers.for_metric(metric);
        let _ = writeln!(out, "\nBest customers by {metric}:");
        let _ = writeln!(out, "  Id    | Recency | Frequency | Monetary");
        for customer in rows {
            let _ = writeln!(
                out,
                "  {:5} | {:7} | {:9} | {:10.2}",
                customer.customer_encoded_id,
                customer.recency,
                customer.frequency,
                customer.monetary
            );
        }
    }

    out
}

/// Serialize the report for an external chart renderer
pub fn write_json(report: &DashboardReport, output_path: impl AsRef<Path>) -> crate::Result<()> {
    let output_path = output_path.as_ref();
    let body = serde_json::to_string_pretty(report)?;
    fs::write(output_path, body)?;
    info!(path = %output_path.display(), "wrote JSON report");
    Ok(())
}
