//! Orderscope: e-commerce order analytics
//!
//! Filters order lines to a purchase-date window, ranks product categories by
//! order volume and review score, and segments customers with RFM
//! (Recency, Frequency, Monetary) analysis.

pub mod category;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod ranking;
pub mod records;
pub mod report;
pub mod rfm;
pub mod window;

// Re-export public items for easier access
pub use category::{aggregate_categories, summarize_categories, CategoryRanking, CategorySummary};
pub use cli::Args;
pub use config::AnalysisConfig;
pub use data::load_orders;
pub use error::AnalyticsError;
pub use ranking::{top_customers, top_k, RfmMetric, SortOrder, TopCustomers};
pub use records::{OrderDataset, OrderLine};
pub use report::{build_report, CustomerSection, DashboardReport};
pub use rfm::{build_rfm, CustomerRfm, RfmSummary, RfmTable};
pub use window::{filter_window, DateWindow};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, AnalyticsError>;
