//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::config::{ConfigOverrides, LoadOptions};
use crate::window::DateWindow;

/// Category ranking and customer RFM analysis over an order-line CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// First purchase date to include (YYYY-MM-DD); defaults to the earliest in the data
    #[arg(short, long)]
    pub start: Option<NaiveDate>,

    /// Last purchase date to include (YYYY-MM-DD); defaults to the latest in the data
    #[arg(short, long)]
    pub end: Option<NaiveDate>,

    /// TOML settings file (orderscope.toml in the working directory is used if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of product categories to report
    #[arg(long)]
    pub top_categories: Option<usize>,

    /// Number of top-ranked categories taken as candidates before truncation
    #[arg(long)]
    pub candidate_pool: Option<usize>,

    /// Number of customers listed per RFM metric
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Also write the full report as JSON to this path
    #[arg(long)]
    pub json: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Settings layers for [`crate::config::AnalysisConfig::load`]
    pub fn load_options(&self) -> LoadOptions {
        let log_level = self
            .log_level
            .clone()
            .or_else(|| self.verbose.then(|| "debug".to_string()));

        LoadOptions {
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                candidate_pool: self.candidate_pool,
                top_categories: self.top_categories,
                top_k: self.top_k,
                log_level,
            },
        }
    }

    /// Requested window, with missing ends taken from the dataset bounds
    /// and the result checked against them.
    pub fn date_window(&self, bounds: (NaiveDate, NaiveDate)) -> crate::Result<DateWindow> {
        let window = DateWindow::new(self.start.unwrap_or(bounds.0), self.end.unwrap_or(bounds.1));
        window.validate_within(bounds)?;
        Ok(window)
    }
}
