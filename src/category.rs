//! Product-category performance: distinct order volume and mean review score

use std::cmp::Ordering;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{
    float_column, int_column, order_frame, string_column, ORDER_ID, PRODUCT_CATEGORY_NAME,
    REVIEW_SCORE,
};
use crate::records::OrderLine;

/// One ranked row of the category table.
///
/// Order count and average score travel together so truncation can never
/// leave them out of step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// `None` groups every line without a category
    pub product_category_name: Option<String>,
    pub order_count: usize,
    /// Mean of the non-null review scores; `None` when the category has none
    pub avg_review_score: Option<f64>,
}

/// How many categories survive ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRanking {
    /// Size of the candidate set taken from the top of the ranking
    pub candidate_pool: usize,
    /// Number of categories reported
    pub top_n: usize,
}

impl Default for CategoryRanking {
    fn default() -> Self {
        Self {
            candidate_pool: 15,
            top_n: 10,
        }
    }
}

impl CategoryRanking {
    /// Number of rows actually kept
    pub fn limit(&self) -> usize {
        self.candidate_pool.min(self.top_n)
    }

    pub fn select<'a, I>(&self, lines: I) -> crate::Result<Vec<CategorySummary>>
    where
        I: IntoIterator<Item = &'a OrderLine>,
    {
        aggregate_categories(lines, self.limit())
    }
}

const ORDER_COUNT: &str = "order_count";
const AVG_REVIEW_SCORE: &str = "avg_review_score";

/// Group lines by category and rank every group, with no truncation.
///
/// Ranking is by distinct order count descending; equal counts fall back to
/// category name ascending, with the uncategorised group last.
pub fn summarize_categories<'a, I>(lines: I) -> crate::Result<Vec<CategorySummary>>
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    // Null category names form their own group
    let grouped = order_frame(lines)?
        .lazy()
        .group_by([col(PRODUCT_CATEGORY_NAME)])
        .agg([
            col(ORDER_ID).n_unique().alias(ORDER_COUNT),
            col(REVIEW_SCORE).mean().alias(AVG_REVIEW_SCORE),
        ])
        .collect()?;

    let names = string_column(&grouped, PRODUCT_CATEGORY_NAME)?;
    let counts = int_column(&grouped, ORDER_COUNT)?;
    let scores = float_column(&grouped, AVG_REVIEW_SCORE)?;

    let mut summaries: Vec<CategorySummary> = names
        .into_iter()
        .zip(counts)
        .zip(scores)
        .map(|((name, count), score)| CategorySummary {
            product_category_name: name,
            order_count: count.unwrap_or_default() as usize,
            avg_review_score: score.filter(|score| !score.is_nan()),
        })
        .collect();

    summaries.sort_by(rank_order);
    debug!(categories = summaries.len(), "summarized categories");
    Ok(summaries)
}

/// Top `top_n` categories by distinct order count.
///
/// # Arguments
/// * `lines` - Order lines already restricted to the analysis window
/// * `top_n` - Maximum number of categories to return
///
/// # Returns
/// * Categories in rank order, at most `top_n` of them
pub fn aggregate_categories<'a, I>(lines: I, top_n: usize) -> crate::Result<Vec<CategorySummary>>
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    let mut ranked = summarize_categories(lines)?;
    ranked.truncate(top_n);
    Ok(ranked)
}

fn rank_order(a: &CategorySummary, b: &CategorySummary) -> Ordering {
    b.order_count
        .cmp(&a.order_count)
        .then_with(|| match (&a.product_category_name, &b.product_category_name) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
