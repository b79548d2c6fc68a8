//! Day-granular purchase-date window

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalyticsError;
use crate::records::OrderLine;

/// Inclusive calendar-date range over order purchase timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First instant inside the window
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// First instant after the window: midnight following `end`
    pub fn upper_bound(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + Duration::days(1)
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.lower_bound() && timestamp < self.upper_bound()
    }

    /// Check the window against dataset bounds before running a pass.
    ///
    /// The filter itself accepts any window; this is for callers that want
    /// a reversed or out-of-range selection reported instead of silently
    /// producing empty tables.
    pub fn validate_within(&self, bounds: (NaiveDate, NaiveDate)) -> crate::Result<()> {
        let (min, max) = bounds;
        let reason = if self.start > self.end {
            "start date is after end date".to_string()
        } else if self.start < min || self.end > max {
            format!("dates must lie within {min} and {max}")
        } else {
            return Ok(());
        };

        Err(AnalyticsError::InvalidRange {
            start: self.start,
            end: self.end,
            reason,
        })
    }
}

/// Keep the lines purchased inside `window`.
///
/// A line on `window.end` is kept whatever its time of day. A reversed
/// window matches nothing.
pub fn filter_window<'a>(lines: &'a [OrderLine], window: &DateWindow) -> Vec<&'a OrderLine> {
    let kept: Vec<&OrderLine> = lines
        .iter()
        .filter(|line| window.contains(line.order_purchase_timestamp))
        .collect();

    debug!(
        start = %window.start,
        end = %window.end,
        total = lines.len(),
        kept = kept.len(),
        "applied date window"
    );

    kept
}
