//! Trailing analysis window

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use tracing::info;

use crate::data::{day_number, Order, ORDER_DAY};
use crate::error::RfmError;

/// Reference dates for one run.
///
/// `now` is fixed from the full, unfiltered order set and threaded through
/// filtering and recency computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    /// One day after the latest order
    pub now: NaiveDate,
    /// Orders dated on or before this day fall outside the window
    pub threshold: NaiveDate,
    pub period_days: u32,
}

impl AnalysisWindow {
    /// Fix `now` and the window threshold from every order, before any filtering
    pub fn from_orders(orders: &[Order], period_days: u32) -> crate::Result<Self> {
        if period_days == 0 {
            return Err(RfmError::InvalidConfig(
                "window period must be at least one day".to_string(),
            ));
        }
        let latest = orders
            .iter()
            .map(|o| o.order_date)
            .max()
            .ok_or_else(|| RfmError::InsufficientData("no orders to analyze".to_string()))?;

        Ok(Self::ending_after(latest, period_days))
    }

    /// Window whose `now` is the day after `latest`
    pub fn ending_after(latest: NaiveDate, period_days: u32) -> Self {
        let now = latest + Duration::days(1);
        Self {
            now,
            threshold: now - Duration::days(i64::from(period_days)),
            period_days,
        }
    }

    /// Keep the orders of an orders frame that fall inside the window
    pub fn filter(&self, orders: DataFrame) -> crate::Result<DataFrame> {
        let total = orders.height();
        let kept = orders
            .lazy()
            .filter(col(ORDER_DAY).gt(lit(day_number(self.threshold))))
            .collect()?;
        info!(
            now = %self.now,
            threshold = %self.threshold,
            kept = kept.height(),
            dropped = total - kept.height(),
            "applied {}-day window",
            self.period_days
        );
        Ok(kept)
    }
}
