//! End-to-end RFM segmentation run

use std::path::Path;

use tracing::info;

use crate::config::PipelineConfig;
use crate::data::{load_orders, orders_frame, Order};
use crate::rfm::aggregate;
use crate::score::{score_records, ScoredCustomer};
use crate::window::AnalysisWindow;

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct SegmentationRun {
    pub window: AnalysisWindow,
    /// Input rows dropped as malformed
    pub skipped_rows: usize,
    /// Orders inside the window
    pub windowed_orders: usize,
    /// Scored customers ordered by customer key
    pub customers: Vec<ScoredCustomer>,
}

/// Window, aggregate, score and classify already-ingested orders
pub fn segment_orders(orders: &[Order], period_days: u32) -> crate::Result<SegmentationRun> {
    let window = AnalysisWindow::from_orders(orders, period_days)?;
    let windowed = window.filter(orders_frame(orders)?)?;
    let windowed_orders = windowed.height();
    let records = aggregate(windowed, &window)?;
    let customers = score_records(records)?;

    info!(customers = customers.len(), "segmented customers");

    Ok(SegmentationRun {
        window,
        skipped_rows: 0,
        windowed_orders,
        customers,
    })
}

/// Run the full pipeline over a sales table on disk
pub fn run(input_path: impl AsRef<Path>, config: &PipelineConfig) -> crate::Result<SegmentationRun> {
    let ingested = load_orders(input_path, config)?;
    let mut run = segment_orders(&ingested.orders, config.period_days)?;
    run.skipped_rows = ingested.skipped;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RfmError;
    use crate::segment::Segment;
    use chrono::{Duration, NaiveDate};

    fn order(id: &str, days_ago: i64, revenue: f64) -> Order {
        let latest = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        Order {
            customer_id: id.to_string(),
            country: "KR".to_string(),
            order_date: latest - Duration::days(days_ago),
            units: 1,
            revenue,
        }
    }

    #[test]
    fn test_segment_orders() {
        let orders = vec![
            order("a", 0, 100.0),
            order("a", 7, 100.0),
            order("b", 90, 20.0),
            order("c", 200, 5.0),
            // outside the window
            order("d", 400, 1000.0),
        ];
        let run = segment_orders(&orders, 365).unwrap();

        assert_eq!(run.windowed_orders, 4);
        assert_eq!(run.customers.len(), 3);
        assert!(run.customers.iter().all(|c| c.record.frequency >= 1));
        assert!(run.customers.iter().all(|c| c.record.recency >= 0));

        let a = &run.customers[0];
        assert_eq!(a.record.recency, 1);
        assert_eq!(a.scores.segment, Segment::Champions);
    }

    #[test]
    fn test_empty_orders() {
        assert!(matches!(
            segment_orders(&[], 365),
            Err(RfmError::InsufficientData(_))
        ));
    }
}
