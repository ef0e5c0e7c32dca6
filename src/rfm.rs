//! Per-customer recency, frequency and monetary aggregation

use polars::prelude::*;
use tracing::info;

use crate::data::{day_number, CustomerKey, ORDER_COUNTRY, ORDER_CUSTOMER_ID, ORDER_DAY, ORDER_MONETARY};
use crate::error::RfmError;
use crate::window::AnalysisWindow;

const RECENCY: &str = "recency";
const FREQUENCY: &str = "frequency";

/// Behavioural metrics of one customer inside the analysis window
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub key: CustomerKey,
    /// Days since the most recent order; smaller is more recent
    pub recency: i64,
    /// Number of orders in the window
    pub frequency: u64,
    /// Summed revenue in the window, negative when returns dominate
    pub monetary: f64,
}

/// Group windowed orders by customer key
///
/// # Arguments
/// * `windowed` - Orders frame already restricted to `window`
/// * `window` - The run's reference dates
///
/// # Returns
/// * One `RfmRecord` per customer key, ordered by key
pub fn aggregate(windowed: DataFrame, window: &AnalysisWindow) -> crate::Result<Vec<RfmRecord>> {
    if windowed.height() == 0 {
        return Err(RfmError::InsufficientData(
            "no orders fall inside the analysis window".to_string(),
        ));
    }
    let orders = windowed.height();

    let rfm_df = windowed
        .lazy()
        .group_by([col(ORDER_COUNTRY), col(ORDER_CUSTOMER_ID)])
        .agg([
            // days between the latest order and `now`
            (lit(day_number(window.now)) - col(ORDER_DAY))
                .min()
                .alias(RECENCY),
            col(ORDER_DAY).count().cast(DataType::UInt64).alias(FREQUENCY),
            col(ORDER_MONETARY).sum(),
        ])
        .sort(
            [ORDER_COUNTRY, ORDER_CUSTOMER_ID],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let countries = rfm_df.column(ORDER_COUNTRY)?.str()?;
    let ids = rfm_df.column(ORDER_CUSTOMER_ID)?.str()?;
    let recency = rfm_df.column(RECENCY)?.i64()?;
    let frequency = rfm_df.column(FREQUENCY)?.u64()?;
    let monetary = rfm_df.column(ORDER_MONETARY)?.f64()?;

    let records: Vec<RfmRecord> = countries
        .into_no_null_iter()
        .zip(ids.into_no_null_iter())
        .zip(recency.into_no_null_iter())
        .zip(frequency.into_no_null_iter())
        .zip(monetary.into_no_null_iter())
        .map(|((((country, id), recency), frequency), monetary)| RfmRecord {
            key: CustomerKey::new(country, id),
            recency,
            frequency,
            monetary,
        })
        .collect();

    info!(
        customers = records.len(),
        orders,
        "aggregated RFM metrics"
    );

    Ok(records)
}
